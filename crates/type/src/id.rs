// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

use std::fmt::{Display, Formatter};

/// A document's unique key, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct DocId(pub String);

impl Display for DocId {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		Display::fmt(&self.0, f)
	}
}

impl From<String> for DocId {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl From<&str> for DocId {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

/// The opaque, indexed form of a document key that the writer operates on
/// (analogous to a Lucene `Term`). Out-of-scope collaborators never need to
/// know how this was derived from a `DocId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexedId(pub Vec<u8>);

impl IndexedId {
	pub fn from_doc_id(id: &DocId) -> Self {
		Self(id.0.as_bytes().to_vec())
	}
}
