// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

use indexmap::IndexMap;

/// A single document field value. Schema and query parsing are out of
/// scope (spec §1); this is deliberately the smallest value model that lets
/// the handler decide whether a field is doc-values-only for in-place
/// updates without pulling in a real type system.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
	Text(String),
	Int(i64),
	Bool(bool),
	Bytes(Vec<u8>),
}

/// A document about to be added or updated. Field order is preserved
/// (`IndexMap`) because some writers care about first-seen field order for
/// schema inference; the update core itself never depends on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
	fields: IndexMap<String, FieldValue>,
	/// Fields backed purely by doc-values, eligible for `updateDocValues`
	/// instead of a full `updateDocument` (spec §4.C, "in-place update").
	doc_values_only: indexmap::IndexSet<String>,
}

impl Document {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
		self.fields.insert(name.into(), value);
		self
	}

	pub fn mark_doc_values_only(mut self, name: impl Into<String>) -> Self {
		self.doc_values_only.insert(name.into());
		self
	}

	pub fn get(&self, name: &str) -> Option<&FieldValue> {
		self.fields.get(name)
	}

	pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
		self.fields.iter().map(|(k, v)| (k.as_str(), v))
	}

	pub fn field_names(&self) -> impl Iterator<Item = &str> {
		self.fields.keys().map(|k| k.as_str())
	}

	/// `true` when every non-unique-key field on this document is a
	/// doc-values-only field, the prerequisite for an in-place update
	/// (spec §4.C).
	pub fn all_non_key_fields_are_doc_values_only(&self, unique_key_field: &str) -> bool {
		self.fields.keys().filter(|name| name.as_str() != unique_key_field).all(|name| self.doc_values_only.contains(name))
	}

	/// The subset of fields eligible for `updateDocValues`.
	pub fn doc_values_subset(&self) -> Document {
		let mut subset = Document::new();
		for name in &self.doc_values_only {
			if let Some(value) = self.fields.get(name) {
				subset.fields.insert(name.clone(), value.clone());
			}
		}
		subset.doc_values_only = self.doc_values_only.clone();
		subset
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn in_place_eligibility_requires_all_non_key_fields_to_be_doc_values() {
		let doc = Document::new()
			.with_field("id", FieldValue::Text("A".into()))
			.with_field("popularity", FieldValue::Int(5))
			.mark_doc_values_only("popularity");
		assert!(doc.all_non_key_fields_are_doc_values_only("id"));

		let doc = doc.with_field("body", FieldValue::Text("indexed text".into()));
		assert!(!doc.all_non_key_fields_are_doc_values_only("id"));
	}
}
