// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

use std::time::Duration;

use shardcore_type::{DocId, IndexedId, RawVersion, RequestedVersion};

use crate::document::Document;
use crate::flags::update_flags;

/// Add (or update) a single document. Carries both the version the caller
/// asked for (`requested_version`, the ingest-level assertion) and the
/// version the handler ultimately assigns or replays (`version`).
#[derive(Debug, Clone)]
pub struct AddCmd {
	pub id: DocId,
	pub indexed_id: IndexedId,
	pub doc: Document,
	pub requested_version: RequestedVersion,
	/// Assigned on the leader, carried verbatim through Peer Sync replay.
	pub version: RawVersion,
	/// `true` for a parent/child document block added as one atomic unit
	/// via `addDocuments` rather than `addDocument`.
	pub is_block: bool,
	/// `true` when every non-unique-key field is doc-values-only and the
	/// handler may use `updateDocValues` instead of a full reindex.
	pub is_in_place_update: bool,
	/// `false` when this command is being replayed (Peer Sync, transaction
	/// log recovery) rather than originating from a live leader request.
	pub is_leader_logic: bool,
	/// A dedup key distinct from `indexed_id`; when set, the handler also
	/// deletes `(update_term ∧ ¬indexed_id)` to preserve key uniqueness.
	pub update_term: Option<IndexedId>,
	/// Per-request override of the commit tracker's deadline (spec §4.A
	/// `addedDocument(commitWithin)`); `None` falls back to the
	/// tracker's configured time bound.
	pub commit_within: Option<Duration>,
	pub flags: u32,
}

impl AddCmd {
	pub fn new(id: DocId, doc: Document, requested_version: RequestedVersion) -> Self {
		let indexed_id = IndexedId::from_doc_id(&id);
		Self {
			id,
			indexed_id,
			doc,
			requested_version,
			version: RawVersion::new(0),
			is_block: false,
			is_in_place_update: false,
			is_leader_logic: true,
			update_term: None,
			commit_within: None,
			flags: update_flags::NONE,
		}
	}

	pub fn is_peer_sync(&self) -> bool {
		crate::flags::has_flag(self.flags, update_flags::PEER_SYNC)
	}
}

/// Delete a document by id, or every document matching `query` when it is
/// set (spec §4.C deleteByQuery path shares one command shape with
/// delete-by-id so the log and the handler can treat both uniformly until
/// the query branch is taken).
#[derive(Debug, Clone)]
pub struct DeleteCmd {
	pub id: Option<DocId>,
	pub indexed_id: Option<IndexedId>,
	pub query: Option<String>,
	pub requested_version: RequestedVersion,
	pub version: RawVersion,
	pub is_leader_logic: bool,
	/// Per-request override of the commit tracker's deadline, symmetric
	/// with `AddCmd::commit_within` (spec §4.A `deletedDocument(commitWithin)`).
	pub commit_within: Option<Duration>,
	pub flags: u32,
}

impl DeleteCmd {
	pub fn by_id(id: DocId, requested_version: RequestedVersion) -> Self {
		let indexed_id = IndexedId::from_doc_id(&id);
		Self {
			id: Some(id),
			indexed_id: Some(indexed_id),
			query: None,
			requested_version,
			version: RawVersion::new(0),
			is_leader_logic: true,
			commit_within: None,
			flags: update_flags::NONE,
		}
	}

	pub fn by_query(query: impl Into<String>, version: RawVersion) -> Self {
		Self {
			id: None,
			indexed_id: None,
			query: Some(query.into()),
			requested_version: RequestedVersion::None,
			version,
			is_leader_logic: true,
			commit_within: None,
			flags: update_flags::NONE,
		}
	}

	pub fn is_by_query(&self) -> bool {
		self.query.is_some()
	}
}

#[derive(Debug, Clone, Default)]
pub struct CommitCmd {
	pub soft_commit: bool,
	pub open_searcher: bool,
	pub wait_searcher: bool,
	pub expunge_deletes: bool,
	pub optimize: bool,
	pub max_optimize_segments: u32,
	pub prepare_commit: bool,
}

impl CommitCmd {
	pub fn hard() -> Self {
		Self { open_searcher: true, max_optimize_segments: 1, ..Default::default() }
	}

	pub fn soft() -> Self {
		Self { soft_commit: true, open_searcher: true, max_optimize_segments: 1, ..Default::default() }
	}
}

#[derive(Debug, Clone, Default)]
pub struct RollbackCmd {}

/// Merge external index segments into this shard's index without going
/// through the normal add path (spec §6). The segment handles themselves are
/// opaque to the update core; the writer decides what they mean.
#[derive(Debug, Clone)]
pub struct MergeIndexesCmd {
	pub segment_refs: Vec<String>,
}

/// Split this shard's index into the given sub-ranges, each keyed by a
/// hash range over the document id (spec §6). The target shard names are
/// opaque destinations the writer routes segments to.
#[derive(Debug, Clone)]
pub struct SplitCmd {
	pub targets: Vec<SplitTarget>,
}

#[derive(Debug, Clone)]
pub struct SplitTarget {
	pub shard: String,
	pub hash_range: (u64, u64),
}

#[cfg(test)]
mod tests {
	use super::*;
	use shardcore_type::RequestedVersion;

	#[test]
	fn delete_by_query_has_no_id() {
		let cmd = DeleteCmd::by_query("category:discontinued", RawVersion::new(-5));
		assert!(cmd.is_by_query());
		assert!(cmd.id.is_none());
	}

	#[test]
	fn add_cmd_defaults_to_not_peer_sync() {
		let cmd = AddCmd::new(DocId::from("A"), Document::new(), RequestedVersion::None);
		assert_eq!(cmd.flags, update_flags::NONE);
	}
}
