// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

//! Contracts for the three collaborators spec §1 places out of scope: the
//! index writer, the update log, and the index fingerprint. The Update
//! Handler and Peer Sync crates are written only against these traits;
//! `shardcore-testing` supplies in-memory implementations, and a real
//! deployment would back them with an actual segment writer and
//! write-ahead log.

use shardcore_type::{DocId, IndexedId, RawVersion, Result};

use crate::command::CommitCmd;
use crate::document::Document;

/// The segment writer. Every mutation the Update Handler performs against
/// the actual index goes through this trait; the handler never touches
/// segment files directly.
pub trait IndexWriter: Send + Sync {
	/// Insert-only fastpath: the key is known not to exist yet.
	fn add_document(&self, indexed_id: &IndexedId, doc: &Document) -> Result<()>;

	/// Add a parent/child document block as one atomic unit.
	fn add_documents(&self, block: &[(IndexedId, Document)]) -> Result<()>;

	/// Reindex the full document at `indexed_id`, replacing any prior
	/// version of it (Lucene-style update-by-delete-then-add).
	fn update_document(&self, indexed_id: &IndexedId, doc: &Document) -> Result<()>;

	/// Update only the doc-values fields named in `doc`, leaving the rest
	/// of the stored document untouched (spec §4.C in-place update).
	fn update_doc_values(&self, indexed_id: &IndexedId, doc: &Document) -> Result<()>;

	fn delete_document(&self, indexed_id: &IndexedId) -> Result<()>;

	fn delete_by_query(&self, query: &str) -> Result<()>;

	fn delete_all(&self) -> Result<()>;

	fn merge_indexes(&self, segment_refs: &[String]) -> Result<()>;

	/// Split the index along the given hash ranges, handing each range's
	/// segments to its named destination. Opaque beyond that.
	fn split(&self, targets: &[(String, (u64, u64))]) -> Result<()>;

	/// Force-merge down to at most `max_segments` (spec §4.C `optimize`).
	fn force_merge(&self, max_segments: u32) -> Result<()>;

	/// Force-merge away segments consisting mostly of deletions (spec
	/// §4.C `expungeDeletes`).
	fn force_merge_deletes(&self) -> Result<()>;

	fn has_pending_changes(&self) -> bool;

	fn set_commit_data(&self, data: &[(String, String)]);

	fn prepare_commit(&self) -> Result<()>;

	fn commit(&self, cmd: &CommitCmd) -> Result<()>;

	fn rollback(&self) -> Result<()>;

	fn close(&self) -> Result<()>;
}

/// A single transaction-log record, as replayed for crash recovery or
/// offered to a peer during Peer Sync.
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
	Add { id: DocId, version: RawVersion },
	Delete { id: DocId, version: RawVersion },
	DeleteByQuery { query: String, version: RawVersion },
}

impl LogRecord {
	pub fn version(&self) -> RawVersion {
		match self {
			LogRecord::Add { version, .. } => *version,
			LogRecord::Delete { version, .. } => *version,
			LogRecord::DeleteByQuery { version, .. } => *version,
		}
	}
}

/// A version observed for an id, as returned from the update log's
/// in-memory recent-updates map (spec §4.C "version lookup").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentUpdate {
	pub version: i64,
}

/// The write-ahead log backing optimistic concurrency lookups and Peer Sync
/// replay. Distinct from the `IndexWriter`: the log is consulted for
/// version lookups even for documents not yet committed to the index.
pub trait UpdateLog: Send + Sync {
	fn append(&self, record: LogRecord) -> Result<()>;

	/// The most recently logged version for `id`, if this log still has
	/// it in its in-memory recent-updates window. `None` means "check the
	/// index instead", not "document does not exist".
	fn lookup_version(&self, id: &DocId) -> Option<RecentUpdate>;

	/// Up to `n` most recent records, ordered by decreasing `|version|`.
	fn recent_updates(&self, n: usize) -> Vec<LogRecord>;

	/// All logged `deleteByQuery` records with `|version| > since`, needed
	/// to replay DBQs that arrived out of order relative to adds (spec
	/// §4.C "reordered DBQ" edge case).
	fn dbq_newer_than(&self, since: u64) -> Vec<LogRecord>;

	fn pre_commit(&self, cmd: &CommitCmd) -> Result<()>;
	fn post_commit(&self, cmd: &CommitCmd) -> Result<()>;
	fn pre_soft_commit(&self, cmd: &CommitCmd) -> Result<()>;
	fn post_soft_commit(&self, cmd: &CommitCmd) -> Result<()>;

	/// Force a fresh realtime (near-real-time, not necessarily committed)
	/// searcher to be visible, used ahead of in-place updates and DBQ
	/// replay so later reads observe the write they are about to make
	/// consistent (spec §4.C).
	fn open_realtime_searcher(&self) -> Result<()>;

	fn has_uncommitted_changes(&self) -> bool;

	/// Total size in bytes and number of log segments still on disk,
	/// surfaced as the `txnLogsTotalSize`/`txnLogsTotalNumber` gauges.
	fn disk_usage(&self) -> (u64, u64);

	fn close(&self) -> Result<()>;
}

/// A comparable digest of "everything in this shard up to `max_version`",
/// computed by `Fingerprinter::compute` and exchanged during Peer Sync's
/// fast-path equality probe (spec §5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintDigest {
	pub max_version: u64,
	pub num_docs: u64,
	pub max_doc_version_encountered: u64,
	pub digest: u64,
}

/// The index fingerprint collaborator (spec §1, §5). Kept as a narrow
/// trait, fixed-output contract rather than an associated type, so Peer
/// Sync can hold a `dyn Fingerprinter` without knowing the hashing scheme
/// underneath (`shardcore-hash` supplies the real implementation).
pub trait Fingerprinter: Send + Sync {
	fn compute(&self, max_version: u64) -> FingerprintDigest;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn log_record_version_matches_variant() {
		let r = LogRecord::Delete { id: DocId::from("A"), version: RawVersion::new(-9) };
		assert_eq!(r.version(), RawVersion::new(-9));
	}
}
