// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

//! Minimal in-memory fakes used only by this crate's own unit tests. The
//! richer fakes shared across the workspace live in `shardcore-testing`,
//! which depends on this crate (for `PeerTransport`) and therefore cannot
//! be depended on from here without a cycle.

use std::sync::Mutex;

use shardcore_core::{CommitCmd, Document, IndexWriter, LogRecord, RecentUpdate, UpdateLog};
use shardcore_type::{DocId, IndexedId, Result};

#[derive(Default)]
pub struct MemoryIndexWriter {
	docs: Mutex<std::collections::HashMap<Vec<u8>, Document>>,
	pending: Mutex<bool>,
}

impl IndexWriter for MemoryIndexWriter {
	fn add_document(&self, indexed_id: &IndexedId, doc: &Document) -> Result<()> {
		self.docs.lock().unwrap().insert(indexed_id.0.clone(), doc.clone());
		*self.pending.lock().unwrap() = true;
		Ok(())
	}

	fn add_documents(&self, block: &[(IndexedId, Document)]) -> Result<()> {
		for (id, doc) in block {
			self.add_document(id, doc)?;
		}
		Ok(())
	}

	fn update_document(&self, indexed_id: &IndexedId, doc: &Document) -> Result<()> {
		self.add_document(indexed_id, doc)
	}

	fn update_doc_values(&self, indexed_id: &IndexedId, doc: &Document) -> Result<()> {
		self.add_document(indexed_id, doc)
	}

	fn delete_document(&self, indexed_id: &IndexedId) -> Result<()> {
		self.docs.lock().unwrap().remove(&indexed_id.0);
		*self.pending.lock().unwrap() = true;
		Ok(())
	}

	fn delete_by_query(&self, _query: &str) -> Result<()> {
		*self.pending.lock().unwrap() = true;
		Ok(())
	}

	fn delete_all(&self) -> Result<()> {
		self.docs.lock().unwrap().clear();
		*self.pending.lock().unwrap() = true;
		Ok(())
	}

	fn merge_indexes(&self, _segment_refs: &[String]) -> Result<()> {
		Ok(())
	}

	fn split(&self, _targets: &[(String, (u64, u64))]) -> Result<()> {
		Ok(())
	}

	fn force_merge(&self, _max_segments: u32) -> Result<()> {
		Ok(())
	}

	fn force_merge_deletes(&self) -> Result<()> {
		Ok(())
	}

	fn has_pending_changes(&self) -> bool {
		*self.pending.lock().unwrap()
	}

	fn set_commit_data(&self, _data: &[(String, String)]) {}

	fn prepare_commit(&self) -> Result<()> {
		Ok(())
	}

	fn commit(&self, _cmd: &CommitCmd) -> Result<()> {
		*self.pending.lock().unwrap() = false;
		Ok(())
	}

	fn rollback(&self) -> Result<()> {
		*self.pending.lock().unwrap() = false;
		Ok(())
	}

	fn close(&self) -> Result<()> {
		Ok(())
	}
}

#[derive(Default)]
pub struct MemoryUpdateLog {
	versions: Mutex<std::collections::HashMap<DocId, i64>>,
	records: Mutex<Vec<LogRecord>>,
}

impl MemoryUpdateLog {
	pub fn records_snapshot(&self) -> Vec<LogRecord> {
		self.records.lock().unwrap().clone()
	}
}

impl UpdateLog for MemoryUpdateLog {
	fn append(&self, record: LogRecord) -> Result<()> {
		match &record {
			LogRecord::Add { id, version } | LogRecord::Delete { id, version } => {
				self.versions.lock().unwrap().insert(id.clone(), version.0);
			}
			LogRecord::DeleteByQuery { .. } => {}
		}
		self.records.lock().unwrap().push(record);
		Ok(())
	}

	fn lookup_version(&self, id: &DocId) -> Option<RecentUpdate> {
		self.versions.lock().unwrap().get(id).map(|v| RecentUpdate { version: *v })
	}

	fn recent_updates(&self, n: usize) -> Vec<LogRecord> {
		let records = self.records.lock().unwrap();
		let mut sorted: Vec<LogRecord> = records.clone();
		sorted.sort_by_key(|r| std::cmp::Reverse(r.version().magnitude()));
		sorted.truncate(n);
		sorted
	}

	fn dbq_newer_than(&self, since: u64) -> Vec<LogRecord> {
		self.records
			.lock()
			.unwrap()
			.iter()
			.filter(|r| matches!(r, LogRecord::DeleteByQuery { .. }) && r.version().magnitude() > since)
			.cloned()
			.collect()
	}

	fn pre_commit(&self, _cmd: &CommitCmd) -> Result<()> {
		Ok(())
	}

	fn post_commit(&self, _cmd: &CommitCmd) -> Result<()> {
		Ok(())
	}

	fn pre_soft_commit(&self, _cmd: &CommitCmd) -> Result<()> {
		Ok(())
	}

	fn post_soft_commit(&self, _cmd: &CommitCmd) -> Result<()> {
		Ok(())
	}

	fn open_realtime_searcher(&self) -> Result<()> {
		Ok(())
	}

	fn has_uncommitted_changes(&self) -> bool {
		false
	}

	fn disk_usage(&self) -> (u64, u64) {
		(0, 0)
	}

	fn close(&self) -> Result<()> {
		Ok(())
	}
}
