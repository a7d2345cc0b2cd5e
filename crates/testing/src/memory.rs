// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

use std::collections::HashMap;
use std::sync::Mutex;

use shardcore_core::{CommitCmd, Document, FingerprintDigest, Fingerprinter, IndexWriter, LogRecord, RecentUpdate, UpdateLog};
use shardcore_hash::{FingerprintBuilder, IndexFingerprinter};
use shardcore_type::{DocId, IndexedId, Result};

/// An in-memory stand-in for a Lucene-style segment writer. Stores the
/// live document body per indexed id; deletes simply remove the entry.
/// `disk_usage` and `has_pending_changes` are tracked well enough to drive
/// the Update Handler's commit-lifecycle branches in a test, not to model
/// real segment sizes.
#[derive(Default)]
pub struct MemoryIndexWriter {
	docs: Mutex<HashMap<Vec<u8>, Document>>,
	pending: Mutex<bool>,
}

impl MemoryIndexWriter {
	pub fn doc_count(&self) -> usize {
		self.docs.lock().unwrap().len()
	}

	pub fn contains(&self, indexed_id: &IndexedId) -> bool {
		self.docs.lock().unwrap().contains_key(&indexed_id.0)
	}

	pub fn document(&self, indexed_id: &IndexedId) -> Option<Document> {
		self.docs.lock().unwrap().get(&indexed_id.0).cloned()
	}
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
		let mut docs = self.docs.lock().unwrap();
		let merged = match docs.remove(&indexed_id.0) {
			Some(existing) => doc.fields().fold(existing, |acc, (name, value)| acc.with_field(name, value.clone())),
			None => doc.clone(),
		};
		docs.insert(indexed_id.0.clone(), merged);
		*self.pending.lock().unwrap() = true;
		Ok(())
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

/// An in-memory update log. Keeps the full record history (so
/// `recent_updates`/`dbq_newer_than` can serve any window a test asks for)
/// plus a `DocId -> latest version` map for O(1) version lookups, mirroring
/// the real log's in-memory recent-updates window.
#[derive(Default)]
pub struct MemoryUpdateLog {
	versions: Mutex<HashMap<DocId, i64>>,
	records: Mutex<Vec<LogRecord>>,
	uncommitted: Mutex<bool>,
}

impl MemoryUpdateLog {
	pub fn records_snapshot(&self) -> Vec<LogRecord> {
		self.records.lock().unwrap().clone()
	}

	/// The materialised `DocId -> latest version` view a real fingerprint
	/// source would read off the index's stored-version column, filtered
	/// to versions that survive as live (not deleted) as of `max_version`.
	pub fn live_entries(&self, max_version: u64) -> Vec<(DocId, u64)> {
		let records = self.records.lock().unwrap();
		let mut latest: HashMap<DocId, i64> = HashMap::new();
		for record in records.iter() {
			let magnitude = record.version().magnitude();
			if magnitude > max_version {
				continue;
			}
			match record {
				LogRecord::Add { id, version } => {
					latest.insert(id.clone(), version.0);
				}
				LogRecord::Delete { id, version } => {
					latest.insert(id.clone(), -(version.0.abs()));
				}
				LogRecord::DeleteByQuery { .. } => {}
			}
		}
		latest.into_iter().filter(|(_, v)| *v >= 0).map(|(id, v)| (id, v as u64)).collect()
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
		*self.uncommitted.lock().unwrap() = true;
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
		*self.uncommitted.lock().unwrap() = false;
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
		*self.uncommitted.lock().unwrap()
	}

	fn disk_usage(&self) -> (u64, u64) {
		let records = self.records.lock().unwrap();
		(records.len() as u64 * 64, records.len() as u64)
	}

	fn close(&self) -> Result<()> {
		Ok(())
	}
}

/// Builds a `Fingerprinter` reading directly off a `MemoryUpdateLog`'s
/// materialised live-entry view, so a test can compute a real fingerprint
/// without standing up a segment reader.
pub fn memory_fingerprinter(log: std::sync::Arc<MemoryUpdateLog>) -> impl Fingerprinter {
	IndexFingerprinter::new(move |max_version: u64| log.live_entries(max_version))
}

/// A standalone, non-incremental fingerprint computation over a fixed
/// entry set; convenient when a test already has the expected live set in
/// hand and wants the digest without a log.
pub fn fingerprint_of(entries: &[(DocId, u64)], max_version: u64) -> FingerprintDigest {
	let mut builder = FingerprintBuilder::new();
	for (id, version) in entries {
		builder.push(id, *version);
	}
	builder.finish(max_version)
}

#[cfg(test)]
mod tests {
	use shardcore_core::FieldValue;

	use super::*;

	#[test]
	fn update_doc_values_merges_fields_into_the_stored_document() {
		let writer = MemoryIndexWriter::default();
		let id = IndexedId(b"A".to_vec());
		writer.add_document(&id, &Document::new().with_field("title", FieldValue::Text("first".into()))).unwrap();
		writer.update_doc_values(&id, &Document::new().with_field("views", FieldValue::Int(3))).unwrap();
		assert!(writer.contains(&id));
	}

	#[test]
	fn commit_clears_pending_and_uncommitted_flags() {
		let writer = MemoryIndexWriter::default();
		let log = MemoryUpdateLog::default();
		writer.add_document(&IndexedId(b"A".to_vec()), &Document::new()).unwrap();
		log.append(LogRecord::Add { id: DocId::from("A"), version: shardcore_type::RawVersion::new(1) }).unwrap();
		assert!(writer.has_pending_changes());
		assert!(log.has_uncommitted_changes());

		writer.commit(&CommitCmd::hard()).unwrap();
		log.post_commit(&CommitCmd::hard()).unwrap();
		assert!(!writer.has_pending_changes());
		assert!(!log.has_uncommitted_changes());
	}

	#[test]
	fn live_entries_excludes_deleted_documents() {
		let log = MemoryUpdateLog::default();
		log.append(LogRecord::Add { id: DocId::from("A"), version: shardcore_type::RawVersion::new(1) }).unwrap();
		log.append(LogRecord::Add { id: DocId::from("B"), version: shardcore_type::RawVersion::new(2) }).unwrap();
		log.append(LogRecord::Delete { id: DocId::from("A"), version: shardcore_type::RawVersion::new(3) }).unwrap();

		let live = log.live_entries(10);
		assert_eq!(live.len(), 1);
		assert_eq!(live[0].0, DocId::from("B"));
	}

	#[test]
	fn fingerprint_ignores_entry_order() {
		let a = (DocId::from("a"), 1u64);
		let b = (DocId::from("b"), 2u64);
		let forward = fingerprint_of(&[a.clone(), b.clone()], 2);
		let backward = fingerprint_of(&[b, a], 2);
		assert_eq!(forward, backward);
	}
}
