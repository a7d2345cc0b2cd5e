// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

//! An in-process `PeerTransport` backed by another shard's in-memory
//! collaborators, so Peer Sync can be exercised end to end — two shards
//! reconciling — without a network or a real RPC layer.

use std::sync::Arc;

use async_trait::async_trait;
use shardcore_core::{Fingerprinter, LogRecord, UpdateLog};
use shardcore_sub_replication::{PeerTransport, TransportResult, UpdateSelector, UpdatesResponse, VersionsResponse, WireUpdate};
use shardcore_type::IndexedId;

use crate::memory::MemoryIndexWriter;

/// Dials a remote shard's update log / writer / fingerprinter directly
/// in-process, answering every `PeerTransport` RPC from their current
/// state.
pub struct LoopbackPeer {
	name: String,
	writer: Arc<MemoryIndexWriter>,
	log: Arc<dyn UpdateLog>,
	fingerprinter: Arc<dyn Fingerprinter>,
	can_handle_ranges: bool,
}

impl LoopbackPeer {
	pub fn new(name: impl Into<String>, writer: Arc<MemoryIndexWriter>, log: Arc<dyn UpdateLog>, fingerprinter: Arc<dyn Fingerprinter>) -> Self {
		Self { name: name.into(), writer, log, fingerprinter, can_handle_ranges: true }
	}

	pub fn without_range_support(mut self) -> Self {
		self.can_handle_ranges = false;
		self
	}
}

#[async_trait]
impl PeerTransport for LoopbackPeer {
	fn peer_name(&self) -> &str {
		&self.name
	}

	async fn get_fingerprint(&self, max_version: u64) -> TransportResult<shardcore_sub_replication::FingerprintDigest> {
		Ok(self.fingerprinter.compute(max_version))
	}

	async fn get_versions(&self, n: usize, with_fingerprint: bool) -> TransportResult<VersionsResponse> {
		let records = self.log.recent_updates(n);
		let versions = records.iter().map(|r| r.version().0).collect();
		let fingerprint = with_fingerprint.then(|| self.fingerprinter.compute(u64::MAX));
		Ok(VersionsResponse { versions, fingerprint })
	}

	async fn check_can_handle_version_ranges(&self) -> TransportResult<bool> {
		Ok(self.can_handle_ranges)
	}

	async fn get_updates(&self, selector: UpdateSelector, with_fingerprint: bool) -> TransportResult<UpdatesResponse> {
		let wanted: Vec<u64> = match selector {
			UpdateSelector::Versions(vs) => vs,
			UpdateSelector::Ranges(ranges) => ranges.into_iter().flat_map(|(lo, hi)| lo..=hi).collect(),
		};

		let records = self.log.recent_updates(usize::MAX);
		let mut wire = Vec::new();
		for record in records {
			if !wanted.contains(&record.version().magnitude()) {
				continue;
			}
			wire.push(match record {
				LogRecord::Add { id, version } => {
					let indexed_id = IndexedId::from_doc_id(&id);
					let doc = self.writer.document(&indexed_id).unwrap_or_default();
					WireUpdate::Add { id, version: version.0, doc }
				}
				LogRecord::Delete { id, version } => WireUpdate::Delete { id, version: version.0 },
				LogRecord::DeleteByQuery { query, version } => WireUpdate::DeleteByQuery { query, version: version.0 },
			});
		}

		let fingerprint = with_fingerprint.then(|| self.fingerprinter.compute(u64::MAX));
		Ok(UpdatesResponse { records: wire, fingerprint })
	}
}

#[cfg(test)]
mod tests {
	use shardcore_core::{AddCmd, Document, FieldValue};
	use shardcore_engine::{UpdateHandler, UpdateHandlerConfig};
	use shardcore_metric::Metrics;
	use shardcore_semantics::Mode;
	use shardcore_sub_replication::{PeerSync, PeerSyncConfig};
	use shardcore_type::{DocId, RequestedVersion};

	use super::*;
	use crate::memory::{MemoryUpdateLog, memory_fingerprinter};

	fn shard() -> (Arc<UpdateHandler>, Arc<MemoryIndexWriter>, Arc<MemoryUpdateLog>) {
		let writer = Arc::new(MemoryIndexWriter::default());
		let log = Arc::new(MemoryUpdateLog::default());
		let config = UpdateHandlerConfig { semantics_mode: Mode::Classic, ..Default::default() };
		let handler = UpdateHandler::new(config, writer.clone(), log.clone(), Arc::new(Metrics::new()));
		(handler, writer, log)
	}

	#[tokio::test]
	async fn a_lagging_shard_catches_up_to_a_leader_through_loopback() {
		let (leader, leader_writer, leader_log) = shard();
		for n in 1..=15 {
			let mut cmd = AddCmd::new(DocId::from(format!("doc-{n}")), Document::new().with_field("n", FieldValue::Int(n)), RequestedVersion::InsertOnly);
			cmd.version = shardcore_type::RawVersion::new(n);
			leader.add(cmd).unwrap();
		}

		// The follower shares the leader's oldest five versions (it fell
		// behind at version 5) so both windows overlap and the threshold
		// math has something to anchor on.
		let (follower, _follower_writer, follower_log) = shard();
		for n in 1..=5 {
			follower_log.append(LogRecord::Add { id: DocId::from(format!("doc-{n}")), version: shardcore_type::RawVersion::new(n) }).unwrap();
		}

		let follower_fp = Arc::new(memory_fingerprinter(follower_log.clone()));
		let leader_fp = Arc::new(memory_fingerprinter(leader_log.clone()));

		let leader_peer = LoopbackPeer::new("leader", leader_writer, leader_log, leader_fp);
		let config = PeerSyncConfig { do_fingerprint: false, ..Default::default() };
		let peer_sync = PeerSync::new(config, follower_log, follower_fp, follower.clone(), Arc::new(Metrics::new()));

		let result = peer_sync.sync(&[Arc::new(leader_peer)], None).await;
		assert!(result.success, "{result:?}");
		assert_eq!(follower.metrics().counters.adds.get(), 10);
	}
}
