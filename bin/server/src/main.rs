// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

//! A small demo wiring the update core end to end: two in-memory shards,
//! one accepting writes through its Update Handler and auto-committing
//! via its Commit Tracker, the other catching up to it through Peer
//! Sync.

use std::sync::Arc;
use std::time::Duration;

use shardcore_core::{AddCmd, CommitCmd, Document, FieldValue};
use shardcore_engine::{UpdateHandler, UpdateHandlerConfig};
use shardcore_metric::Metrics;
use shardcore_semantics::Mode;
use shardcore_sub_replication::{PeerSync, PeerSyncConfig};
use shardcore_testing::{LoopbackPeer, MemoryIndexWriter, MemoryUpdateLog, memory_fingerprinter};
use shardcore_type::{DocId, RawVersion, RequestedVersion};
use tracing::info;

fn init_logging() {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn new_shard(config: UpdateHandlerConfig) -> (Arc<UpdateHandler>, Arc<MemoryIndexWriter>, Arc<MemoryUpdateLog>, Arc<Metrics>) {
	let writer = Arc::new(MemoryIndexWriter::default());
	let log = Arc::new(MemoryUpdateLog::default());
	let metrics = Arc::new(Metrics::new());
	let handler = UpdateHandler::new(config, writer.clone(), log.clone(), metrics.clone());
	(handler, writer, log, metrics)
}

#[tokio::main]
async fn main() {
	init_logging();

	let leader_config = UpdateHandlerConfig {
		auto_commit_max_docs: Some(5),
		semantics_mode: Mode::VersionHybrid,
		..Default::default()
	};
	let (leader, leader_writer, leader_log, leader_metrics) = new_shard(leader_config);

	info!("ingesting documents on the leader shard");
	for n in 1..=12i64 {
		let mut cmd = AddCmd::new(
			DocId::from(format!("product-{n}")),
			Document::new().with_field("id", FieldValue::Text(format!("product-{n}"))).with_field("price", FieldValue::Int(n * 100)),
			RequestedVersion::InsertOnly,
		);
		cmd.version = RawVersion::new(n);
		if let Err(err) = leader.add(cmd) {
			info!(error = %err, "add rejected");
		}
	}
	leader.commit(CommitCmd::hard()).unwrap();
	info!(
		adds = leader_metrics.counters.adds.get(),
		commits = leader_metrics.meters.commits.get(),
		"leader shard settled after auto-commit and an explicit hard commit"
	);

	let follower_config = UpdateHandlerConfig { semantics_mode: Mode::VersionHybrid, ..Default::default() };
	let (follower, _follower_writer, follower_log, follower_metrics) = new_shard(follower_config);
	// The follower saw the leader's first few writes before falling
	// behind, so its window overlaps the leader's recent-updates list.
	for n in 1..=3i64 {
		follower_log
			.append(shardcore_core::LogRecord::Add { id: DocId::from(format!("product-{n}")), version: RawVersion::new(n) })
			.unwrap();
	}

	let leader_fingerprinter = Arc::new(memory_fingerprinter(leader_log.clone()));
	let follower_fingerprinter = Arc::new(memory_fingerprinter(follower_log.clone()));
	let leader_peer = Arc::new(LoopbackPeer::new("leader", leader_writer, leader_log, leader_fingerprinter)) as Arc<dyn shardcore_sub_replication::PeerTransport>;

	let peer_sync = PeerSync::new(
		PeerSyncConfig { do_fingerprint: false, ..Default::default() },
		follower_log,
		follower_fingerprinter,
		follower.clone(),
		follower_metrics.clone(),
	);

	info!("running peer sync on the follower shard");
	let result = peer_sync.sync(&[leader_peer], None).await;
	info!(success = result.success, adds = follower_metrics.counters.adds.get(), "peer sync finished");

	// Give the commit trackers' background threads a moment to settle
	// before the process tears them down.
	tokio::time::sleep(Duration::from_millis(10)).await;
}
