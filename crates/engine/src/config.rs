// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

use std::time::Duration;

use shardcore_semantics::Mode;

/// Configuration for one Update Handler instance (spec §6, "Update
/// handler").
#[derive(Debug, Clone)]
pub struct UpdateHandlerConfig {
	pub auto_commit_max_docs: Option<u64>,
	pub auto_commit_max_time: Option<Duration>,
	pub auto_commit_open_searcher: bool,
	pub auto_soft_commit_max_docs: Option<u64>,
	pub auto_soft_commit_max_time: Option<Duration>,
	/// `true` routes `addedDocument`/`deletedDocument` notifications to
	/// the soft tracker instead of the hard tracker.
	pub commit_within_soft_commit: bool,
	pub index_writer_close_waits_for_merges: bool,
	pub semantics_mode: Mode,
	/// The unique-key field name, needed to decide in-place-update
	/// eligibility (spec §4.C).
	pub unique_key_field: String,
	/// Rollback is rejected outright when the node is cluster-aware (spec
	/// §4.C "Rollback").
	pub cluster_aware: bool,
}

impl Default for UpdateHandlerConfig {
	fn default() -> Self {
		Self {
			auto_commit_max_docs: None,
			auto_commit_max_time: None,
			auto_commit_open_searcher: true,
			auto_soft_commit_max_docs: None,
			auto_soft_commit_max_time: None,
			commit_within_soft_commit: false,
			index_writer_close_waits_for_merges: true,
			semantics_mode: Mode::Classic,
			unique_key_field: "id".to_string(),
			cluster_aware: false,
		}
	}
}
