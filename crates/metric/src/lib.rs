// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

#![cfg_attr(not(debug_assertions), deny(warnings))]

//! The metrics surface exposed by the update core (spec §6): plain
//! counters for request volume, meters for lifecycle events, gauges for
//! point-in-time state, and one timer for Peer Sync latency.

mod counter;
mod timer;

pub use counter::Counter;
pub use timer::{Timer, TimerSnapshot};

/// Request-volume counters, incremented once per successfully-dispatched
/// command.
#[derive(Debug, Default)]
pub struct Counters {
	pub adds: Counter,
	pub deletes_by_id: Counter,
	pub deletes_by_query: Counter,
	pub errors: Counter,
	pub peersync_errors: Counter,
	pub peersync_skipped: Counter,
}

/// Lifecycle-event meters, incremented once per occurrence of the named
/// event (a meter differs from a counter only in intent: it is read as a
/// rate, never reset).
#[derive(Debug, Default)]
pub struct Meters {
	pub commits: Counter,
	pub soft_commits: Counter,
	pub optimizes: Counter,
	pub rollbacks: Counter,
	pub splits: Counter,
	pub merge_indexes: Counter,
	pub expunge_deletes: Counter,
}

/// Point-in-time gauges, set (not incremented) to the current value each
/// time the relevant collaborator is consulted.
#[derive(Debug, Default)]
pub struct Gauges {
	pub docs_pending: Counter,
	pub auto_commits: Counter,
	pub soft_auto_commits: Counter,
	pub txn_logs_total_size: Counter,
	pub txn_logs_total_number: Counter,
}

/// The metrics a single shard's update core reports. Cheap to construct;
/// callers typically hold one behind an `Arc` shared across the Update
/// Handler, Commit Tracker, and Peer Sync instances for that shard.
#[derive(Debug, Default)]
pub struct Metrics {
	pub counters: Counters,
	pub meters: Meters,
	pub gauges: Gauges,
	pub peersync_time: Timer,
}

impl Metrics {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record an error outcome, distinguishing Peer Sync failures (which
	/// have their own counter, spec §6) from ingest-path failures.
	pub fn record_error(&self, during_peer_sync: bool) {
		self.counters.errors.increment();
		if during_peer_sync {
			self.counters.peersync_errors.increment();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn peer_sync_error_increments_both_counters() {
		let metrics = Metrics::new();
		metrics.record_error(true);
		assert_eq!(metrics.counters.errors.get(), 1);
		assert_eq!(metrics.counters.peersync_errors.get(), 1);
	}

	#[test]
	fn ingest_error_does_not_touch_peersync_counter() {
		let metrics = Metrics::new();
		metrics.record_error(false);
		assert_eq!(metrics.counters.errors.get(), 1);
		assert_eq!(metrics.counters.peersync_errors.get(), 0);
	}
}
