// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

#![cfg_attr(not(debug_assertions), deny(warnings))]

//! The Commit Tracker (spec §4.A): a single-threaded, timer-driven
//! scheduler that decides when an auto-commit fires. One instance exists
//! per shard per commit kind (hard, soft); the Update Handler owns both
//! and routes each mutation's notification to the one selected by
//! `commitWithinSoftCommit`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use shardcore_type::Result;
use tracing::{debug, instrument, warn};

/// Static configuration for one tracker (spec §6, "Update handler"
/// configuration block).
#[derive(Debug, Clone, Copy)]
pub struct CommitTrackerConfig {
	/// Fire a commit once this many documents are pending. `None` disables
	/// the doc-count trigger.
	pub docs_upper_bound: Option<u64>,
	/// Fire a commit once this much time has elapsed since the first
	/// pending document. `None` disables the time trigger.
	pub time_upper_bound: Option<Duration>,
	pub open_searcher_on_commit: bool,
	pub is_soft: bool,
}

/// The collaborator a tracker fires a commit through — the Update Handler,
/// in production; a recording fake in tests.
pub trait CommitSink: Send + Sync {
	fn fire_commit(&self, is_soft: bool, open_searcher: bool) -> Result<()>;
}

struct SchedulerState {
	deadline: Option<Instant>,
	shutting_down: bool,
}

/// Tracks pending documents and schedules the next auto-commit. Dropping
/// the last `Arc` stops the scheduler thread.
pub struct CommitTracker {
	config: CommitTrackerConfig,
	sink: Arc<dyn CommitSink>,
	pending_docs: AtomicU64,
	has_pending_since: Mutex<Option<Instant>>,
	state: Mutex<SchedulerState>,
	wakeup: Condvar,
	committing: AtomicBool,
}

impl CommitTracker {
	pub fn new(config: CommitTrackerConfig, sink: Arc<dyn CommitSink>) -> Arc<Self> {
		let tracker = Arc::new(Self {
			config,
			sink,
			pending_docs: AtomicU64::new(0),
			has_pending_since: Mutex::new(None),
			state: Mutex::new(SchedulerState { deadline: None, shutting_down: false }),
			wakeup: Condvar::new(),
			committing: AtomicBool::new(false),
		});
		let scheduler = tracker.clone();
		std::thread::Builder::new()
			.name(format!("shardcore-commit-{}", if config.is_soft { "soft" } else { "hard" }))
			.spawn(move || scheduler.run())
			.expect("failed to spawn commit scheduler thread");
		tracker
	}

	pub fn docs_pending(&self) -> u64 {
		self.pending_docs.load(Ordering::Acquire)
	}

	/// `commit_within` is the per-command override (spec §4.A
	/// `addedDocument(commitWithin)`): when set and positive, it schedules
	/// a commit at `now + commit_within` regardless of whether one is
	/// already scheduled, since a caller-specified deadline is a promise
	/// to that caller, not just a fallback.
	#[instrument(name = "commit_tracker::added_document", level = "trace", skip(self))]
	pub fn added_document(&self, commit_within: Option<Duration>) {
		let pending = self.pending_docs.fetch_add(1, Ordering::AcqRel) + 1;
		self.mark_first_pending_if_needed();
		if let Some(bound) = self.config.docs_upper_bound
			&& pending >= bound
		{
			self.schedule_commit_within(Duration::ZERO);
			return;
		}
		match commit_within {
			Some(within) if within > Duration::ZERO => self.schedule_commit_within(within),
			_ => self.schedule_from_time_upper_bound_if_idle(),
		}
	}

	#[instrument(name = "commit_tracker::deleted_document", level = "trace", skip(self))]
	pub fn deleted_document(&self, commit_within: Option<Duration>) {
		self.added_document(commit_within);
	}

	fn mark_first_pending_if_needed(&self) {
		let mut first = self.has_pending_since.lock().unwrap();
		if first.is_none() {
			*first = Some(Instant::now());
		}
	}

	/// spec §4.A: "otherwise if timeUpperBound > 0 and nothing is
	/// scheduled, schedules one at that delay" — only fires when no
	/// commit is already on the calendar, unlike the per-command
	/// override above which always (re)schedules.
	fn schedule_from_time_upper_bound_if_idle(&self) {
		let Some(bound) = self.config.time_upper_bound else { return };
		let nothing_scheduled = self.state.lock().unwrap().deadline.is_none();
		if nothing_scheduled {
			self.schedule_commit_within(bound);
		}
	}

	/// Schedule a commit to fire no later than `within` from now. Only
	/// the nearest pending deadline is ever materialized — an earlier
	/// request already in flight is never pushed back.
	pub fn schedule_commit_within(&self, within: Duration) {
		let candidate = Instant::now() + within;
		let mut state = self.state.lock().unwrap();
		let sooner = match state.deadline {
			Some(existing) => candidate < existing,
			None => true,
		};
		if sooner {
			state.deadline = Some(candidate);
			drop(state);
			self.wakeup.notify_all();
		}
	}

	pub fn cancel_pending_commit(&self) {
		let mut state = self.state.lock().unwrap();
		state.deadline = None;
		drop(state);
		self.wakeup.notify_all();
	}

	#[instrument(name = "commit_tracker::did_commit", level = "debug", skip(self))]
	pub fn did_commit(&self) {
		self.pending_docs.store(0, Ordering::Release);
		*self.has_pending_since.lock().unwrap() = None;
		self.cancel_pending_commit();
	}

	#[instrument(name = "commit_tracker::did_rollback", level = "debug", skip(self))]
	pub fn did_rollback(&self) {
		self.did_commit();
	}

	pub fn shutdown(&self) {
		let mut state = self.state.lock().unwrap();
		state.shutting_down = true;
		drop(state);
		self.wakeup.notify_all();
	}

	fn run(self: Arc<Self>) {
		loop {
			let mut state = self.state.lock().unwrap();
			if state.shutting_down {
				return;
			}
			let Some(deadline) = state.deadline else {
				state = self.wakeup.wait(state).unwrap();
				if state.shutting_down {
					return;
				}
				continue;
			};
			let now = Instant::now();
			if now >= deadline {
				state.deadline = None;
				drop(state);
				self.fire();
				continue;
			}
			let (guard, timeout) = self.wakeup.wait_timeout(state, deadline - now).unwrap();
			state = guard;
			if state.shutting_down {
				return;
			}
			if timeout.timed_out() && state.deadline == Some(deadline) {
				state.deadline = None;
				drop(state);
				self.fire();
			}
		}
	}

	fn fire(&self) {
		if self.committing.swap(true, Ordering::AcqRel) {
			debug!("commit already in flight, skipping scheduled fire");
			return;
		}
		let result = self.sink.fire_commit(self.config.is_soft, self.config.open_searcher_on_commit);
		self.committing.store(false, Ordering::Release);
		match result {
			Ok(()) => self.did_commit(),
			Err(err) => warn!(error = %err, "scheduled auto-commit failed"),
		}
	}
}

impl Drop for CommitTracker {
	fn drop(&mut self) {
		self.shutdown();
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex as StdMutex;

	use super::*;

	#[derive(Default)]
	struct RecordingSink {
		fired: StdMutex<Vec<bool>>,
	}

	impl CommitSink for RecordingSink {
		fn fire_commit(&self, is_soft: bool, _open_searcher: bool) -> Result<()> {
			self.fired.lock().unwrap().push(is_soft);
			Ok(())
		}
	}

	fn config(docs: Option<u64>, time: Option<Duration>) -> CommitTrackerConfig {
		CommitTrackerConfig { docs_upper_bound: docs, time_upper_bound: time, open_searcher_on_commit: true, is_soft: false }
	}

	#[test]
	fn docs_upper_bound_triggers_a_commit() {
		let sink = Arc::new(RecordingSink::default());
		let tracker = CommitTracker::new(config(Some(2), None), sink.clone());

		tracker.added_document(None);
		assert_eq!(tracker.docs_pending(), 1);
		tracker.added_document(None);

		for _ in 0..200 {
			if !sink.fired.lock().unwrap().is_empty() {
				break;
			}
			std::thread::sleep(Duration::from_millis(5));
		}
		assert_eq!(sink.fired.lock().unwrap().len(), 1);
		assert_eq!(tracker.docs_pending(), 0);
	}

	#[test]
	fn did_commit_resets_pending_count() {
		let sink = Arc::new(RecordingSink::default());
		let tracker = CommitTracker::new(config(None, None), sink);
		tracker.added_document(None);
		tracker.added_document(None);
		assert_eq!(tracker.docs_pending(), 2);
		tracker.did_commit();
		assert_eq!(tracker.docs_pending(), 0);
	}

	#[test]
	fn cancel_pending_commit_prevents_a_scheduled_fire() {
		let sink = Arc::new(RecordingSink::default());
		let tracker = CommitTracker::new(config(None, Some(Duration::from_millis(20))), sink.clone());
		tracker.added_document(None);
		tracker.cancel_pending_commit();
		std::thread::sleep(Duration::from_millis(80));
		assert!(sink.fired.lock().unwrap().is_empty());
	}

	#[test]
	fn per_command_commit_within_overrides_the_configured_time_bound() {
		let sink = Arc::new(RecordingSink::default());
		// No configured bounds at all; only the per-command override
		// should cause a commit to fire (spec §4.A `addedDocument(commitWithin)`).
		let tracker = CommitTracker::new(config(None, None), sink.clone());
		tracker.added_document(Some(Duration::from_millis(10)));

		for _ in 0..200 {
			if !sink.fired.lock().unwrap().is_empty() {
				break;
			}
			std::thread::sleep(Duration::from_millis(5));
		}
		assert_eq!(sink.fired.lock().unwrap().len(), 1);
	}
}
