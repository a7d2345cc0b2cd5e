// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::trace;

#[derive(Debug, Default)]
struct TimerState {
	count: AtomicU64,
	sum_nanos: AtomicU64,
	max_nanos: AtomicU64,
}

impl TimerState {
	fn record(&self, elapsed: Duration) {
		let nanos = elapsed.as_nanos().min(u64::MAX as u128) as u64;
		self.count.fetch_add(1, Ordering::Relaxed);
		self.sum_nanos.fetch_add(nanos, Ordering::Relaxed);
		self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
	}
}

/// A snapshot of a [`Timer`]'s accumulated samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
	pub count: u64,
	pub mean_nanos: u64,
	pub max_nanos: u64,
}

/// Records elapsed-time samples (the `peersync.time` timer, spec §6) off the
/// calling thread: `record` only sends the sample down a channel, and a
/// single background aggregator thread folds samples into the atomics a
/// reader sees through `snapshot`. This keeps the recording side wait-free
/// even if a reader is mid-snapshot, the same shape the update core uses
/// for its other hot-path counters.
#[derive(Clone)]
pub struct Timer {
	tx: Sender<Duration>,
	state: Arc<TimerState>,
}

impl Timer {
	pub fn new() -> Self {
		let (tx, rx): (Sender<Duration>, Receiver<Duration>) = unbounded();
		let state = Arc::new(TimerState::default());
		let worker_state = state.clone();
		std::thread::Builder::new()
			.name("shardcore-metric-timer".into())
			.spawn(move || {
				for sample in rx.iter() {
					worker_state.record(sample);
				}
				trace!("metric timer aggregator thread exiting, sender dropped");
			})
			.expect("failed to spawn metric timer aggregator thread");
		Self { tx, state }
	}

	/// Record one elapsed duration. Never blocks the caller on the
	/// aggregator; an unbounded channel absorbs bursts.
	pub fn record(&self, elapsed: Duration) {
		let _ = self.tx.send(elapsed);
	}

	/// Time `f` and record its elapsed duration.
	pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
		let start = std::time::Instant::now();
		let result = f();
		self.record(start.elapsed());
		result
	}

	pub fn snapshot(&self) -> TimerSnapshot {
		let count = self.state.count.load(Ordering::Relaxed);
		let sum = self.state.sum_nanos.load(Ordering::Relaxed);
		let mean = if count == 0 { 0 } else { sum / count };
		TimerSnapshot { count, mean_nanos: mean, max_nanos: self.state.max_nanos.load(Ordering::Relaxed) }
	}
}

impl Default for Timer {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for Timer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Timer").field("snapshot", &self.snapshot()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn snapshot_reflects_recorded_samples() {
		let timer = Timer::new();
		timer.record(Duration::from_millis(10));
		timer.record(Duration::from_millis(30));

		// The aggregator thread drains asynchronously; give it a moment.
		let mut snapshot = timer.snapshot();
		for _ in 0..1000 {
			if snapshot.count == 2 {
				break;
			}
			std::thread::sleep(Duration::from_millis(1));
			snapshot = timer.snapshot();
		}

		assert_eq!(snapshot.count, 2);
		assert_eq!(snapshot.mean_nanos, Duration::from_millis(20).as_nanos() as u64);
		assert_eq!(snapshot.max_nanos, Duration::from_millis(30).as_nanos() as u64);
	}
}
