// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

use std::sync::atomic::{AtomicI64, Ordering};

/// A monotonic (or freely adjustable) `i64` counter. Backs both the plain
/// counters and the gauges in this crate; the distinction between the two
/// is in how callers use `set` vs `increment`, not in the representation.
#[derive(Debug, Default)]
pub struct Counter(AtomicI64);

impl Counter {
	pub fn increment(&self) {
		self.0.fetch_add(1, Ordering::Relaxed);
	}

	pub fn add(&self, delta: i64) {
		self.0.fetch_add(delta, Ordering::Relaxed);
	}

	pub fn set(&self, value: i64) {
		self.0.store(value, Ordering::Relaxed);
	}

	pub fn get(&self) -> i64 {
		self.0.load(Ordering::Relaxed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn increment_and_add_accumulate() {
		let c = Counter::default();
		c.increment();
		c.add(4);
		assert_eq!(c.get(), 5);
	}

	#[test]
	fn set_overwrites() {
		let c = Counter::default();
		c.add(10);
		c.set(3);
		assert_eq!(c.get(), 3);
	}
}
