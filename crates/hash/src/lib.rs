// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

#![cfg_attr(not(debug_assertions), deny(warnings))]

//! The index fingerprint digest (spec §5). A fingerprint summarises
//! "everything in this shard up to `max_version`" into a small,
//! order-independent value two shards can compare without exchanging their
//! full update history.
//!
//! The combiner folds each `(id, |version|)` pair into a running XOR of
//! per-entry xxh3 hashes. XOR is commutative and self-cancelling, so the
//! result does not depend on iteration order — required, since the
//! in-memory and on-disk sources a real writer would pull entries from make
//! no ordering guarantee across documents.

use shardcore_core::{FingerprintDigest, Fingerprinter};
use shardcore_type::DocId;
use xxhash_rust::xxh3::Xxh3;

fn hash_entry(id: &DocId, version_magnitude: u64) -> u64 {
	let mut hasher = Xxh3::new();
	hasher.update(id.0.as_bytes());
	hasher.update(&version_magnitude.to_le_bytes());
	hasher.digest()
}

/// Builds a [`FingerprintDigest`] incrementally from a stream of entries
/// already filtered to `version <= max_version`. Streaming rather than
/// collect-then-hash because the caller (the update log's iteration over
/// its in-memory and on-disk records) never needs to materialise the full
/// entry set at once.
#[derive(Debug, Clone, Default)]
pub struct FingerprintBuilder {
	digest: u64,
	num_docs: u64,
	max_doc_version_encountered: u64,
}

impl FingerprintBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, id: &DocId, version_magnitude: u64) {
		self.digest ^= hash_entry(id, version_magnitude);
		self.num_docs += 1;
		self.max_doc_version_encountered = self.max_doc_version_encountered.max(version_magnitude);
	}

	pub fn finish(self, max_version: u64) -> FingerprintDigest {
		FingerprintDigest {
			max_version,
			num_docs: self.num_docs,
			max_doc_version_encountered: self.max_doc_version_encountered,
			digest: self.digest,
		}
	}
}

/// Computes a fingerprint over an arbitrary entry source. Real deployments
/// back `source` with the update log and the index's stored-version
/// iterator; `shardcore-testing` backs it with a plain `Vec`.
pub struct IndexFingerprinter<F> {
	entries: F,
}

impl<F> IndexFingerprinter<F>
where
	F: Fn(u64) -> Vec<(DocId, u64)> + Send + Sync,
{
	pub fn new(entries: F) -> Self {
		Self { entries }
	}
}

impl<F> Fingerprinter for IndexFingerprinter<F>
where
	F: Fn(u64) -> Vec<(DocId, u64)> + Send + Sync,
{
	fn compute(&self, max_version: u64) -> FingerprintDigest {
		let mut builder = FingerprintBuilder::new();
		for (id, version_magnitude) in (self.entries)(max_version) {
			builder.push(&id, version_magnitude);
		}
		builder.finish(max_version)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn digest_is_order_independent() {
		let a = DocId::from("a");
		let b = DocId::from("b");

		let mut forward = FingerprintBuilder::new();
		forward.push(&a, 1);
		forward.push(&b, 2);
		let forward = forward.finish(2);

		let mut backward = FingerprintBuilder::new();
		backward.push(&b, 2);
		backward.push(&a, 1);
		let backward = backward.finish(2);

		assert_eq!(forward, backward);
	}

	#[test]
	fn differing_version_produces_differing_digest() {
		let a = DocId::from("a");

		let mut v1 = FingerprintBuilder::new();
		v1.push(&a, 1);
		let v1 = v1.finish(1);

		let mut v2 = FingerprintBuilder::new();
		v2.push(&a, 2);
		let v2 = v2.finish(2);

		assert_ne!(v1.digest, v2.digest);
	}

	#[test]
	fn empty_digest_is_stable_zero() {
		let digest = FingerprintBuilder::new().finish(0);
		assert_eq!(digest.digest, 0);
		assert_eq!(digest.num_docs, 0);
	}

	#[test]
	fn fingerprinter_respects_ceiling() {
		let all = vec![(DocId::from("a"), 1u64), (DocId::from("b"), 5), (DocId::from("c"), 9)];
		let fingerprinter = IndexFingerprinter::new(move |max_version: u64| {
			all.iter().filter(|(_, v)| *v <= max_version).cloned().collect()
		});

		let low = fingerprinter.compute(5);
		assert_eq!(low.num_docs, 2);
		let high = fingerprinter.compute(100);
		assert_eq!(high.num_docs, 3);
	}
}
