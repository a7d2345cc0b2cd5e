// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

/// Configuration for one Peer Sync run (spec §6, "Peer sync").
#[derive(Debug, Clone)]
pub struct PeerSyncConfig {
	/// `N`: the at-most-N most recent updates requested per peer.
	pub n_updates: usize,
	/// A transport failure reaching a peer during the versions fetch
	/// counts as success rather than failure (spec §4.D step 6).
	pub cant_reach_is_success: bool,
	/// A peer returning zero versions is treated as a successful sync
	/// rather than a failure.
	pub get_no_versions_is_success: bool,
	/// Only attempt sync while this shard is in the active role; callers
	/// gate this before invoking `PeerSync::sync`, the flag is carried
	/// through to mirror the original request parameter (spec §6).
	pub only_if_active: bool,
	/// Probe peer fingerprints for the fast "already in sync" shortcut
	/// (spec §4.D step 1). Corresponds to the `disableFingerprint`
	/// environment flag being unset.
	pub do_fingerprint: bool,
	/// Prefer range mode over individual mode when a peer advertises
	/// `checkCanHandleVersionRanges`.
	pub use_range_versions_for_peer_sync: bool,
	/// Upper bound on the number of update versions Peer Sync will ever
	/// request from a single peer in one round; exceeding it fails the
	/// sync for that peer (spec §4.D "Range mode selection").
	pub max_updates: u64,
}

impl Default for PeerSyncConfig {
	fn default() -> Self {
		Self {
			n_updates: 100,
			cant_reach_is_success: true,
			get_no_versions_is_success: true,
			only_if_active: true,
			do_fingerprint: true,
			use_range_versions_for_peer_sync: true,
			max_updates: 10_000,
		}
	}
}

/// The outcome of one Peer Sync run (spec §4.D "Result").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeerSyncResult {
	pub success: bool,
	/// Set only in the "we have zero versions at all" branch (spec §4.D
	/// step 4): whether any peer reported having versions we lack.
	pub other_has_versions: Option<bool>,
}

impl PeerSyncResult {
	pub fn success() -> Self {
		Self { success: true, other_has_versions: None }
	}

	pub fn failure() -> Self {
		Self { success: false, other_has_versions: None }
	}

	pub fn failure_with(other_has_versions: bool) -> Self {
		Self { success: false, other_has_versions: Some(other_has_versions) }
	}
}
