// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

/// Per-command bit flags (spec §6). A plain `u32` bitmask rather than a
/// generated bitflags type: the set is small, fixed, and every consumer in
/// this workspace just tests a single bit at a time.
pub mod update_flags {
	/// No flags set.
	pub const NONE: u32 = 0;
	/// Suppress the auto-commit tracker's accounting for this command. Set
	/// on every command replayed during Peer Sync and transaction-log
	/// replay, since those commands already happened once on the leader.
	pub const IGNORE_AUTOCOMMIT: u32 = 1 << 0;
	/// This command originates from a Peer Sync replay rather than an
	/// ingest request. Suppresses re-forwarding and re-versioning.
	pub const PEER_SYNC: u32 = 1 << 1;
}

#[inline]
pub fn has_flag(flags: u32, flag: u32) -> bool {
	flags & flag != 0
}

#[inline]
pub fn with_flag(flags: u32, flag: u32) -> u32 {
	flags | flag
}
