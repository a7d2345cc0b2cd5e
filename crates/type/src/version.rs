// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

use std::fmt::{Display, Formatter};

/// The raw, signed version as it is stored in the update log.
///
/// The absolute value is the monotonically increasing version counter for a
/// document key; the sign marks whether the entry is a delete-shaped
/// tombstone (`v < 0`) or a live value (`v >= 0`). See the GLOSSARY entry for
/// "DBQ"/tombstone in the design notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawVersion(pub i64);

impl RawVersion {
	/// The sentinel used by delete-by-query to mean "wipe everything,
	/// no version protection, no log entry".
	pub const MATCH_ALL: RawVersion = RawVersion(i64::MIN + 1);

	pub fn new(v: i64) -> Self {
		Self(v)
	}

	/// The monotonically increasing counter, independent of tombstone sign.
	pub fn magnitude(self) -> u64 {
		self.0.unsigned_abs()
	}

	/// `true` when this entry is a delete-shaped tombstone.
	pub fn is_tombstone(self) -> bool {
		self.0 < 0
	}

	pub fn is_match_all(self) -> bool {
		self == Self::MATCH_ALL
	}
}

impl Display for RawVersion {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		Display::fmt(&self.0, f)
	}
}

impl From<i64> for RawVersion {
	fn from(v: i64) -> Self {
		Self(v)
	}
}

/// The version assertion carried by an ingest request (spec §3, "Document identity").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedVersion {
	/// `requestedVersion == 0`: no assertion, apply unconditionally.
	None,
	/// `requestedVersion == -1`: must not already exist.
	InsertOnly,
	/// `requestedVersion > 0`: must exist at exactly this version.
	Exact(u64),
}

impl RequestedVersion {
	pub fn from_raw(v: i64) -> Self {
		match v {
			0 => RequestedVersion::None,
			-1 => RequestedVersion::InsertOnly,
			v if v > 0 => RequestedVersion::Exact(v as u64),
			// Any other negative value has no defined ingest-level meaning;
			// treat it the same as "no assertion" rather than panic, the
			// way a malformed optional field would be ignored upstream.
			_ => RequestedVersion::None,
		}
	}

	pub fn as_raw(self) -> i64 {
		match self {
			RequestedVersion::None => 0,
			RequestedVersion::InsertOnly => -1,
			RequestedVersion::Exact(v) => v as i64,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn magnitude_ignores_tombstone_sign() {
		assert_eq!(RawVersion(-42).magnitude(), 42);
		assert_eq!(RawVersion(42).magnitude(), 42);
	}

	#[test]
	fn tombstone_detection() {
		assert!(RawVersion(-1).is_tombstone());
		assert!(!RawVersion(0).is_tombstone());
		assert!(!RawVersion(1).is_tombstone());
	}

	#[test]
	fn requested_version_roundtrip() {
		assert_eq!(RequestedVersion::from_raw(0), RequestedVersion::None);
		assert_eq!(RequestedVersion::from_raw(-1), RequestedVersion::InsertOnly);
		assert_eq!(RequestedVersion::from_raw(1234), RequestedVersion::Exact(1234));
		assert_eq!(RequestedVersion::Exact(1234).as_raw(), 1234);
		assert_eq!(RequestedVersion::InsertOnly.as_raw(), -1);
	}
}
