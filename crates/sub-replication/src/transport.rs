// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

//! The shard-RPC transport Peer Sync drives (spec §1, §4.D). Spec §4.D
//! describes the wire format as HTTP query parameters against `/get`
//! (`getVersions`, `getFingerprint`, `getUpdates`, `checkCanHandleVersionRanges`),
//! but the out-of-scope boundary is the RPC contract, not the wire
//! encoding: this crate expresses it as an async trait so a real
//! deployment can back it with whatever channel it already has open to a
//! peer (this workspace's own replication stack uses `tonic`/`prost`
//! rather than REST, so a request/response struct pair per RPC — not a
//! query string — is the natural shape here).

use async_trait::async_trait;
use shardcore_core::Document;
pub use shardcore_core::FingerprintDigest;
use shardcore_type::DocId;

/// Transport-layer failure causes Peer Sync distinguishes when
/// `cantReachIsSuccess` is configured (spec §4.D step 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
	ConnectRefused,
	ConnectTimeout,
	NoHttpResponse,
	Socket,
	Http503,
	Http404,
	Other,
}

impl TransportError {
	/// The set of causes spec §4.D treats as "the peer is simply absent",
	/// eligible to be counted as success rather than failure when
	/// `cantReachIsSuccess` is set.
	pub fn is_unreachable_peer(self) -> bool {
		matches!(
			self,
			TransportError::ConnectRefused
				| TransportError::ConnectTimeout
				| TransportError::NoHttpResponse
				| TransportError::Socket
				| TransportError::Http503
				| TransportError::Http404
		)
	}
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Reply to `getVersions=N[, fingerprint=true]`.
#[derive(Debug, Clone)]
pub struct VersionsResponse {
	/// The peer's recent signed versions, in whatever order the peer
	/// returned them; Peer Sync re-sorts by `|version|` descending.
	pub versions: Vec<i64>,
	pub fingerprint: Option<FingerprintDigest>,
}

/// What to ask for in a `getUpdates` call: either an explicit list of
/// versions (individual mode) or `lo...hi` inclusive ranges (range mode),
/// matching the two selection strategies in spec §4.D.
#[derive(Debug, Clone)]
pub enum UpdateSelector {
	Versions(Vec<u64>),
	Ranges(Vec<(u64, u64)>),
}

impl UpdateSelector {
	/// How many distinct update versions this selector ultimately asks
	/// for, used against the `maxUpdates` bound (spec §4.D "Range mode
	/// selection").
	pub fn requested_count(&self) -> u64 {
		match self {
			UpdateSelector::Versions(vs) => vs.len() as u64,
			UpdateSelector::Ranges(ranges) => ranges.iter().map(|(lo, hi)| hi.saturating_sub(*lo) + 1).sum(),
		}
	}

	pub fn is_empty(&self) -> bool {
		match self {
			UpdateSelector::Versions(vs) => vs.is_empty(),
			UpdateSelector::Ranges(ranges) => ranges.is_empty(),
		}
	}
}

/// One replayable update record (spec §4.D "Replay" table).
#[derive(Debug, Clone)]
pub enum WireUpdate {
	Add { id: DocId, version: i64, doc: Document },
	Delete { id: DocId, version: i64 },
	DeleteByQuery { query: String, version: i64 },
	UpdateInPlace { id: DocId, version: i64, doc_values: Document },
}

impl WireUpdate {
	pub fn version(&self) -> i64 {
		match self {
			WireUpdate::Add { version, .. } => *version,
			WireUpdate::Delete { version, .. } => *version,
			WireUpdate::DeleteByQuery { version, .. } => *version,
			WireUpdate::UpdateInPlace { version, .. } => *version,
		}
	}
}

/// Reply to `getUpdates=<selector>[, fingerprint=true]`.
#[derive(Debug, Clone)]
pub struct UpdatesResponse {
	pub records: Vec<WireUpdate>,
	pub fingerprint: Option<FingerprintDigest>,
}

/// The four peer RPCs spec §4.D names, each carrying `qt="/get",
/// distrib=false` in the original wire format. Implementations dial one
/// specific peer; Peer Sync holds one `Arc<dyn PeerTransport>` per peer.
#[async_trait]
pub trait PeerTransport: Send + Sync {
	fn peer_name(&self) -> &str;

	async fn get_fingerprint(&self, max_version: u64) -> TransportResult<FingerprintDigest>;

	async fn get_versions(&self, n: usize, with_fingerprint: bool) -> TransportResult<VersionsResponse>;

	async fn check_can_handle_version_ranges(&self) -> TransportResult<bool>;

	async fn get_updates(&self, selector: UpdateSelector, with_fingerprint: bool) -> TransportResult<UpdatesResponse>;
}
