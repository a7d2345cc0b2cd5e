// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

#![cfg_attr(not(debug_assertions), deny(warnings))]

//! Peer Sync (spec §4.D): a pull-based recovery protocol that detects
//! divergence between this shard and a set of replica peers, requests the
//! missing recent updates, and replays them through the local Update
//! Handler (`shardcore-engine`).

mod config;
mod percentile;
mod ranges;
mod replay;
mod sync;
#[cfg(test)]
mod test_support;
mod transport;

pub use config::{PeerSyncConfig, PeerSyncResult};
pub use percentile::percentile;
pub use ranges::{select_individual, select_ranges};
pub use replay::replay;
pub use sync::PeerSync;
pub use transport::{FingerprintDigest, PeerTransport, TransportError, TransportResult, UpdateSelector, UpdatesResponse, VersionsResponse, WireUpdate};
