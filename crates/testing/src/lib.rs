// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

#![cfg_attr(not(debug_assertions), deny(warnings))]

//! Shared in-memory collaborator fakes: an `IndexWriter`, an `UpdateLog`,
//! a `Fingerprinter`, and a `PeerTransport`, so the Update Handler and
//! Peer Sync can be exercised end to end without a real segment writer,
//! write-ahead log, or network.

mod loopback;
mod memory;

pub use loopback::LoopbackPeer;
pub use memory::{MemoryIndexWriter, MemoryUpdateLog, fingerprint_of, memory_fingerprinter};
