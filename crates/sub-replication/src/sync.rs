// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

//! Peer Sync (spec §4.D): detects divergence between this shard and a set
//! of replica peers and replays whatever recent updates are missing.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use shardcore_core::{Fingerprinter, UpdateLog};
use shardcore_engine::UpdateHandler;
use shardcore_metric::Metrics;
use tokio::task::JoinSet;
use tracing::{instrument, warn};

use crate::config::{PeerSyncConfig, PeerSyncResult};
use crate::percentile::percentile;
use crate::ranges::{select_individual, select_ranges};
use crate::replay::replay;
use crate::transport::{PeerTransport, UpdateSelector};

/// Runs Peer Sync for one shard against a fixed set of peers. Stateless
/// across calls beyond its configuration and the collaborators it was
/// built with; callers re-run it whenever recovery is triggered (spec §9
/// open question 2: the fingerprint shortcut is safe to re-run).
pub struct PeerSync {
	config: PeerSyncConfig,
	log: Arc<dyn UpdateLog>,
	fingerprinter: Arc<dyn Fingerprinter>,
	handler: Arc<UpdateHandler>,
	metrics: Arc<Metrics>,
}

impl PeerSync {
	pub fn new(
		config: PeerSyncConfig,
		log: Arc<dyn UpdateLog>,
		fingerprinter: Arc<dyn Fingerprinter>,
		handler: Arc<UpdateHandler>,
		metrics: Arc<Metrics>,
	) -> Self {
		Self { config, log, fingerprinter, handler, metrics }
	}

	/// Runs one full sync round. `starting_versions` is the optional
	/// "state at startup" snapshot (spec §4.D step 5); pass `None` when
	/// the caller has no such snapshot.
	#[instrument(name = "peer_sync::sync", level = "info", skip(self, peers, starting_versions), fields(peers = peers.len()))]
	pub async fn sync(&self, peers: &[Arc<dyn PeerTransport>], starting_versions: Option<Vec<i64>>) -> PeerSyncResult {
		let start = Instant::now();
		let result = self.sync_inner(peers, starting_versions).await;
		self.metrics.peersync_time.record(start.elapsed());
		if !result.success {
			self.metrics.record_error(true);
		}
		result
	}

	async fn sync_inner(&self, peers: &[Arc<dyn PeerTransport>], starting_versions: Option<Vec<i64>>) -> PeerSyncResult {
		if peers.is_empty() {
			self.metrics.counters.peersync_skipped.increment();
			return PeerSyncResult::success();
		}

		if self.config.do_fingerprint && self.already_in_sync_by_fingerprint(peers).await {
			return PeerSyncResult::success();
		}

		let mut versions_fetch: JoinSet<(usize, Result<crate::transport::VersionsResponse, crate::transport::TransportError>)> = JoinSet::new();
		for (idx, peer) in peers.iter().cloned().enumerate() {
			let n = self.config.n_updates;
			let want_fp = self.config.do_fingerprint;
			versions_fetch.spawn(async move { (idx, peer.get_versions(n, want_fp).await) });
		}

		let mut our_records = self.log.recent_updates(self.config.n_updates);
		our_records.sort_by_key(|r| std::cmp::Reverse(r.version().magnitude()));
		let our_versions_desc: Vec<i64> = our_records.iter().map(|r| r.version().0).collect();
		let our_mag_desc: Vec<u64> = our_versions_desc.iter().map(|v| v.unsigned_abs()).collect();

		if our_versions_desc.is_empty() {
			let mut other_has_versions = false;
			while let Some(joined) = versions_fetch.join_next().await {
				if let Ok((_, Ok(response))) = joined
					&& !response.versions.is_empty()
				{
					other_has_versions = true;
				}
			}
			return PeerSyncResult::failure_with(other_has_versions);
		}

		let our_low_threshold = percentile(&our_mag_desc, 0.8).unwrap_or(0);
		let our_high_threshold = percentile(&our_mag_desc, 0.2).unwrap_or(0);

		let mut known: HashSet<u64> = our_mag_desc.iter().copied().collect();
		if let Some(mut starting) = starting_versions {
			starting.sort_by_key(|v| std::cmp::Reverse(v.unsigned_abs()));
			let our_oldest = our_versions_desc.last().copied();
			let peers_newest_starting = starting.first().copied();
			if let (Some(oldest), Some(newest_start)) = (our_oldest, peers_newest_starting)
				&& oldest.unsigned_abs() >= newest_start.unsigned_abs()
			{
				// We have accumulated at least as many updates since
				// startup as the peer's oldest starting version: too
				// many updates have happened since start to safely
				// reconcile against that snapshot.
				return PeerSyncResult::failure();
			}
			if let Some(oldest) = our_oldest {
				for v in starting {
					if v.unsigned_abs() < oldest.unsigned_abs() {
						known.insert(v.unsigned_abs());
					}
				}
			}
		}

		let mut requested_this_round: HashSet<u64> = HashSet::new();
		let mut deferred_fingerprint: Vec<(Arc<dyn PeerTransport>, u64)> = Vec::new();

		while let Some(joined) = versions_fetch.join_next().await {
			let Ok((idx, outcome)) = joined else { continue };
			let peer = peers[idx].clone();

			let response = match outcome {
				Ok(response) => response,
				Err(err) => {
					if self.config.cant_reach_is_success && err.is_unreachable_peer() {
						continue;
					}
					return PeerSyncResult::failure();
				}
			};

			if response.versions.is_empty() {
				return if self.config.get_no_versions_is_success { PeerSyncResult::success() } else { PeerSyncResult::failure() };
			}

			let mut peer_mag_desc: Vec<u64> = response.versions.iter().map(|v| v.unsigned_abs()).collect();
			peer_mag_desc.sort_by(|a, b| b.cmp(a));

			let other_high = percentile(&peer_mag_desc, 0.2).unwrap_or(0);
			let other_low = percentile(&peer_mag_desc, 0.8).unwrap_or(0);

			if our_high_threshold < other_low {
				// Our whole window is older than the peer's: we cannot
				// catch up from this peer's recent-updates view alone.
				return PeerSyncResult::failure();
			}
			if our_low_threshold > other_high {
				// We are strictly newer than this peer; it has nothing
				// we need.
				continue;
			}

			let can_handle_ranges =
				self.config.use_range_versions_for_peer_sync && peer.check_can_handle_version_ranges().await.unwrap_or(false);

			let selector = if can_handle_ranges {
				let mut our_asc = our_mag_desc.clone();
				our_asc.sort_unstable();
				let mut peer_asc = peer_mag_desc.clone();
				peer_asc.sort_unstable();
				UpdateSelector::Ranges(select_ranges(&our_asc, &peer_asc, our_low_threshold, false))
			} else {
				UpdateSelector::Versions(select_individual(&known, &peer_mag_desc, our_low_threshold, &requested_this_round))
			};

			if selector.is_empty() {
				if self.config.do_fingerprint {
					deferred_fingerprint.push((peer.clone(), peer_mag_desc[0]));
				}
				continue;
			}
			if selector.requested_count() > self.config.max_updates {
				return PeerSyncResult::failure();
			}

			match &selector {
				UpdateSelector::Versions(vs) => requested_this_round.extend(vs.iter().copied()),
				UpdateSelector::Ranges(ranges) => {
					requested_this_round.extend(ranges.iter().flat_map(|(lo, hi)| *lo..=*hi))
				}
			}

			let updates = match peer.get_updates(selector, self.config.do_fingerprint).await {
				Ok(updates) => updates,
				Err(err) => {
					if self.config.cant_reach_is_success && err.is_unreachable_peer() {
						continue;
					}
					return PeerSyncResult::failure();
				}
			};

			if let Err(err) = replay(&self.handler, updates.records) {
				warn!(error = %err, peer = peer.peer_name(), "peer sync replay failed");
				return PeerSyncResult::failure();
			}

			match updates.fingerprint {
				Some(peer_fp) => {
					let ours = self.fingerprinter.compute(peer_fp.max_version);
					if ours != peer_fp {
						return PeerSyncResult::failure();
					}
				}
				None if self.config.do_fingerprint => deferred_fingerprint.push((peer.clone(), peer_mag_desc[0])),
				None => {}
			}
		}

		for (peer, max_version) in deferred_fingerprint {
			let ours = self.fingerprinter.compute(max_version);
			match peer.get_fingerprint(max_version).await {
				Ok(peer_fp) if peer_fp == ours => {}
				_ => return PeerSyncResult::failure(),
			}
		}

		PeerSyncResult::success()
	}

	/// spec §4.D step 1: any peer whose fingerprint over its entire
	/// history matches ours means we are already in sync, regardless of
	/// version bookkeeping.
	async fn already_in_sync_by_fingerprint(&self, peers: &[Arc<dyn PeerTransport>]) -> bool {
		let ours = self.fingerprinter.compute(u64::MAX);
		let mut set = JoinSet::new();
		for peer in peers.iter().cloned() {
			set.spawn(async move { peer.get_fingerprint(u64::MAX).await });
		}
		while let Some(joined) = set.join_next().await {
			if let Ok(Ok(fp)) = joined
				&& fp == ours
			{
				return true;
			}
		}
		false
	}
}
