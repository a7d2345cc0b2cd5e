// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

//! Pure selection logic for what to ask a peer for (spec §4.D "Range mode
//! selection" and "Individual mode"). Kept free of I/O and locking so the
//! merge-walk at the heart of range mode is unit-testable against the
//! spec's own worked example (scenario 6).

use std::collections::HashSet;

/// Walks `our_asc` and `peer_asc` (both ascending by `|version|`) from the
/// oldest end and returns the `lo...hi` inclusive ranges of peer versions we
/// are missing.
///
/// `complete_list` is `true` when `peer_asc` is known to hold every version
/// the peer has (not just its most recent `N`); otherwise the walk stops as
/// soon as the peer version drops below `our_low_threshold`, since anything
/// older than that was never going to be requested anyway.
pub fn select_ranges(our_asc: &[u64], peer_asc: &[u64], our_low_threshold: u64, complete_list: bool) -> Vec<(u64, u64)> {
	let mut ranges = Vec::new();
	let mut i = 0usize;
	let mut j = 0usize;

	while j < peer_asc.len() {
		let peer_v = peer_asc[j];
		if !complete_list && peer_v < our_low_threshold {
			// Both lists are ascending, so a sub-threshold entry can only
			// appear in a leading run; skip it rather than abandoning the
			// walk; everything after it is `>= our_low_threshold`.
			j += 1;
			continue;
		}

		match our_asc.get(i) {
			Some(&ov) if ov == peer_v => {
				i += 1;
				j += 1;
			}
			Some(&ov) if ov < peer_v => {
				i += 1;
			}
			_ => {
				let range_start = peer_v;
				let mut range_end = peer_v;
				j += 1;
				while j < peer_asc.len() {
					let next_peer = peer_asc[j];
					if let Some(&ov) = our_asc.get(i) {
						if next_peer >= ov {
							break;
						}
					}
					range_end = next_peer;
					j += 1;
				}
				ranges.push((range_start, range_end));
			}
		}
	}

	ranges
}

/// Individual mode (spec §4.D "Individual mode"): peer versions above
/// `our_low_threshold` that we do not already have and have not already
/// requested this round.
pub fn select_individual(our_set: &HashSet<u64>, peer_desc: &[u64], our_low_threshold: u64, already_requested: &HashSet<u64>) -> Vec<u64> {
	peer_desc
		.iter()
		.copied()
		.filter(|v| *v > our_low_threshold && !our_set.contains(v) && !already_requested.contains(v))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Spec §8 scenario 6: our versions = [100..120], peer versions =
	/// [110..130] → exactly one range, 121...130.
	#[test]
	fn scenario_6_range_mode() {
		let our_asc: Vec<u64> = (100..=120).collect();
		let peer_asc: Vec<u64> = (110..=130).collect();
		let ranges = select_ranges(&our_asc, &peer_asc, 0, true);
		assert_eq!(ranges, vec![(121, 130)]);
	}

	#[test]
	fn identical_windows_produce_no_ranges() {
		let our_asc: Vec<u64> = (100..=120).collect();
		let peer_asc: Vec<u64> = (100..=120).collect();
		let ranges = select_ranges(&our_asc, &peer_asc, 0, true);
		assert!(ranges.is_empty());
	}

	#[test]
	fn incomplete_list_stops_below_low_threshold() {
		let our_asc: Vec<u64> = vec![150];
		let peer_asc: Vec<u64> = vec![90, 95, 150, 160];
		// our_low_threshold = 100: peer entries 90 and 95 would be below
		// the threshold and are skipped because peer_asc is not known
		// to be complete.
		let ranges = select_ranges(&our_asc, &peer_asc, 100, false);
		assert_eq!(ranges, vec![(160, 160)]);
	}

	#[test]
	fn individual_mode_filters_known_and_requested() {
		let our_set: HashSet<u64> = [100, 101].into_iter().collect();
		let already_requested: HashSet<u64> = [105].into_iter().collect();
		let peer_desc = vec![120, 110, 105, 101, 100, 90];
		let missing = select_individual(&our_set, &peer_desc, 95, &already_requested);
		assert_eq!(missing, vec![120, 110]);
	}
}
