// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

//! Applies replayed update records through the local Update Handler (spec
//! §4.D "Replay").

use shardcore_core::{AddCmd, DeleteCmd, flags::update_flags};
use shardcore_engine::UpdateHandler;
use shardcore_type::{RawVersion, RequestedVersion, Result};

use crate::transport::WireUpdate;

const PEER_SYNC_FLAGS: u32 = update_flags::PEER_SYNC | update_flags::IGNORE_AUTOCOMMIT;

/// Sorts `records` by `|version|` ascending and applies them oldest-first,
/// dropping consecutive duplicates of the same non-zero version (spec §4.D:
/// "Deduplicate consecutive records with identical non-zero version").
pub fn replay(handler: &UpdateHandler, mut records: Vec<WireUpdate>) -> Result<()> {
	records.sort_by_key(|r| r.version().unsigned_abs());

	let mut last_version: Option<i64> = None;
	for record in records {
		let version = record.version();
		if version != 0 && last_version == Some(version) {
			continue;
		}
		last_version = Some(version);
		apply_one(handler, record)?;
	}
	Ok(())
}

fn apply_one(handler: &UpdateHandler, record: WireUpdate) -> Result<()> {
	match record {
		WireUpdate::Add { id, version, doc } => {
			let mut cmd = AddCmd::new(id, doc, RequestedVersion::None);
			cmd.version = RawVersion::new(version);
			cmd.is_leader_logic = false;
			cmd.flags = PEER_SYNC_FLAGS;
			handler.add(cmd)
		}
		WireUpdate::UpdateInPlace { id, version, doc_values } => {
			let mut cmd = AddCmd::new(id, doc_values, RequestedVersion::None);
			cmd.version = RawVersion::new(version);
			cmd.is_leader_logic = false;
			cmd.is_in_place_update = true;
			cmd.flags = PEER_SYNC_FLAGS;
			handler.add(cmd)
		}
		WireUpdate::Delete { id, version } => {
			let mut cmd = DeleteCmd::by_id(id, RequestedVersion::None);
			cmd.version = RawVersion::new(version);
			cmd.is_leader_logic = false;
			cmd.flags = PEER_SYNC_FLAGS;
			handler.delete(cmd)
		}
		WireUpdate::DeleteByQuery { query, version } => {
			let mut cmd = DeleteCmd::by_query(query, RawVersion::new(version));
			cmd.is_leader_logic = false;
			cmd.flags = PEER_SYNC_FLAGS;
			handler.delete_by_query(cmd)
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use shardcore_core::{Document, FieldValue};
	use shardcore_engine::UpdateHandlerConfig;
	use shardcore_metric::Metrics;
	use shardcore_semantics::Mode;
	use shardcore_type::DocId;

	use super::*;
	use crate::test_support::{MemoryIndexWriter, MemoryUpdateLog};

	fn handler() -> Arc<UpdateHandler> {
		let config = UpdateHandlerConfig { semantics_mode: Mode::Classic, ..Default::default() };
		UpdateHandler::new(config, Arc::new(MemoryIndexWriter::default()), Arc::new(MemoryUpdateLog::default()), Arc::new(Metrics::new()))
	}

	#[test]
	fn replays_oldest_first_and_drops_duplicates() {
		let handler = handler();
		let doc = |id: &str| Document::new().with_field("id", FieldValue::Text(id.to_string()));

		let records = vec![
			WireUpdate::Add { id: DocId::from("B"), version: 20, doc: doc("B") },
			WireUpdate::Add { id: DocId::from("A"), version: 10, doc: doc("A") },
			WireUpdate::Add { id: DocId::from("A"), version: 10, doc: doc("A") },
		];

		replay(&handler, records).unwrap();
		assert_eq!(handler.metrics().counters.adds.get(), 2);
	}
}
