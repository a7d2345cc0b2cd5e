// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use shardcore_commit::{CommitSink, CommitTracker, CommitTrackerConfig};
use shardcore_core::{
	AddCmd, CommitCmd, DeleteCmd, IndexWriter, LogRecord, MergeIndexesCmd, RollbackCmd, SplitCmd, UpdateLog,
	flags::{self, update_flags},
};
use shardcore_metric::Metrics;
use shardcore_semantics::Mode;
use shardcore_type::{DocId, Error, RawVersion, RequestedVersion, Result};
use tracing::{info, instrument, warn};

use crate::config::UpdateHandlerConfig;

/// Wraps a delete-by-query string so that it never removes a write newer
/// than `version` (spec §4.C "delete-by-query"). Query parsing is out of
/// scope; this produces the textual form a real query layer would accept.
fn wrap_dbq_version_exclusion(query: &str, version: RawVersion) -> String {
	format!("({query}) AND NOT (_version_:[{} TO *])", version.magnitude())
}

struct TrackerSink {
	handler: Weak<UpdateHandler>,
}

impl CommitSink for TrackerSink {
	fn fire_commit(&self, is_soft: bool, open_searcher: bool) -> Result<()> {
		let Some(handler) = self.handler.upgrade() else {
			return Ok(());
		};
		let mut cmd = if is_soft { CommitCmd::soft() } else { CommitCmd::hard() };
		cmd.open_searcher = open_searcher;
		if is_soft {
			handler.metrics.gauges.soft_auto_commits.increment();
		} else {
			handler.metrics.gauges.auto_commits.increment();
		}
		handler.commit(cmd)
	}
}

/// The Update Handler (spec §4.C): the single point of serialization
/// between ingest commands and the index writer / update log for one
/// shard. Holds the commit lock and update lock described in spec §5.
pub struct UpdateHandler {
	config: UpdateHandlerConfig,
	writer: Arc<dyn IndexWriter>,
	log: Arc<dyn UpdateLog>,
	metrics: Arc<Metrics>,
	hard_tracker: Arc<CommitTracker>,
	soft_tracker: Arc<CommitTracker>,
	/// *Commit lock*: at most one hard commit proceeds at a time (spec §5).
	commit_lock: Mutex<()>,
	/// *Update lock*: serializes `deleteByQuery`, the log's pre/post
	/// commit phases, reordered-DBQ replay and new-searcher opening
	/// against one another. Always acquired inside the commit lock when
	/// both are held (spec §5).
	update_lock: Mutex<()>,
}

impl UpdateHandler {
	pub fn new(config: UpdateHandlerConfig, writer: Arc<dyn IndexWriter>, log: Arc<dyn UpdateLog>, metrics: Arc<Metrics>) -> Arc<Self> {
		Arc::new_cyclic(|weak: &Weak<UpdateHandler>| {
			let hard_tracker = CommitTracker::new(
				CommitTrackerConfig {
					docs_upper_bound: config.auto_commit_max_docs,
					time_upper_bound: config.auto_commit_max_time,
					open_searcher_on_commit: config.auto_commit_open_searcher,
					is_soft: false,
				},
				Arc::new(TrackerSink { handler: weak.clone() }),
			);
			let soft_tracker = CommitTracker::new(
				CommitTrackerConfig {
					docs_upper_bound: config.auto_soft_commit_max_docs,
					time_upper_bound: config.auto_soft_commit_max_time,
					open_searcher_on_commit: true,
					is_soft: true,
				},
				Arc::new(TrackerSink { handler: weak.clone() }),
			);
			Self { config, writer, log, metrics, hard_tracker, soft_tracker, commit_lock: Mutex::new(()), update_lock: Mutex::new(()) }
		})
	}

	pub fn metrics(&self) -> &Arc<Metrics> {
		&self.metrics
	}

	pub fn semantics_mode(&self) -> Mode {
		self.config.semantics_mode
	}

	fn notify_trackers(&self, cmd_flags: u32, commit_within: Option<std::time::Duration>) {
		if flags::has_flag(cmd_flags, update_flags::IGNORE_AUTOCOMMIT) {
			return;
		}
		let tracker = if self.config.commit_within_soft_commit { &self.soft_tracker } else { &self.hard_tracker };
		tracker.added_document(commit_within);
		self.metrics.gauges.docs_pending.set((self.hard_tracker.docs_pending() + self.soft_tracker.docs_pending()) as i64);
	}

	/// Refreshes the `txnLogsTotalSize`/`txnLogsTotalNumber` gauges (spec
	/// §6) from the update log's current on-disk footprint.
	fn refresh_txn_log_gauges(&self) {
		let (size, count) = self.log.disk_usage();
		self.metrics.gauges.txn_logs_total_size.set(size as i64);
		self.metrics.gauges.txn_logs_total_number.set(count as i64);
	}

	/// Prerequisite validation shared by add and delete (spec §4.B/§4.C
	/// "Validate prerequisites").
	fn validate_prerequisites(&self, rules: &shardcore_semantics::RuleSet, has_unique_key_in_doc: bool) -> Result<()> {
		if rules.require_unique_key_field_in_schema.enforced && self.config.unique_key_field.is_empty() {
			return Err(Error::wrong_usage(rules.require_unique_key_field_in_schema.reason));
		}
		if rules.require_unique_key_in_doc.enforced && !has_unique_key_in_doc {
			return Err(Error::wrong_usage(rules.require_unique_key_in_doc.reason));
		}
		Ok(())
	}

	/// The add algorithm (spec §4.C "Add algorithm"), single leader, one
	/// key.
	#[instrument(name = "update_handler::add", level = "debug", skip(self, cmd), fields(id = %cmd.id))]
	pub fn add(&self, cmd: AddCmd) -> Result<()> {
		let result = self.add_inner(cmd);
		if let Err(err) = &result {
			if err.is_io_or_fatal() {
				self.metrics.record_error(false);
			}
		}
		result
	}

	/// A batch of adds applied independently (spec §8 scenario 4, "partial
	/// success"): every element is attempted even after an earlier one
	/// fails, and the response carries one outcome slot per input.
	#[instrument(name = "update_handler::add_batch", level = "debug", skip(self, cmds), fields(len = cmds.len()))]
	pub fn add_batch(&self, cmds: Vec<AddCmd>) -> BatchResult {
		let outcomes = cmds.into_iter().map(|cmd| self.add(cmd).err()).collect();
		BatchResult { outcomes }
	}

	fn add_inner(&self, cmd: AddCmd) -> Result<()> {
		let rules = self.config.semantics_mode.evaluate(cmd.requested_version);
		let has_key = cmd.doc.get(&self.config.unique_key_field).is_some() || !cmd.id.0.is_empty();
		self.validate_prerequisites(&rules, has_key)?;

		if rules.need_to_lookup_existing_version.enforced && cmd.is_leader_logic {
			let current = self.log.lookup_version(&cmd.id).map(|r| r.version).unwrap_or(-1);
			if current < 0 {
				if rules.require_existing_document.enforced {
					return Err(Error::DocDoesNotExist { id: cmd.id.clone() });
				}
			} else {
				if rules.require_no_existing_document.enforced {
					return Err(Error::DocAlreadyExists { id: cmd.id.clone() });
				}
				if rules.require_version_equality.enforced {
					let requested = cmd.requested_version.as_raw();
					if current != requested {
						return Err(Error::VersionConflict { id: cmd.id.clone(), current });
					}
				}
			}
		}

		if rules.need_to_delete_old_version.enforced {
			self.add_with_delete_old_version(&cmd)?;
		} else {
			if cmd.is_block {
				self.writer.add_documents(&[(cmd.indexed_id.clone(), cmd.doc.clone())])?;
			} else {
				self.writer.add_document(&cmd.indexed_id, &cmd.doc)?;
			}
			self.log.append(LogRecord::Add { id: cmd.id.clone(), version: cmd.version })?;
		}

		self.metrics.counters.adds.increment();
		self.notify_trackers(cmd.flags, cmd.commit_within);
		Ok(())
	}

	fn add_with_delete_old_version(&self, cmd: &AddCmd) -> Result<()> {
		let deletes_after = self.log.dbq_newer_than(cmd.version.magnitude());

		if !deletes_after.is_empty() {
			let _update_guard = self.update_lock.lock();
			if cmd.is_in_place_update {
				self.log.open_realtime_searcher()?;
			}
			self.writer.update_document(&cmd.indexed_id, &cmd.doc)?;
			for record in &deletes_after {
				if let LogRecord::DeleteByQuery { query, .. } = record {
					self.writer.delete_by_query(query)?;
				}
			}
			self.log.append(LogRecord::Add { id: cmd.id.clone(), version: cmd.version })?;
			return Ok(());
		}

		if cmd.is_in_place_update && cmd.doc.all_non_key_fields_are_doc_values_only(&self.config.unique_key_field) {
			self.writer.update_doc_values(&cmd.indexed_id, &cmd.doc.doc_values_subset())?;
		} else {
			self.writer.update_document(&cmd.indexed_id, &cmd.doc)?;
		}
		if let Some(update_term) = &cmd.update_term {
			if update_term != &cmd.indexed_id {
				self.writer.delete_document(update_term)?;
			}
		}
		self.log.append(LogRecord::Add { id: cmd.id.clone(), version: cmd.version })
	}

	/// Delete-by-id (spec §4.C "Delete-by-id").
	#[instrument(name = "update_handler::delete", level = "debug", skip(self, cmd), fields(id = ?cmd.id))]
	pub fn delete(&self, cmd: DeleteCmd) -> Result<()> {
		let result = self.delete_inner(cmd);
		if let Err(err) = &result {
			if err.is_io_or_fatal() {
				self.metrics.record_error(false);
			}
		}
		result
	}

	fn delete_inner(&self, cmd: DeleteCmd) -> Result<()> {
		let id = cmd.id.clone().ok_or_else(|| Error::wrong_usage("delete command is missing an id"))?;
		let indexed_id = cmd.indexed_id.clone().ok_or_else(|| Error::wrong_usage("delete command is missing an indexed id"))?;

		let rules = self.config.semantics_mode.evaluate(cmd.requested_version);
		if rules.need_to_lookup_existing_version.enforced && cmd.is_leader_logic {
			let current = self.log.lookup_version(&id).map(|r| r.version).unwrap_or(-1);
			if current < 0 && rules.require_existing_document.enforced {
				return Err(Error::DocDoesNotExist { id: id.clone() });
			}
			if current >= 0 && rules.require_version_equality.enforced {
				let requested = cmd.requested_version.as_raw();
				if current != requested {
					return Err(Error::VersionConflict { id: id.clone(), current });
				}
			}
		}

		self.writer.delete_document(&indexed_id)?;
		self.log.append(LogRecord::Delete { id: id.clone(), version: cmd.version })?;
		self.metrics.counters.deletes_by_id.increment();
		self.notify_trackers(cmd.flags, cmd.commit_within);
		Ok(())
	}

	/// Delete-by-query (spec §4.C "Delete-by-query").
	#[instrument(name = "update_handler::delete_by_query", level = "debug", skip(self, cmd))]
	pub fn delete_by_query(&self, cmd: DeleteCmd) -> Result<()> {
		let result = self.delete_by_query_inner(cmd);
		if let Err(err) = &result {
			if err.is_io_or_fatal() {
				self.metrics.record_error(false);
			}
		}
		result
	}

	fn delete_by_query_inner(&self, cmd: DeleteCmd) -> Result<()> {
		let query = cmd.query.clone().ok_or_else(|| Error::wrong_usage("deleteByQuery command is missing a query"))?;
		let version = cmd.version;

		let _update_guard = self.update_lock.lock();
		self.log.open_realtime_searcher()?;

		if version.is_match_all() {
			self.writer.delete_all()?;
			self.metrics.counters.deletes_by_query.increment();
			self.notify_trackers(cmd.flags, cmd.commit_within);
			return Ok(());
		}

		let wrapped = if version.0 != 0 { wrap_dbq_version_exclusion(&query, version) } else { query };
		self.writer.delete_by_query(&wrapped)?;
		self.log.append(LogRecord::DeleteByQuery { query: wrapped, version })?;
		self.metrics.counters.deletes_by_query.increment();
		self.notify_trackers(cmd.flags, cmd.commit_within);
		Ok(())
	}

	/// The commit algorithm (spec §4.C "Commit algorithm").
	#[instrument(name = "update_handler::commit", level = "info", skip(self, cmd))]
	pub fn commit(&self, cmd: CommitCmd) -> Result<()> {
		if cmd.prepare_commit {
			self.writer.set_commit_data(&[]);
			return self.writer.prepare_commit();
		}

		if cmd.open_searcher {
			self.soft_tracker.cancel_pending_commit();
		}
		if !cmd.soft_commit && cmd.open_searcher as u8 >= self.config.auto_commit_open_searcher as u8 {
			self.hard_tracker.cancel_pending_commit();
		}

		if cmd.optimize {
			self.writer.force_merge(cmd.max_optimize_segments.max(1))?;
			self.metrics.meters.optimizes.increment();
		}
		if cmd.expunge_deletes {
			self.writer.force_merge_deletes()?;
			self.metrics.meters.expunge_deletes.increment();
		}

		if cmd.soft_commit {
			self.soft_commit_locked(&cmd)?;
		} else {
			self.hard_commit_locked(&cmd)?;
		}

		Ok(())
	}

	fn hard_commit_locked(&self, cmd: &CommitCmd) -> Result<()> {
		let _commit_guard = self.commit_lock.lock();
		let _update_guard = self.update_lock.lock();
		self.log.pre_commit(cmd)?;
		if self.writer.has_pending_changes() {
			self.writer.set_commit_data(&[]);
			self.writer.commit(cmd)?;
		}
		self.hard_tracker.did_commit();
		if !cmd.open_searcher {
			self.log.open_realtime_searcher()?;
		}
		self.log.post_commit(cmd)?;
		self.refresh_txn_log_gauges();
		self.metrics.gauges.docs_pending.set((self.hard_tracker.docs_pending() + self.soft_tracker.docs_pending()) as i64);
		self.metrics.meters.commits.increment();
		Ok(())
	}

	fn soft_commit_locked(&self, cmd: &CommitCmd) -> Result<()> {
		let _update_guard = self.update_lock.lock();
		self.log.pre_soft_commit(cmd)?;
		self.log.open_realtime_searcher()?;
		self.log.post_soft_commit(cmd)?;
		self.soft_tracker.did_commit();
		self.refresh_txn_log_gauges();
		self.metrics.gauges.docs_pending.set((self.hard_tracker.docs_pending() + self.soft_tracker.docs_pending()) as i64);
		self.metrics.meters.soft_commits.increment();
		Ok(())
	}

	/// Rollback (spec §4.C "Rollback"). Forbidden in cluster-aware mode.
	#[instrument(name = "update_handler::rollback", level = "info", skip(self, _cmd))]
	pub fn rollback(&self, _cmd: RollbackCmd) -> Result<()> {
		if self.config.cluster_aware {
			return Err(Error::wrong_usage("rollback is forbidden while cluster-aware mode is enabled"));
		}
		let _commit_guard = self.commit_lock.lock();
		let _update_guard = self.update_lock.lock();
		self.writer.rollback()?;
		self.hard_tracker.did_rollback();
		self.soft_tracker.did_rollback();
		self.metrics.meters.rollbacks.increment();
		Ok(())
	}

	#[instrument(name = "update_handler::merge_indexes", level = "info", skip(self, cmd))]
	pub fn merge_indexes(&self, cmd: MergeIndexesCmd) -> Result<()> {
		let _commit_guard = self.commit_lock.lock();
		self.writer.merge_indexes(&cmd.segment_refs)?;
		self.metrics.meters.merge_indexes.increment();
		Ok(())
	}

	#[instrument(name = "update_handler::split", level = "info", skip(self, cmd))]
	pub fn split(&self, cmd: SplitCmd) -> Result<()> {
		let _commit_guard = self.commit_lock.lock();
		let targets: Vec<(String, (u64, u64))> = cmd.targets.iter().map(|t| (t.shard.clone(), t.hash_range)).collect();
		self.writer.split(&targets)?;
		self.metrics.meters.splits.increment();
		Ok(())
	}

	/// Writer close sequence (spec §4.C "Writer close sequence").
	#[instrument(name = "update_handler::close", level = "info", skip(self))]
	pub fn close(&self) -> Result<()> {
		let _commit_guard = self.commit_lock.lock();

		if self.log.has_uncommitted_changes() {
			let commit_result = (|| -> Result<()> {
				let cmd = CommitCmd { open_searcher: false, ..Default::default() };
				self.log.pre_commit(&cmd)?;
				self.writer.set_commit_data(&[]);
				self.writer.commit(&cmd)?;
				self.log.post_commit(&cmd)
			})();
			if let Err(err) = commit_result {
				warn!(error = %err, "commit-on-close failed, continuing to close remaining resources");
				if matches!(err, Error::Fatal { .. }) {
					return Err(err);
				}
			}
		}

		if let Err(err) = self.log.close() {
			warn!(error = %err, "update log failed to close");
			if matches!(err, Error::Fatal { .. }) {
				return Err(err);
			}
		}
		self.writer.close()?;
		info!("update handler closed");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use shardcore_core::{Document, FieldValue};

	use super::*;
	use crate::test_support::{MemoryIndexWriter, MemoryUpdateLog};

	fn handler(mode: Mode) -> Arc<UpdateHandler> {
		let config = UpdateHandlerConfig { semantics_mode: mode, ..Default::default() };
		UpdateHandler::new(config, Arc::new(MemoryIndexWriter::default()), Arc::new(MemoryUpdateLog::default()), Arc::new(Metrics::new()))
	}

	fn doc(id: &str) -> Document {
		Document::new().with_field("id", FieldValue::Text(id.to_string()))
	}

	#[test]
	fn classic_insert_only_fastpath_skips_lookup() {
		let handler = handler(Mode::Classic);
		let mut cmd = AddCmd::new(DocId::from("A"), doc("A"), RequestedVersion::InsertOnly);
        cmd.version = RawVersion::new(-1);
		assert!(handler.add(cmd).is_ok());
		assert_eq!(handler.metrics().counters.adds.get(), 1);
	}

	#[test]
	fn strict_insert_rejects_duplicate() {
		let handler = handler(Mode::StrictInsert);
		let mut first = AddCmd::new(DocId::from("A"), doc("A"), RequestedVersion::InsertOnly);
		first.version = RawVersion::new(1);
		handler.add(first).unwrap();

		let mut second = AddCmd::new(DocId::from("A"), doc("A"), RequestedVersion::InsertOnly);
		second.version = RawVersion::new(2);
		let err = handler.add(second).unwrap_err();
		assert!(matches!(err, Error::DocAlreadyExists { .. }));
	}

	#[test]
	fn strict_update_rejects_missing_document() {
		let handler = handler(Mode::StrictUpdate);
		let mut cmd = AddCmd::new(DocId::from("A"), doc("A"), RequestedVersion::None);
		cmd.version = RawVersion::new(1);
		let err = handler.add(cmd).unwrap_err();
		assert!(matches!(err, Error::DocDoesNotExist { .. }));
	}

	#[test]
	fn version_hybrid_detects_conflict() {
		let handler = handler(Mode::VersionHybrid);
		let mut first = AddCmd::new(DocId::from("A"), doc("A"), RequestedVersion::InsertOnly);
		first.version = RawVersion::new(5);
		handler.add(first).unwrap();

		let mut conflicting = AddCmd::new(DocId::from("A"), doc("A"), RequestedVersion::Exact(999));
		conflicting.version = RawVersion::new(6);
		let err = handler.add(conflicting).unwrap_err();
		match err {
			Error::VersionConflict { current, .. } => assert_eq!(current, 5),
			other => panic!("expected VersionConflict, got {other:?}"),
		}
	}

	#[test]
	fn match_all_dbq_does_not_append_a_log_entry() {
		let handler = handler(Mode::Classic);
		let mut cmd = AddCmd::new(DocId::from("A"), doc("A"), RequestedVersion::InsertOnly);
		cmd.version = RawVersion::new(-1);
		handler.add(cmd).unwrap();

		let dbq = DeleteCmd::by_query("*:*", RawVersion::MATCH_ALL);
		handler.delete_by_query(dbq).unwrap();
		assert_eq!(handler.metrics().counters.deletes_by_query.get(), 1);
	}

	#[test]
	fn batch_reports_one_error_alongside_the_successful_element() {
		let handler = handler(Mode::StrictInsert);
		let mut first = AddCmd::new(DocId::from("A"), doc("A"), RequestedVersion::InsertOnly);
		first.version = RawVersion::new(1);
		handler.add(first).unwrap();

		let mut dup = AddCmd::new(DocId::from("A"), doc("A"), RequestedVersion::InsertOnly);
		dup.version = RawVersion::new(2);
		let mut fresh = AddCmd::new(DocId::from("B"), doc("B"), RequestedVersion::InsertOnly);
		fresh.version = RawVersion::new(3);

		let result = handler.add_batch(vec![dup, fresh]);
		assert_eq!(result.error_count(), 1);
		assert!(matches!(result.outcomes[0], Some(Error::DocAlreadyExists { .. })));
		assert!(result.outcomes[1].is_none());
	}

	#[test]
	fn commit_within_override_schedules_a_commit_without_a_configured_time_bound() {
		// No auto_commit_max_docs/max_time configured; only the per-add
		// commit_within override should cause the hard tracker to fire
		// (spec §4.A `addedDocument(commitWithin)`).
		let handler = handler(Mode::Classic);
		let mut cmd = AddCmd::new(DocId::from("A"), doc("A"), RequestedVersion::InsertOnly);
		cmd.version = RawVersion::new(-1);
		cmd.commit_within = Some(std::time::Duration::from_millis(10));
		handler.add(cmd).unwrap();

		for _ in 0..200 {
			if handler.metrics().meters.commits.get() > 0 {
				break;
			}
			std::thread::sleep(std::time::Duration::from_millis(5));
		}
		assert_eq!(handler.metrics().meters.commits.get(), 1);
	}

	#[test]
	fn rollback_is_forbidden_when_cluster_aware() {
		let config = UpdateHandlerConfig { cluster_aware: true, ..Default::default() };
		let handler = UpdateHandler::new(config, Arc::new(MemoryIndexWriter::default()), Arc::new(MemoryUpdateLog::default()), Arc::new(Metrics::new()));
		let err = handler.rollback(RollbackCmd::default()).unwrap_err();
		assert!(matches!(err, Error::WrongUsage { .. }));
	}
}
