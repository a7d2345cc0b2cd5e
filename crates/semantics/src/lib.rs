// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

#![cfg_attr(not(debug_assertions), deny(warnings))]

//! Semantics Mode: a pure policy object (spec §4.B). Given a mode and a
//! command's requested version, it returns which invariants the Update
//! Handler must enforce — it never touches the writer, the log, or any
//! mutable state itself.

use shardcore_type::RequestedVersion;
use tracing::instrument;

/// One of the four named semantics modes (spec §4.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
	Classic,
	StrictInsert,
	StrictUpdate,
	VersionHybrid,
}

/// The outcome of evaluating one rule: whether it is enforced for this
/// command, and the reason to surface if a caller needs to raise a fault
/// because of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
	pub enforced: bool,
	pub reason: &'static str,
}

impl Rule {
	const fn on(reason: &'static str) -> Self {
		Rule { enforced: true, reason }
	}

	const fn off(reason: &'static str) -> Self {
		Rule { enforced: false, reason }
	}
}

/// The full set of rule outcomes for one command, per spec §4.B's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSet {
	pub require_unique_key_field_in_schema: Rule,
	pub require_unique_key_in_doc: Rule,
	pub require_version_field_in_schema: Rule,
	pub require_update_log: Rule,
	/// Only meaningful when the command is leader logic; the handler is
	/// responsible for gating this on `is_leader_logic` itself.
	pub need_to_lookup_existing_version: Rule,
	pub require_existing_document: Rule,
	pub require_no_existing_document: Rule,
	pub require_version_equality: Rule,
	pub need_to_delete_old_version: Rule,
}

impl Mode {
	/// Evaluate every rule for a command carrying `requested_version`.
	///
	/// Three rules (`requireExistingDocument`, `requireNoExistingDocument`,
	/// `requireVersionEquality`) are conditioned on `requested_version`
	/// only under `version-hybrid`; the other three modes fix them per
	/// the table regardless of what was requested.
	#[instrument(name = "semantics::evaluate", level = "trace", skip(self))]
	pub fn evaluate(&self, requested_version: RequestedVersion) -> RuleSet {
		match self {
			Mode::Classic => RuleSet {
				require_unique_key_field_in_schema: Rule::off("classic mode does not require a schema-declared unique key"),
				require_unique_key_in_doc: Rule::off("classic mode does not require a unique key in the document"),
				require_version_field_in_schema: Rule::off("classic mode does not require a version field"),
				require_update_log: Rule::off("classic mode does not require an update log"),
				need_to_lookup_existing_version: Rule::off("classic mode never looks up the existing version"),
				require_existing_document: Rule::off("classic mode never rejects on absence"),
				require_no_existing_document: Rule::off("classic mode never rejects on existence"),
				require_version_equality: Rule::off("classic mode does not assert version equality"),
				need_to_delete_old_version: Self::need_to_delete_old_version(*self, requested_version),
			},
			Mode::StrictInsert => RuleSet {
				require_unique_key_field_in_schema: Rule::on("strict-insert requires a schema-declared unique key"),
				require_unique_key_in_doc: Rule::on("strict-insert requires the document to carry the unique key"),
				require_version_field_in_schema: Rule::off("strict-insert does not require a version field"),
				require_update_log: Rule::off("strict-insert does not require an update log"),
				need_to_lookup_existing_version: Rule::on("strict-insert looks up the existing version on the leader"),
				require_existing_document: Rule::off("strict-insert never rejects on absence"),
				require_no_existing_document: Rule::on("strict-insert rejects when the key already exists"),
				require_version_equality: Rule::off("strict-insert does not assert version equality"),
				need_to_delete_old_version: Self::need_to_delete_old_version(*self, requested_version),
			},
			Mode::StrictUpdate => RuleSet {
				require_unique_key_field_in_schema: Rule::on("strict-update requires a schema-declared unique key"),
				require_unique_key_in_doc: Rule::on("strict-update requires the document to carry the unique key"),
				require_version_field_in_schema: Rule::off("strict-update does not require a version field"),
				require_update_log: Rule::off("strict-update does not require an update log"),
				need_to_lookup_existing_version: Rule::on("strict-update looks up the existing version on the leader"),
				require_existing_document: Rule::on("strict-update rejects when the key is absent"),
				require_no_existing_document: Rule::off("strict-update never rejects on existence"),
				require_version_equality: Rule::off("strict-update does not assert version equality"),
				need_to_delete_old_version: Self::need_to_delete_old_version(*self, requested_version),
			},
			Mode::VersionHybrid => {
				let require_existing_document = match requested_version {
					RequestedVersion::Exact(_) => Rule::on("requestedVersion > 0 requires the document to already exist"),
					_ => Rule::off("no version-equality assertion, existence is not required"),
				};
				let require_no_existing_document = match requested_version {
					RequestedVersion::InsertOnly => Rule::on("requestedVersion < 0 requires the key to be absent"),
					_ => Rule::off("not an insert-only assertion"),
				};
				let require_version_equality = match requested_version {
					RequestedVersion::Exact(_) => Rule::on("requestedVersion > 0 must match the current version exactly"),
					_ => Rule::off("no exact version asserted"),
				};
				RuleSet {
					require_unique_key_field_in_schema: Rule::on("version-hybrid requires a schema-declared unique key"),
					require_unique_key_in_doc: Rule::on("version-hybrid requires the document to carry the unique key"),
					require_version_field_in_schema: Rule::on("version-hybrid requires a schema-declared version field"),
					require_update_log: Rule::on("version-hybrid requires an update log"),
					need_to_lookup_existing_version: Rule::on("version-hybrid looks up the existing version on the leader"),
					require_existing_document,
					require_no_existing_document,
					require_version_equality,
					need_to_delete_old_version: Self::need_to_delete_old_version(*self, requested_version),
				}
			}
		}
	}

	/// The one rule whose "always" column in spec §4.B's table does not
	/// mean "independent of the command": the classic insert-only
	/// fastpath (spec §4.C step 5) only exists when the mode is
	/// `classic` and the caller has asserted `InsertOnly`, since that is
	/// the sole combination where no lookup has occurred and there is
	/// provably no old version to delete.
	fn need_to_delete_old_version(mode: Mode, requested_version: RequestedVersion) -> Rule {
		if mode == Mode::Classic && requested_version == RequestedVersion::InsertOnly {
			Rule::off("classic insert-only fastpath: no existing version was looked up, nothing to delete")
		} else {
			Rule::on("an existing version may be present and must be superseded")
		}
	}
}
