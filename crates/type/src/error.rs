// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

use std::fmt::{Display, Formatter};

use crate::id::DocId;

/// The error taxonomy shared by every crate in the update core (spec §7).
///
/// This is a flat enum rather than per-crate error types because the
/// taxonomy is the contract between the Update Handler, Peer Sync, and
/// whatever transport surfaces them to a client (HTTP status codes, batch
/// response slots, ...). Kinds map to HTTP dispositions only at that outer
/// boundary, which is out of scope here.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
	/// Schema/config prerequisite unmet: no unique key, no version field, no update log.
	WrongUsage { reason: String },
	/// Insert-only requested and the key already exists.
	DocAlreadyExists { id: DocId },
	/// Update requested and the key is absent.
	DocDoesNotExist { id: DocId },
	/// The document's current version differs from the requested one.
	VersionConflict { id: DocId, current: i64 },
	/// Analysis/validation failure, e.g. an oversized indexed term.
	BadRequest { reason: String },
	/// A multi-document batch in which at least one element failed; the
	/// per-element outcomes are carried alongside, indexed by position.
	PartialErrors { errors: Vec<(usize, Error)> },
	/// Writer, log, or transport I/O failure.
	IoFailure { reason: String },
	/// Out-of-memory or other unrecoverable condition encountered during
	/// close. Never swallowed; always propagated.
	Fatal { reason: String },
}

impl Error {
	pub fn wrong_usage(reason: impl Into<String>) -> Self {
		Error::WrongUsage { reason: reason.into() }
	}

	pub fn bad_request(reason: impl Into<String>) -> Self {
		Error::BadRequest { reason: reason.into() }
	}

	pub fn io_failure(reason: impl Into<String>) -> Self {
		Error::IoFailure { reason: reason.into() }
	}

	/// `true` for kinds that should increment the error counters and be
	/// logged at `error` level (spec §7); request-shaped rejections like
	/// `VersionConflict` are expected control flow, not failures.
	pub fn is_io_or_fatal(&self) -> bool {
		matches!(self, Error::IoFailure { .. } | Error::Fatal { .. })
	}
}

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::WrongUsage { reason } => write!(f, "wrong usage: {reason}"),
			Error::DocAlreadyExists { id } => write!(f, "document already exists: {id}"),
			Error::DocDoesNotExist { id } => write!(f, "document does not exist: {id}"),
			Error::VersionConflict { id, current } => {
				write!(f, "version conflict for {id}: current version is {current}")
			}
			Error::BadRequest { reason } => write!(f, "bad request: {reason}"),
			Error::PartialErrors { errors } => {
				write!(f, "{} of a batch failed", errors.len())
			}
			Error::IoFailure { reason } => write!(f, "I/O failure: {reason}"),
			Error::Fatal { reason } => write!(f, "fatal: {reason}"),
		}
	}
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
