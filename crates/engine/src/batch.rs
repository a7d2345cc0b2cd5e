// Copyright (c) shardcore contributors 2026
// This file is licensed under the Apache-2.0 license

use shardcore_type::Error;

/// The outcome of an `add_batch` call: one slot per input command, `None`
/// for the ones that succeeded.
#[derive(Debug, Default)]
pub struct BatchResult {
	pub outcomes: Vec<Option<Error>>,
}

impl BatchResult {
	pub fn error_count(&self) -> usize {
		self.outcomes.iter().filter(|o| o.is_some()).count()
	}

	pub fn all_succeeded(&self) -> bool {
		self.error_count() == 0
	}

	/// Collapses the per-element outcomes into a single `Result`, matching
	/// the shape the ingest path returns for a non-batched add.
	pub fn into_result(self) -> Result<(), Error> {
		if self.all_succeeded() {
			return Ok(());
		}
		let errors = self.outcomes.into_iter().enumerate().filter_map(|(i, e)| e.map(|e| (i, e))).collect();
		Err(Error::PartialErrors { errors })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn all_succeeded_batch_has_no_errors() {
		let result = BatchResult { outcomes: vec![None, None] };
		assert!(result.all_succeeded());
		assert!(result.into_result().is_ok());
	}

	#[test]
	fn one_failure_out_of_two_is_reported_by_position() {
		let result = BatchResult { outcomes: vec![None, Some(Error::DocAlreadyExists { id: "A".into() })] };
		assert_eq!(result.error_count(), 1);
		match result.into_result().unwrap_err() {
			Error::PartialErrors { errors } => {
				assert_eq!(errors.len(), 1);
				assert_eq!(errors[0].0, 1);
			}
			other => panic!("expected PartialErrors, got {other:?}"),
		}
	}
}
