//! Correlation failures.

use std::time::Duration;

use crate::TaskId;

/// A task id was registered while an entry with the same id was pending.
///
/// Ids come from a random generator, so this indicates a generator bug and is
/// not recoverable by retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("task id {0} is already registered")]
pub struct DuplicateIdError(pub TaskId);

/// Why a staged wait ended without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
	/// Every stage of the escalation policy elapsed; the entry was evicted.
	#[error("task {id} timed out after {waited:?}")]
	TimedOut {
		/// The evicted task.
		id: TaskId,
		/// Total time spent waiting across all stages.
		waited: Duration,
	},
	/// The pending slot was dropped without ever being resolved.
	#[error("task {id} was abandoned before completion")]
	Abandoned {
		/// The abandoned task.
		id: TaskId,
	},
}
