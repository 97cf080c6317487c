//! Opaque task identifiers.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Opaque identifier linking a request to its out-of-band completion.
///
/// Backed by a random (v4) UUID so ids never repeat within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(Uuid);

impl TaskId {
	/// Generates a fresh random id.
	#[allow(clippy::new_without_default, reason = "a default id would not be unique")]
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl fmt::Display for TaskId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.hyphenated().fmt(f)
	}
}

/// A callback carried a task id that is not a valid UUID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid task id {raw:?}")]
pub struct ParseTaskIdError {
	/// The rejected input.
	pub raw: String,
}

impl FromStr for TaskId {
	type Err = ParseTaskIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Uuid::parse_str(s.trim()).map(Self).map_err(|_| ParseTaskIdError { raw: s.to_string() })
	}
}
