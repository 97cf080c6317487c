//! Error types surfaced by `convert`.

use std::time::Duration;

use vellum_correlation::{DuplicateIdError, TaskId};

use crate::EngineError;

/// A convenient type alias for `Result` with `E` = [`RenderError`].
pub type Result<T, E = RenderError> = std::result::Result<T, E>;

/// Dispatching a render request into the engine failed.
///
/// Carried back through the task's result slot, so it reaches the caller of
/// `convert` rather than being lost on the engine thread.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ForeignInvocationError {
	/// The engine has no function with this name loaded.
	#[error("engine function `{0}` is not defined")]
	UndefinedFunction(String),
	/// The engine raised while the call was being marshaled.
	#[error("engine call `{function}` failed: {message}")]
	Script {
		/// Function that was being invoked.
		function: String,
		/// Engine-provided failure description.
		message: String,
	},
	/// The invocation panicked on the engine thread.
	#[error("engine invocation panicked: {0}")]
	Panicked(String),
	/// The completion callback carried a payload that is not a render result.
	#[error("malformed render result: {0}")]
	MalformedResult(String),
}

impl ForeignInvocationError {
	pub(crate) fn from_engine(function: &str, err: EngineError) -> Self {
		match err {
			EngineError::UndefinedFunction(name) => Self::UndefinedFunction(name),
			EngineError::Script(message) => Self::Script {
				function: function.to_string(),
				message,
			},
		}
	}
}

/// Both escalation stages elapsed without a completion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("render `{function}` (task {task_id}) timed out after {waited:?}")]
pub struct RenderTimeoutError {
	/// The abandoned task; its late callback, if any, is discarded.
	pub task_id: TaskId,
	/// Engine function that never answered.
	pub function: String,
	/// Total time spent waiting.
	pub waited: Duration,
}

/// Possible `convert` failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
	/// Every escalation stage elapsed.
	#[error(transparent)]
	Timeout(#[from] RenderTimeoutError),
	/// The engine rejected or failed the invocation.
	#[error(transparent)]
	Invocation(#[from] ForeignInvocationError),
	/// The id generator produced an id that is already pending.
	#[error(transparent)]
	DuplicateId(#[from] DuplicateIdError),
	/// The engine thread is gone, or the pending slot was dropped unresolved.
	#[error("preview engine is not running")]
	EngineGone,
}
