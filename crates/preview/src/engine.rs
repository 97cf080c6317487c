//! Interface to the single-threaded preview engine and its callback edge.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use vellum_correlation::{CorrelationTable, TaskId};

use crate::ForeignInvocationError;

/// Outcome delivered through a task's result slot.
pub type TaskOutcome = Result<RenderOutput, ForeignInvocationError>;

/// Failure reported by the engine itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
	/// The named function is not defined in the engine.
	#[error("function `{0}` is not defined")]
	UndefinedFunction(String),
	/// The engine raised an error.
	#[error("{0}")]
	Script(String),
}

/// A render request as handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptCall {
	/// Engine function to invoke, e.g. `convertAsciidoc`.
	pub function: String,
	/// Id the engine must echo back through the [`CompletionPort`].
	pub task_id: TaskId,
	/// Document source.
	pub payload: String,
	/// Render options passed through to the function.
	pub config: Value,
}

/// The embedded script engine driving the preview.
///
/// Lives on one dedicated thread for its entire life and is only ever touched
/// from there, so implementations need not be `Send`.
pub trait ForeignEngine: 'static {
	/// Starts an asynchronous render.
	///
	/// Must return promptly. The result is delivered later through the
	/// [`CompletionPort`] the engine was built with, tagged with
	/// `call.task_id`.
	fn invoke(&mut self, call: &ScriptCall) -> Result<(), EngineError>;

	/// Calls a function synchronously and returns its value.
	fn call(&mut self, function: &str, args: &[Value]) -> Result<Value, EngineError>;
}

/// Rendered document returned by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutput {
	/// Rendered markup.
	pub rendered: String,
	/// Backend that produced it, when the engine reports one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub backend: Option<String>,
	/// Document title, when the source declares one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub doctitle: Option<String>,
}

impl From<String> for RenderOutput {
	fn from(rendered: String) -> Self {
		Self {
			rendered,
			..Self::default()
		}
	}
}

/// Callback payloads are either a full result object or just the markup.
#[derive(Deserialize)]
#[serde(untagged)]
enum CallbackPayload {
	Full(RenderOutput),
	Bare(String),
}

/// Inbound completion edge handed to the engine.
///
/// Cloneable and usable from any thread. Completions for tasks that already
/// finished or timed out are dropped silently.
#[derive(Clone)]
pub struct CompletionPort {
	table: Arc<CorrelationTable<TaskOutcome>>,
}

impl std::fmt::Debug for CompletionPort {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CompletionPort").field("pending", &self.table.len()).finish()
	}
}

impl CompletionPort {
	pub(crate) fn new(table: Arc<CorrelationTable<TaskOutcome>>) -> Self {
		Self { table }
	}

	/// Delivers an outcome. Returns true when a waiting caller received it.
	pub fn complete(&self, task_id: TaskId, outcome: TaskOutcome) -> bool {
		self.table.resolve(task_id, outcome)
	}

	/// Delivers a successful render.
	pub fn succeed(&self, task_id: TaskId, output: impl Into<RenderOutput>) -> bool {
		self.complete(task_id, Ok(output.into()))
	}

	/// Delivers a script-side failure.
	pub fn fail(&self, task_id: TaskId, function: &str, message: impl Into<String>) -> bool {
		self.complete(
			task_id,
			Err(ForeignInvocationError::Script {
				function: function.to_string(),
				message: message.into(),
			}),
		)
	}

	/// Delivers a raw callback as the engine emits it: a textual task id and a
	/// JSON payload.
	///
	/// A payload that does not decode fails the waiting caller with
	/// [`ForeignInvocationError::MalformedResult`]. An unparseable id cannot be
	/// routed anywhere and is dropped with a warning.
	pub fn complete_json(&self, task_id: &str, payload: &str) -> bool {
		let id: TaskId = match task_id.parse() {
			Ok(id) => id,
			Err(err) => {
				warn!(error = %err, "preview.callback.bad_task_id");
				return false;
			}
		};
		let outcome = match serde_json::from_str::<CallbackPayload>(payload) {
			Ok(CallbackPayload::Full(output)) => Ok(output),
			Ok(CallbackPayload::Bare(rendered)) => Ok(RenderOutput::from(rendered)),
			Err(err) => Err(ForeignInvocationError::MalformedResult(err.to_string())),
		};
		self.complete(id, outcome)
	}

	/// Number of renders still awaiting a callback.
	pub fn pending(&self) -> usize {
		self.table.len()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn port() -> (CompletionPort, Arc<CorrelationTable<TaskOutcome>>) {
		let table = Arc::new(CorrelationTable::new());
		(CompletionPort::new(Arc::clone(&table)), table)
	}

	#[test]
	fn complete_json_accepts_full_object() {
		let (port, table) = port();
		let mut handle = table.register_new().expect("fresh id");

		let payload = r#"{"rendered":"<p>hi</p>","backend":"html5","doctitle":"Doc","taskId":"ignored"}"#;
		assert!(port.complete_json(&handle.id().to_string(), payload));
		assert_eq!(
			handle.try_take(),
			Some(Ok(RenderOutput {
				rendered: "<p>hi</p>".into(),
				backend: Some("html5".into()),
				doctitle: Some("Doc".into()),
			}))
		);
	}

	#[test]
	fn complete_json_accepts_bare_string() {
		let (port, table) = port();
		let mut handle = table.register_new().expect("fresh id");
		assert!(port.complete_json(&handle.id().to_string(), r#""<ok>""#));
		assert_eq!(handle.try_take(), Some(Ok(RenderOutput::from("<ok>".to_string()))));
	}

	#[test]
	fn malformed_payload_fails_the_caller() {
		let (port, table) = port();
		let mut handle = table.register_new().expect("fresh id");
		assert!(port.complete_json(&handle.id().to_string(), "{not json"));
		assert!(matches!(handle.try_take(), Some(Err(ForeignInvocationError::MalformedResult(_)))));
	}

	#[test]
	fn bad_task_id_is_dropped() {
		let (port, table) = port();
		let _handle = table.register_new().expect("fresh id");
		assert!(!port.complete_json("nope", r#""<ok>""#));
		assert_eq!(port.pending(), 1);
	}
}
