//! Synchronous engine helpers used by the editor around a render.
//!
//! These call straight into engine functions that return a value, instead of
//! going through the task-id callback path. Failures never reach the caller:
//! each helper degrades to a neutral answer and logs at debug level.

use serde_json::Value;
use tracing::debug;
use vellum_worker::SchedulerError;

use crate::{EngineError, ForeignEngine, RenderCorrelationService};

impl<E: ForeignEngine> RenderCorrelationService<E> {
	/// Applies the engine's text replacements (typographic quotes, arrows and
	/// the like) to `text`. Returns `text` unchanged if the engine fails.
	pub async fn apply_replacements(&self, text: impl Into<String>) -> String {
		let text = text.into();
		let arg = Value::String(text.clone());
		let result = self.engine.call(move |engine| engine.call("apply_replacements", &[arg])).await;
		replaced_or_original(result, text)
	}

	/// Blocking form of [`apply_replacements`](Self::apply_replacements).
	///
	/// Called on the engine thread itself this cannot queue behind its own
	/// work, so the text comes back unchanged.
	pub fn apply_replacements_blocking(&self, text: impl Into<String>) -> String {
		let text = text.into();
		let arg = Value::String(text.clone());
		let result = self.engine.call_blocking(move |engine| engine.call("apply_replacements", &[arg]));
		replaced_or_original(result, text)
	}

	/// Pushes the document outline to the engine's outline view.
	///
	/// Fire-and-forget; queued behind any pending renders.
	pub fn fill_outlines(&self, outline: Value) {
		let submitted = self.engine.submit(move |engine| {
			if let Err(err) = engine.call("fillOutlines", &[outline]) {
				debug!(error = %err, "preview.fill_outlines.failed");
			}
		});
		if let Err(err) = submitted {
			debug!(error = %err, "preview.fill_outlines.engine_gone");
		}
	}

	/// Maps a selection in the rendered preview back to source text.
	///
	/// `content` is the selected rendered fragment. Returns `None` when the
	/// engine finds no match or the call fails.
	pub async fn find_rendered_selection(&self, content: impl Into<String>) -> Option<String> {
		let arg = Value::String(content.into());
		match self.engine.call(move |engine| engine.call("findRenderedSelection", &[arg])).await {
			Ok(Ok(Value::String(source))) => Some(source),
			Ok(Ok(Value::Null)) => None,
			Ok(Ok(other)) => {
				debug!(value = %other, "preview.find_rendered_selection.non_string");
				None
			}
			Ok(Err(err)) => {
				debug!(error = %err, "preview.find_rendered_selection.failed");
				None
			}
			Err(err) => {
				debug!(error = %err, "preview.find_rendered_selection.engine_gone");
				None
			}
		}
	}

	/// Asks the engine whether `text` looks like HTML rather than markup source.
	pub async fn is_html(&self, text: impl Into<String>) -> bool {
		let arg = Value::String(text.into());
		match self.engine.call(move |engine| engine.call("isHtml", &[arg])).await {
			Ok(Ok(Value::Bool(is_html))) => is_html,
			Ok(Ok(other)) => {
				debug!(value = %other, "preview.is_html.non_bool");
				false
			}
			Ok(Err(err)) => {
				debug!(error = %err, "preview.is_html.failed");
				false
			}
			Err(err) => {
				debug!(error = %err, "preview.is_html.engine_gone");
				false
			}
		}
	}
}

fn replaced_or_original(result: Result<Result<Value, EngineError>, SchedulerError>, original: String) -> String {
	match result {
		Ok(Ok(Value::String(replaced))) => replaced,
		Ok(Ok(other)) => {
			debug!(value = %other, "preview.apply_replacements.non_string");
			original
		}
		Ok(Err(err)) => {
			debug!(error = %err, "preview.apply_replacements.failed");
			original
		}
		Err(err) => {
			debug!(error = %err, "preview.apply_replacements.engine_gone");
			original
		}
	}
}
