//! Request submission and completion matching for preview renders.

use std::sync::Arc;

use serde_json::Value;
use tracing::{Instrument, debug, debug_span, error, warn};
use vellum_correlation::{CorrelationTable, EscalationPolicy, WaitError};
use vellum_worker::EngineThread;

use crate::backend::merge_options;
use crate::config::{BackendConfigs, PreviewConfig};
use crate::{CompletionPort, ForeignEngine, ForeignInvocationError, RenderBackend, RenderError, RenderOutput, RenderTimeoutError, Result, ScriptCall, TaskOutcome};

/// Thread name of the dedicated preview engine thread.
pub const ENGINE_THREAD_NAME: &str = "preview-engine";

/// Bridges callers on any thread to the single-threaded preview engine.
///
/// Each `convert` registers a fresh task id, queues the render on the engine
/// thread, and waits for the engine to report back through its
/// [`CompletionPort`] under the configured [`EscalationPolicy`]. Queued work
/// runs strictly in submission order.
pub struct RenderCorrelationService<E> {
	pub(crate) engine: EngineThread<E>,
	table: Arc<CorrelationTable<TaskOutcome>>,
	policy: EscalationPolicy,
	backends: BackendConfigs,
}

impl<E> std::fmt::Debug for RenderCorrelationService<E> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RenderCorrelationService")
			.field("engine", &self.engine)
			.field("pending", &self.table.len())
			.field("policy", &self.policy)
			.finish_non_exhaustive()
	}
}

impl<E: ForeignEngine> RenderCorrelationService<E> {
	/// Starts the engine thread; `builder` runs there and receives the
	/// completion port the engine must report results through.
	pub fn spawn<B>(config: &PreviewConfig, builder: B) -> std::io::Result<Self>
	where
		B: FnOnce(CompletionPort) -> E + Send + 'static,
	{
		let table = Arc::new(CorrelationTable::new());
		let port = CompletionPort::new(Arc::clone(&table));
		let engine = EngineThread::spawn(ENGINE_THREAD_NAME, move || builder(port))?;
		Ok(Self {
			engine,
			table,
			policy: config.render.policy(),
			backends: config.backends.clone(),
		})
	}

	/// Replaces the escalation policy.
	#[must_use]
	pub fn with_policy(mut self, policy: EscalationPolicy) -> Self {
		self.policy = policy;
		self
	}

	/// Returns another handle to the engine's completion edge.
	pub fn completion_port(&self) -> CompletionPort {
		CompletionPort::new(Arc::clone(&self.table))
	}

	/// Number of renders awaiting a callback.
	pub fn pending(&self) -> usize {
		self.table.len()
	}

	/// Active escalation policy.
	pub fn policy(&self) -> &EscalationPolicy {
		&self.policy
	}

	/// Renders `payload` with engine function `function`.
	///
	/// The engine is invoked exactly once per call. If the first stage of the
	/// policy elapses the wait continues on the same task; only when every
	/// stage has elapsed does the call fail with [`RenderError::Timeout`], and
	/// any later callback for the task is discarded.
	pub async fn convert(&self, function: &str, payload: impl Into<String>, config: Value) -> Result<RenderOutput> {
		let handle = self.table.register_new().inspect_err(|err| error!(error = %err, "preview.convert.duplicate_id"))?;
		let task_id = handle.id();
		let span = debug_span!("preview.convert", %task_id, function);

		let call = ScriptCall {
			function: function.to_string(),
			task_id,
			payload: payload.into(),
			config,
		};
		let invoke_table = Arc::clone(&self.table);
		let panic_table = Arc::clone(&self.table);
		let submitted = span.in_scope(|| {
			self.engine.submit_or_else(
				move |engine| {
					if let Err(err) = engine.invoke(&call) {
						debug!(task_id = %call.task_id, error = %err, "preview.invoke.failed");
						invoke_table.resolve(call.task_id, Err(ForeignInvocationError::from_engine(&call.function, err)));
					}
				},
				move |panic| {
					panic_table.resolve(task_id, Err(ForeignInvocationError::Panicked(panic)));
				},
			)
		});
		if let Err(err) = submitted {
			warn!(%task_id, error = %err, "preview.convert.engine_gone");
			let _ = self.table.evict(task_id);
			return Err(RenderError::EngineGone);
		}

		match self.policy.wait(&self.table, handle).instrument(span).await {
			Ok(Ok(output)) => Ok(output),
			Ok(Err(err)) => Err(err.into()),
			Err(WaitError::TimedOut { id, waited }) => Err(RenderTimeoutError {
				task_id: id,
				function: function.to_string(),
				waited,
			}
			.into()),
			Err(WaitError::Abandoned { .. }) => Err(RenderError::EngineGone),
		}
	}

	/// Blocking form of [`convert`](Self::convert) for plain threads.
	///
	/// # Panics
	///
	/// Panics when called from inside an async task, like any blocking wait on
	/// a tokio runtime.
	pub fn convert_blocking(&self, function: &str, payload: impl Into<String>, config: Value) -> Result<RenderOutput> {
		vellum_worker::runtime_handle().block_on(self.convert(function, payload, config))
	}

	/// Renders with `backend`, merging `overrides` onto its configured options.
	pub async fn convert_backend(&self, backend: RenderBackend, text: impl Into<String>, overrides: &Value) -> Result<RenderOutput> {
		let options = merge_options(self.backends.get(backend), overrides);
		self.convert(backend.function_name(), text, options).await
	}
}
