//! Batch consumers.

use tracing::debug;
use vellum_worker::EngineThread;

use crate::LogEntry;

/// Receives whole batches from a [`DebouncedFlush`](crate::DebouncedFlush).
///
/// Called from the flush timer task. Implementations that own
/// single-threaded state must hop to their own context, as [`EngineSink`]
/// does; a failed delivery is the sink's own business and never reaches the
/// producers.
pub trait BatchSink<T>: Send + Sync + 'static {
	/// Takes ownership of one batch, oldest entry first.
	fn deliver(&self, batch: Vec<T>);
}

impl<T, F> BatchSink<T> for F
where
	F: Fn(Vec<T>) + Send + Sync + 'static,
{
	fn deliver(&self, batch: Vec<T>) {
		self(batch)
	}
}

/// UI-side log view living on a single-threaded context.
pub trait LogView: 'static {
	/// Appends a batch of entries to the visible log.
	fn append_entries(&mut self, batch: Vec<LogEntry>);
}

impl LogView for Vec<LogEntry> {
	fn append_entries(&mut self, batch: Vec<LogEntry>) {
		self.extend(batch);
	}
}

/// Delivers batches on the engine thread that owns the log view.
pub struct EngineSink<V> {
	thread: EngineThread<V>,
}

impl<V: LogView> EngineSink<V> {
	/// Wraps a client handle to the view's thread.
	pub fn new(thread: &EngineThread<V>) -> Self {
		Self { thread: thread.client() }
	}
}

impl<V: LogView> BatchSink<LogEntry> for EngineSink<V> {
	fn deliver(&self, batch: Vec<LogEntry>) {
		let len = batch.len();
		if let Err(err) = self.thread.submit(move |view| view.append_entries(batch)) {
			debug!(error = %err, dropped = len, "log_panel.sink.view_gone");
		}
	}
}
