//! Tracing layer that feeds log events into the panel's debounced batches.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::{BatchSink, DebouncedFlush, LogEntry, LogLevel, LogPanelConfig};

const OWN_TARGET: &str = "vellum_log_panel";

/// Status line state shown next to the panel toggle.
#[derive(Debug, Default)]
pub struct PanelStatus {
	last_message: Mutex<Option<String>>,
	has_errors: AtomicBool,
}

impl PanelStatus {
	/// First line of the most recent captured entry.
	pub fn last_message(&self) -> Option<String> {
		self.last_message.lock().clone()
	}

	/// True once an error entry was captured and not yet acknowledged.
	pub fn has_errors(&self) -> bool {
		self.has_errors.load(Ordering::Acquire)
	}

	/// Clears the error indicator, e.g. when the user opens the panel.
	pub fn acknowledge_errors(&self) {
		self.has_errors.store(false, Ordering::Release);
	}

	fn record(&self, entry: &LogEntry) {
		let headline = entry.message.lines().next().unwrap_or_default().to_string();
		*self.last_message.lock() = Some(headline);
		if entry.level == LogLevel::Error {
			self.has_errors.store(true, Ordering::Release);
		}
	}
}

/// A [`tracing_subscriber::Layer`] that turns captured events into
/// [`LogEntry`] values and appends them to a [`DebouncedFlush`].
///
/// The layer itself never blocks on the sink: events only touch the buffer
/// and, for the first event of a window, arm the flush timer.
pub struct LogPanelLayer {
	config: LogPanelConfig,
	flush: DebouncedFlush<LogEntry>,
	status: Arc<PanelStatus>,
}

impl LogPanelLayer {
	/// Creates a layer delivering batches to `sink` once per configured window.
	pub fn new(config: LogPanelConfig, sink: impl BatchSink<LogEntry>) -> Self {
		let flush = DebouncedFlush::new(config.flush_window(), sink);
		Self {
			config,
			flush,
			status: Arc::new(PanelStatus::default()),
		}
	}

	/// Handle to the flush controller, for flushing on shutdown.
	pub fn flush_handle(&self) -> DebouncedFlush<LogEntry> {
		self.flush.clone()
	}

	/// Shared status line state.
	pub fn status(&self) -> Arc<PanelStatus> {
		Arc::clone(&self.status)
	}
}

/// Visitor for extracting the message, the error trace and the remaining fields.
struct MessageVisitor {
	message: String,
	error: Option<String>,
	fields: Vec<(&'static str, String)>,
}

impl MessageVisitor {
	fn new() -> Self {
		Self {
			message: String::new(),
			error: None,
			fields: Vec::new(),
		}
	}

	fn push(&mut self, field: &Field, value: String) {
		match field.name() {
			"message" => self.message = value,
			"error" => self.error = Some(value),
			name => self.fields.push((name, value)),
		}
	}

	fn into_entry(self, level: LogLevel, target: &str) -> LogEntry {
		let mut message = self.message;
		for (name, value) in &self.fields {
			if !message.is_empty() {
				message.push(' ');
			}
			let _ = write!(message, "{name}={value}");
		}
		let entry = LogEntry::new(level, target, message);
		match self.error {
			Some(error) if level == LogLevel::Error => entry.with_trace(&error),
			Some(error) => {
				let mut entry = entry;
				let _ = write!(entry.message, " error={error}");
				entry
			}
			None => entry,
		}
	}
}

impl Visit for MessageVisitor {
	fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
		self.push(field, format!("{value:?}"));
	}

	fn record_str(&mut self, field: &Field, value: &str) {
		self.push(field, value.to_string());
	}

	fn record_i64(&mut self, field: &Field, value: i64) {
		self.push(field, value.to_string());
	}

	fn record_u64(&mut self, field: &Field, value: u64) {
		self.push(field, value.to_string());
	}

	fn record_bool(&mut self, field: &Field, value: bool) {
		self.push(field, value.to_string());
	}

	fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
		self.push(field, value.to_string());
	}
}

impl<S: Subscriber> Layer<S> for LogPanelLayer {
	fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
		let metadata = event.metadata();
		let target = metadata.target();
		// The panel's own flush diagnostics would otherwise keep re-arming it.
		if target.starts_with(OWN_TARGET) {
			return;
		}
		let level = LogLevel::from(*metadata.level());
		if !self.config.captures(level, target) {
			return;
		}

		let mut visitor = MessageVisitor::new();
		event.record(&mut visitor);
		let entry = visitor.into_entry(level, target);

		self.status.record(&entry);
		self.flush.append(entry);
	}
}
