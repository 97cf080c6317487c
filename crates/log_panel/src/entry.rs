//! Log entries shown in the panel.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Log severity levels, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
	/// Verbose diagnostic information for debugging.
	Trace,
	/// Debugging information for developers.
	Debug,
	/// General informational messages.
	Info,
	/// Warnings about potential issues.
	Warn,
	/// Error conditions that should be addressed.
	Error,
}

impl LogLevel {
	/// Uppercase label as shown in the panel's level column.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Trace => "TRACE",
			Self::Debug => "DEBUG",
			Self::Info => "INFO",
			Self::Warn => "WARN",
			Self::Error => "ERROR",
		}
	}
}

impl fmt::Display for LogLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl From<tracing::Level> for LogLevel {
	fn from(level: tracing::Level) -> Self {
		match level {
			tracing::Level::ERROR => LogLevel::Error,
			tracing::Level::WARN => LogLevel::Warn,
			tracing::Level::INFO => LogLevel::Info,
			tracing::Level::DEBUG => LogLevel::Debug,
			tracing::Level::TRACE => LogLevel::Trace,
		}
	}
}

/// A single log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
	/// Severity level of this log entry.
	pub level: LogLevel,
	/// Module or target that produced this log.
	pub target: String,
	/// The log message content.
	pub message: String,
}

impl LogEntry {
	/// Creates an entry.
	pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			level,
			target: target.into(),
			message: message.into(),
		}
	}

	/// Appends a failure trace on its own line. Only error entries carry
	/// traces; for other levels this is a no-op.
	#[must_use]
	pub fn with_trace(mut self, trace: &str) -> Self {
		if self.level == LogLevel::Error && !trace.is_empty() {
			self.message.push('\n');
			self.message.push_str(trace);
		}
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn levels_order_by_severity() {
		assert!(LogLevel::Trace < LogLevel::Info);
		assert!(LogLevel::Warn < LogLevel::Error);
		assert_eq!(LogLevel::from(tracing::Level::WARN), LogLevel::Warn);
	}

	#[test]
	fn trace_only_attaches_to_errors() {
		let err = LogEntry::new(LogLevel::Error, "vellum", "render failed").with_trace("boom at line 3");
		assert_eq!(err.message, "render failed\nboom at line 3");

		let warn = LogEntry::new(LogLevel::Warn, "vellum", "slow render").with_trace("ignored");
		assert_eq!(warn.message, "slow render");
	}
}
