use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::LogLevel;

/// Log panel section of the editor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPanelConfig {
	/// Coalescing window between the first buffered entry and its flush.
	#[serde(default = "default_flush_window_ms")]
	pub flush_window_ms: u64,
	/// Lowest level captured from the editor's own targets.
	#[serde(default = "default_min_level")]
	pub min_level: LogLevel,
	/// Target prefixes treated as the editor's own; other targets are only
	/// captured at warn level and above.
	#[serde(default = "default_capture_targets")]
	pub capture_targets: Vec<String>,
}

fn default_flush_window_ms() -> u64 {
	3_000
}

fn default_min_level() -> LogLevel {
	LogLevel::Info
}

fn default_capture_targets() -> Vec<String> {
	vec!["vellum".to_string()]
}

impl Default for LogPanelConfig {
	fn default() -> Self {
		Self {
			flush_window_ms: default_flush_window_ms(),
			min_level: default_min_level(),
			capture_targets: default_capture_targets(),
		}
	}
}

impl LogPanelConfig {
	/// Coalescing window as a duration.
	pub fn flush_window(&self) -> Duration {
		Duration::from_millis(self.flush_window_ms)
	}

	/// Returns true when an event at `level` from `target` belongs in the panel.
	pub fn captures(&self, level: LogLevel, target: &str) -> bool {
		if self.capture_targets.iter().any(|prefix| target.starts_with(prefix.as_str())) {
			level >= self.min_level
		} else {
			level >= LogLevel::Warn
		}
	}
}
