//! Preview configuration loaded from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vellum_correlation::EscalationPolicy;

use crate::RenderBackend;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},
	/// Error parsing TOML.
	#[error("TOML parse error: {0}")]
	Parse(#[from] toml::de::Error),
}

/// Staged render timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
	/// First wait, in milliseconds.
	#[serde(default = "default_first_stage_ms")]
	pub first_stage_ms: u64,
	/// Escalated wait after the first one elapses, in milliseconds.
	#[serde(default = "default_second_stage_ms")]
	pub second_stage_ms: u64,
}

fn default_first_stage_ms() -> u64 {
	5_000
}

fn default_second_stage_ms() -> u64 {
	60_000
}

impl Default for RenderConfig {
	fn default() -> Self {
		Self {
			first_stage_ms: default_first_stage_ms(),
			second_stage_ms: default_second_stage_ms(),
		}
	}
}

impl RenderConfig {
	/// Escalation policy for `convert`.
	pub fn policy(&self) -> EscalationPolicy {
		EscalationPolicy::two_stage(Duration::from_millis(self.first_stage_ms), Duration::from_millis(self.second_stage_ms))
	}
}

fn empty_object() -> Value {
	Value::Object(Map::new())
}

/// Engine options passed to each backend's render function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfigs {
	/// Options for the live preview.
	#[serde(default = "empty_object")]
	pub asciidoc: Value,
	/// Options for DocBook output.
	#[serde(default = "empty_object")]
	pub docbook: Value,
	/// Options for HTML export.
	#[serde(default = "empty_object")]
	pub html: Value,
}

impl Default for BackendConfigs {
	fn default() -> Self {
		Self {
			asciidoc: empty_object(),
			docbook: empty_object(),
			html: empty_object(),
		}
	}
}

impl BackendConfigs {
	/// Options for `backend`.
	pub fn get(&self, backend: RenderBackend) -> &Value {
		match backend {
			RenderBackend::Asciidoc => &self.asciidoc,
			RenderBackend::Docbook => &self.docbook,
			RenderBackend::Html => &self.html,
		}
	}
}

/// Preview section of the editor configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
	/// Staged render timeouts.
	#[serde(default)]
	pub render: RenderConfig,
	/// Per-backend engine options.
	#[serde(default)]
	pub backends: BackendConfigs,
}

impl PreviewConfig {
	/// Parses configuration from a TOML string.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(input)?)
	}

	/// Reads and parses a TOML configuration file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&input)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	#[test]
	fn empty_input_uses_defaults() {
		let config = PreviewConfig::from_toml_str("").expect("empty config should parse");
		assert_eq!(config, PreviewConfig::default());
		assert_eq!(
			config.render.policy().stages(),
			&[Duration::from_secs(5), Duration::from_secs(60)]
		);
	}

	#[test]
	fn parses_timeouts_and_backend_options() {
		let config = PreviewConfig::from_toml_str(
			r#"
			[render]
			first_stage_ms = 250

			[backends.html]
			header_footer = true
			attributes = { icons = "font" }
			"#,
		)
		.expect("config should parse");

		assert_eq!(config.render.first_stage_ms, 250);
		assert_eq!(config.render.second_stage_ms, 60_000);
		assert_eq!(config.backends.get(RenderBackend::Html), &json!({"header_footer": true, "attributes": {"icons": "font"}}));
		assert_eq!(config.backends.get(RenderBackend::Docbook), &json!({}));
	}

	#[test]
	fn load_reports_missing_file() {
		let dir = tempfile::tempdir().expect("temp dir");
		let path = dir.path().join("missing.toml");
		let err = PreviewConfig::load(&path).unwrap_err();
		assert!(matches!(err, ConfigError::Io { path: p, .. } if p == path));
	}

	#[test]
	fn load_reads_file() {
		let dir = tempfile::tempdir().expect("temp dir");
		let path = dir.path().join("preview.toml");
		std::fs::write(&path, "[render]\nsecond_stage_ms = 1000\n").expect("write config");
		let config = PreviewConfig::load(&path).expect("config should load");
		assert_eq!(config.render.second_stage_ms, 1000);
	}

	#[test]
	fn rejects_wrong_types() {
		assert!(matches!(PreviewConfig::from_toml_str("[render]\nfirst_stage_ms = \"soon\"\n"), Err(ConfigError::Parse(_))));
	}
}
