//! Combined configuration file for the command line driver.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use vellum_log_panel::LogPanelConfig;
use vellum_preview::PreviewConfig;

/// Top-level `vellum.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
	#[serde(default)]
	pub preview: PreviewConfig,
	#[serde(default)]
	pub log_panel: LogPanelConfig,
}

impl AppConfig {
	/// Loads `path`, or defaults when no path was given.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let Some(path) = path else {
			return Ok(Self::default());
		};
		let input = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
		toml::from_str(&input).with_context(|| format!("parsing config {}", path.display()))
	}
}
