//! Render backends exposed by the preview engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output formats the engine can render a document into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderBackend {
	/// Live preview HTML.
	Asciidoc,
	/// DocBook XML.
	Docbook,
	/// Standalone HTML export.
	Html,
}

impl RenderBackend {
	/// All backends, in menu order.
	pub const ALL: [Self; 3] = [Self::Asciidoc, Self::Docbook, Self::Html];

	/// Engine function that starts a render for this backend.
	pub const fn function_name(self) -> &'static str {
		match self {
			Self::Asciidoc => "convertAsciidoc",
			Self::Docbook => "convertDocbook",
			Self::Html => "convertHtml",
		}
	}

	/// Lowercase identifier used in configuration.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Asciidoc => "asciidoc",
			Self::Docbook => "docbook",
			Self::Html => "html",
		}
	}
}

impl fmt::Display for RenderBackend {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for RenderBackend {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|backend| backend.as_str().eq_ignore_ascii_case(s))
			.ok_or_else(|| format!("unknown render backend {s:?} (expected asciidoc, docbook or html)"))
	}
}

/// Shallow-merges `overrides` onto `base`; override keys win.
///
/// Non-object overrides replace the base outright, and a null override leaves
/// it untouched.
pub fn merge_options(base: &Value, overrides: &Value) -> Value {
	match (base, overrides) {
		(_, Value::Null) => base.clone(),
		(Value::Object(base), Value::Object(overrides)) => {
			let mut merged = base.clone();
			for (key, value) in overrides {
				merged.insert(key.clone(), value.clone());
			}
			Value::Object(merged)
		}
		(_, other) => other.clone(),
	}
}
