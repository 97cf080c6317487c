//! In-process stand-in for the preview script engine.
//!
//! Renders plain text into escaped markup and reports back through the
//! completion port, optionally after a delay, so the correlation path can be
//! exercised without a real scripting runtime.

use std::time::Duration;

use serde_json::{Value, json};
use tokio::runtime::Handle;
use vellum_preview::{CompletionPort, EngineError, ForeignEngine, RenderBackend, ScriptCall};

pub struct TextEngine {
	port: CompletionPort,
	runtime: Handle,
	latency: Duration,
}

impl TextEngine {
	pub fn new(port: CompletionPort, runtime: Handle, latency: Duration) -> Self {
		Self { port, runtime, latency }
	}
}

fn escape(text: &str) -> String {
	text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn render(backend: RenderBackend, text: &str, options: &Value) -> Value {
	let doctitle = text.lines().find_map(|line| line.strip_prefix("= ")).map(str::trim);
	let body: String = text
		.split("\n\n")
		.map(str::trim)
		.filter(|block| !block.is_empty() && !block.starts_with("= "))
		.map(|block| match backend {
			RenderBackend::Docbook => format!("<simpara>{}</simpara>\n", escape(block)),
			RenderBackend::Asciidoc | RenderBackend::Html => format!("<div class=\"paragraph\"><p>{}</p></div>\n", escape(block)),
		})
		.collect();
	let standalone = options.get("header_footer").and_then(Value::as_bool).unwrap_or(false);
	let rendered = match (backend, standalone) {
		(RenderBackend::Html, true) => format!("<!DOCTYPE html>\n<html><body>\n{body}</body></html>\n"),
		(RenderBackend::Docbook, true) => format!("<article>\n{body}</article>\n"),
		_ => body,
	};
	json!({
		"rendered": rendered,
		"backend": backend.as_str(),
		"doctitle": doctitle,
	})
}

impl ForeignEngine for TextEngine {
	fn invoke(&mut self, call: &ScriptCall) -> Result<(), EngineError> {
		let backend = RenderBackend::ALL
			.into_iter()
			.find(|backend| backend.function_name() == call.function)
			.ok_or_else(|| EngineError::UndefinedFunction(call.function.clone()))?;
		let payload = render(backend, &call.payload, &call.config).to_string();
		let task_id = call.task_id.to_string();

		if self.latency.is_zero() {
			self.port.complete_json(&task_id, &payload);
			return Ok(());
		}
		let port = self.port.clone();
		let latency = self.latency;
		self.runtime.spawn(async move {
			tokio::time::sleep(latency).await;
			port.complete_json(&task_id, &payload);
		});
		Ok(())
	}

	fn call(&mut self, function: &str, args: &[Value]) -> Result<Value, EngineError> {
		let text = || args.first().and_then(Value::as_str).ok_or_else(|| EngineError::Script(format!("{function}: expected a string argument")));
		match function {
			"apply_replacements" => Ok(Value::String(text()?.replace("(C)", "©").replace("(R)", "®").replace("->", "→").replace("...", "…"))),
			"isHtml" => Ok(Value::Bool(text()?.trim_start().starts_with('<'))),
			"fillOutlines" => Ok(Value::Null),
			other => Err(EngineError::UndefinedFunction(other.to_string())),
		}
	}
}
