#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use vellum_preview::{CompletionPort, EngineError, ForeignEngine, PreviewConfig, RenderConfig, RenderCorrelationService, ScriptCall};

/// How the mock engine answers a render invocation.
#[derive(Clone)]
pub enum Reply {
	/// Calls back with this JSON payload after the delay.
	After(Duration, String),
	/// Echoes the uppercased payload after the delay.
	EchoAfter(Duration),
	/// Echoes the payload before `invoke` returns.
	EchoInline,
	/// Accepts the call and never calls back.
	Never,
	/// Fails the invocation synchronously.
	Reject(EngineError),
	/// Panics inside `invoke`.
	Panic,
}

/// Records every invocation the engine sees.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<ScriptCall>>>);

impl CallLog {
	pub fn calls(&self) -> Vec<ScriptCall> {
		self.0.lock().unwrap().clone()
	}

	pub fn len(&self) -> usize {
		self.0.lock().unwrap().len()
	}
}

pub struct MockEngine {
	port: CompletionPort,
	reply: Reply,
	runtime: Option<Handle>,
	log: CallLog,
	outlines: Arc<Mutex<Vec<Value>>>,
}

impl MockEngine {
	fn schedule(&self, delay: Duration, task_id: String, payload: String) {
		let port = self.port.clone();
		let runtime = self.runtime.as_ref().expect("delayed replies need a runtime handle");
		runtime.spawn(async move {
			tokio::time::sleep(delay).await;
			port.complete_json(&task_id, &payload);
		});
	}
}

impl ForeignEngine for MockEngine {
	fn invoke(&mut self, call: &ScriptCall) -> Result<(), EngineError> {
		self.log.0.lock().unwrap().push(call.clone());
		let task_id = call.task_id.to_string();
		match self.reply.clone() {
			Reply::After(delay, payload) => self.schedule(delay, task_id, payload),
			Reply::EchoAfter(delay) => {
				let payload = serde_json::to_string(&call.payload.to_uppercase()).unwrap();
				self.schedule(delay, task_id, payload);
			}
			Reply::EchoInline => {
				self.port.complete_json(&task_id, &serde_json::to_string(&call.payload).unwrap());
			}
			Reply::Never => {}
			Reply::Reject(err) => return Err(err),
			Reply::Panic => panic!("engine crashed mid-invoke"),
		}
		Ok(())
	}

	fn call(&mut self, function: &str, args: &[Value]) -> Result<Value, EngineError> {
		match function {
			"apply_replacements" => {
				let text = args.first().and_then(Value::as_str).ok_or_else(|| EngineError::Script("expected text".into()))?;
				Ok(Value::String(text.replace("(C)", "©")))
			}
			"isHtml" => Ok(Value::Bool(args.first().and_then(Value::as_str).is_some_and(|t| t.trim_start().starts_with('<')))),
			"findRenderedSelection" => {
				let selected = args.first().and_then(Value::as_str).unwrap_or_default();
				Ok(match selected.strip_prefix("<strong>").and_then(|rest| rest.strip_suffix("</strong>")) {
					Some(inner) => Value::String(format!("*{inner}*")),
					None if selected.is_empty() => Value::Null,
					None => Value::Bool(true),
				})
			}
			"fillOutlines" => {
				self.outlines.lock().unwrap().extend(args.iter().cloned());
				Ok(Value::Null)
			}
			other => Err(EngineError::UndefinedFunction(other.to_string())),
		}
	}
}

pub struct Harness {
	pub service: RenderCorrelationService<MockEngine>,
	pub log: CallLog,
	pub outlines: Arc<Mutex<Vec<Value>>>,
}

/// Builds a service whose first stage lasts `first` and second stage `second`.
pub fn harness(reply: Reply, first: Duration, second: Duration) -> Harness {
	let config = PreviewConfig {
		render: RenderConfig {
			first_stage_ms: first.as_millis() as u64,
			second_stage_ms: second.as_millis() as u64,
		},
		..PreviewConfig::default()
	};
	harness_with_config(reply, &config)
}

pub fn harness_with_config(reply: Reply, config: &PreviewConfig) -> Harness {
	let log = CallLog::default();
	let outlines = Arc::new(Mutex::new(Vec::new()));
	let runtime = Handle::try_current().ok();
	let engine_log = log.clone();
	let engine_outlines = Arc::clone(&outlines);
	let service = RenderCorrelationService::spawn(config, move |port| MockEngine {
		port,
		reply,
		runtime,
		log: engine_log,
		outlines: engine_outlines,
	})
	.expect("engine thread should spawn");
	Harness { service, log, outlines }
}
