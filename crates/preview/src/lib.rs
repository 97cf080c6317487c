//! Render-task correlation for the preview pane.
//!
//! The preview engine is single-threaded and answers render requests out of
//! band: a request carries a task id, and the finished document arrives later
//! through a callback naming that id. [`RenderCorrelationService`] hides this
//! behind an ordinary `convert` call that any thread can make.
//!
//! * [`ForeignEngine`]: the engine interface, driven on a dedicated thread
//! * [`CompletionPort`]: the inbound callback edge handed to the engine
//! * [`RenderBackend`]: the render functions the engine exposes
//! * [`PreviewConfig`]: staged timeouts and per-backend engine options

pub mod backend;
mod bridge;
pub mod config;
pub mod engine;
pub mod error;
mod service;

pub use backend::RenderBackend;
pub use config::{BackendConfigs, ConfigError, PreviewConfig, RenderConfig};
pub use engine::{CompletionPort, EngineError, ForeignEngine, RenderOutput, ScriptCall, TaskOutcome};
pub use error::{ForeignInvocationError, RenderError, RenderTimeoutError, Result};
pub use service::RenderCorrelationService;
pub use vellum_correlation::{EscalationPolicy, TaskId};
