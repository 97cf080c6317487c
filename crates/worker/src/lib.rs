//! Worker runtime primitives for the preview bridge.
//!
//! * [`spawn`]: classified tokio task spawning, usable from threads that are
//!   not inside a runtime.
//! * [`EngineThread`]: ordered job queue in front of a single-threaded engine
//!   context.

mod class;
mod executor;
mod panic;
mod spawn;

pub use class::TaskClass;
pub use executor::{EngineThread, SchedulerError};
pub use panic::panic_message;
pub use spawn::{runtime_handle, spawn, spawn_named_thread};
