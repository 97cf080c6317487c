//! Log panel feed: coalesces log events into one UI update per time window.
//!
//! Producers on any thread append entries; the first append after a flush
//! arms a single timer, later appends only join the pending batch. When the
//! timer fires the whole batch moves into the sink in one delivery.
//!
//! * [`BatchBuffer`]: unbounded append buffer with atomic drain
//! * [`DebouncedFlush`]: schedule-once flush controller
//! * [`LogPanelLayer`]: `tracing` layer feeding the controller
//! * [`EngineSink`]: delivers batches on a single-threaded UI context

mod buffer;
mod config;
mod debounce;
mod entry;
mod layer;
mod sink;

pub use buffer::BatchBuffer;
pub use config::LogPanelConfig;
pub use debounce::{DebouncedFlush, FlushStats};
pub use entry::{LogEntry, LogLevel};
pub use layer::{LogPanelLayer, PanelStatus};
pub use sink::{BatchSink, EngineSink, LogView};
