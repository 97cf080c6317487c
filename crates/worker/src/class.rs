/// Where a piece of worker-scheduled work runs; recorded on spawn traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Deferred runtime tasks such as debounced log flushes.
	Background,
	/// Jobs pinned to the single-threaded engine context.
	Engine,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Background => "background",
			Self::Engine => "engine",
		}
	}
}
