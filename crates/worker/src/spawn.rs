use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::TaskClass;

const FALLBACK_WORKERS: usize = 2;

static FALLBACK: OnceLock<Runtime> = OnceLock::new();

/// Runtime that timers and engine replies attach to.
///
/// Inside a tokio context this is the current runtime. Log producers and
/// blocking render callers run on plain threads, so outside one a small
/// shared runtime is started on first use and kept for the process.
pub fn runtime_handle() -> Handle {
	Handle::try_current().unwrap_or_else(|_| fallback_runtime().handle().clone())
}

fn fallback_runtime() -> &'static Runtime {
	FALLBACK.get_or_init(|| {
		Builder::new_multi_thread()
			.worker_threads(FALLBACK_WORKERS)
			.thread_name("vellum-runtime")
			.enable_all()
			.build()
			.expect("vellum fallback runtime must start")
	})
}

/// Runs `fut` on [`runtime_handle`], tagged with `class` in trace output.
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(class = class.as_str(), "worker.task");
	runtime_handle().spawn(fut)
}

/// Starts an OS thread called `name` for work that must stay off the runtime.
pub fn spawn_named_thread<F, R>(class: TaskClass, name: impl Into<String>, f: F) -> std::io::Result<std::thread::JoinHandle<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	let name = name.into();
	tracing::trace!(class = class.as_str(), thread = %name, "worker.thread");
	std::thread::Builder::new().name(name).spawn(f)
}
