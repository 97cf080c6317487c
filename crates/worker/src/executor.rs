//! Dedicated thread that owns a single-threaded engine context.
//!
//! Script engines and UI toolkits must only be touched from one thread. An
//! [`EngineThread`] constructs its context on a dedicated OS thread and then
//! runs submitted closures against it strictly in submission order, so the
//! context itself never needs to be `Send`.
//!
//! Caller tracing spans are propagated into the engine thread so logs emitted
//! while a job runs appear nested under the span that submitted it.
//!
//! A panicking job does not take the thread down: the panic is caught, logged,
//! and handed to the job's failure callback when one was supplied. Shutdown is
//! explicit: dropping the owning handle sends a `Shutdown` job and waits
//! briefly for an ack. Clones obtained through [`EngineThread::client`] share
//! the queue but never shut it down.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use tracing::{error, trace};

use crate::{TaskClass, panic_message, spawn_named_thread};

const SHUTDOWN_ACK_TIMEOUT: Duration = Duration::from_millis(100);

type Work<C> = Box<dyn FnOnce(&mut C) + Send>;
type OnPanic = Box<dyn FnOnce(String) + Send>;

enum Job<C> {
	Run {
		work: Work<C>,
		on_panic: Option<OnPanic>,
		span: tracing::Span,
	},
	Shutdown {
		ack: mpsc::SyncSender<()>,
	},
}

/// Engine executor failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
	/// The engine thread has exited and no longer accepts work.
	#[error("engine thread has shut down")]
	Shutdown,
	/// The job was accepted but its reply was dropped (the job panicked).
	#[error("engine job dropped its reply")]
	ReplyDropped,
	/// A blocking call was issued from the engine thread itself.
	#[error("blocking engine call issued from the engine thread")]
	Reentrant,
}

/// Handle to a dedicated engine thread.
pub struct EngineThread<C> {
	tx: mpsc::Sender<Job<C>>,
	thread: ThreadId,
	name: Arc<str>,
	/// Only the owner sends `Shutdown` on drop.
	is_owner: bool,
}

impl<C: 'static> EngineThread<C> {
	/// Spawns the engine thread; `factory` runs on that thread to build the context.
	pub fn spawn<F>(name: impl Into<String>, factory: F) -> std::io::Result<Self>
	where
		F: FnOnce() -> C + Send + 'static,
	{
		let name: String = name.into();
		let (tx, rx) = mpsc::channel::<Job<C>>();
		let thread_name = name.clone();

		let handle = spawn_named_thread(TaskClass::Engine, name.clone(), move || {
			let mut ctx = factory();
			while let Ok(job) = rx.recv() {
				match job {
					Job::Run { work, on_panic, span } => {
						let _guard = span.enter();
						if let Err(payload) = catch_unwind(AssertUnwindSafe(|| work(&mut ctx))) {
							let msg = panic_message(payload.as_ref());
							error!(engine = %thread_name, panic = %msg, "engine job panicked");
							if let Some(on_panic) = on_panic {
								on_panic(msg);
							}
						}
					}
					Job::Shutdown { ack } => {
						let _ = ack.send(());
						break;
					}
				}
			}
			trace!(engine = %thread_name, "engine thread exiting");
		})?;

		Ok(Self {
			tx,
			thread: handle.thread().id(),
			name: name.into(),
			is_owner: true,
		})
	}

	/// Creates a non-owning client that shares the engine queue.
	pub fn client(&self) -> Self {
		Self {
			tx: self.tx.clone(),
			thread: self.thread,
			name: Arc::clone(&self.name),
			is_owner: false,
		}
	}

	/// Returns the engine thread name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns true when the caller is running on the engine thread.
	pub fn is_engine_thread(&self) -> bool {
		thread::current().id() == self.thread
	}

	/// Enqueues `work` behind everything submitted before it.
	pub fn submit<F>(&self, work: F) -> Result<(), SchedulerError>
	where
		F: FnOnce(&mut C) + Send + 'static,
	{
		self.enqueue(Box::new(work), None)
	}

	/// Enqueues `work`; if it panics, `on_panic` receives the panic message on
	/// the engine thread.
	pub fn submit_or_else<F, P>(&self, work: F, on_panic: P) -> Result<(), SchedulerError>
	where
		F: FnOnce(&mut C) + Send + 'static,
		P: FnOnce(String) + Send + 'static,
	{
		self.enqueue(Box::new(work), Some(Box::new(on_panic)))
	}

	/// Runs `f` on the engine thread and awaits its value.
	pub async fn call<F, R>(&self, f: F) -> Result<R, SchedulerError>
	where
		F: FnOnce(&mut C) -> R + Send + 'static,
		R: Send + 'static,
	{
		let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
		self.submit(move |ctx| {
			let _ = reply_tx.send(f(ctx));
		})?;
		reply_rx.await.map_err(|_| SchedulerError::ReplyDropped)
	}

	/// Runs `f` on the engine thread and blocks the calling thread for its value.
	///
	/// Fails with [`SchedulerError::Reentrant`] on the engine thread, where
	/// waiting on its own queue could never complete.
	pub fn call_blocking<F, R>(&self, f: F) -> Result<R, SchedulerError>
	where
		F: FnOnce(&mut C) -> R + Send + 'static,
		R: Send + 'static,
	{
		if self.is_engine_thread() {
			return Err(SchedulerError::Reentrant);
		}
		let (reply_tx, reply_rx) = mpsc::sync_channel(1);
		self.submit(move |ctx| {
			let _ = reply_tx.send(f(ctx));
		})?;
		reply_rx.recv().map_err(|_| SchedulerError::ReplyDropped)
	}

	fn enqueue(&self, work: Work<C>, on_panic: Option<OnPanic>) -> Result<(), SchedulerError> {
		let job = Job::Run {
			work,
			on_panic,
			span: tracing::Span::current(),
		};
		self.tx.send(job).map_err(|_| SchedulerError::Shutdown)
	}
}

impl<C> std::fmt::Debug for EngineThread<C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EngineThread")
			.field("name", &self.name)
			.field("is_owner", &self.is_owner)
			.finish_non_exhaustive()
	}
}

impl<C> Drop for EngineThread<C> {
	fn drop(&mut self) {
		if !self.is_owner {
			return;
		}

		let (ack_tx, ack_rx) = mpsc::sync_channel(1);
		if self.tx.send(Job::Shutdown { ack: ack_tx }).is_err() {
			return;
		}

		let deadline = Instant::now() + SHUTDOWN_ACK_TIMEOUT;
		loop {
			match ack_rx.try_recv() {
				Ok(()) => return,
				Err(mpsc::TryRecvError::Empty) => {
					if Instant::now() >= deadline {
						return;
					}
					thread::yield_now();
				}
				Err(mpsc::TryRecvError::Disconnected) => return,
			}
		}
	}
}
