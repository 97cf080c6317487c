//! Schedule-once flush controller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use vellum_worker::{TaskClass, spawn};

use crate::{BatchBuffer, BatchSink};

/// Counters describing flush activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
	/// Idle→Scheduled transitions, i.e. timers armed.
	pub timers_armed: u64,
	/// Non-empty batches handed to the sink.
	pub batches_delivered: u64,
	/// Entries handed to the sink across all batches.
	pub entries_delivered: u64,
}

struct Inner<T> {
	buffer: BatchBuffer<T>,
	/// Set while a flush timer is pending. Only the timer task clears it.
	scheduled: AtomicBool,
	window: Duration,
	sink: Box<dyn BatchSink<T>>,
	/// Held from drain to delivery so batches reach the sink in drain order.
	delivery: Mutex<()>,
	runtime: Handle,
	shutdown: CancellationToken,
	timers_armed: AtomicU64,
	batches_delivered: AtomicU64,
	entries_delivered: AtomicU64,
}

impl<T: Send + 'static> Inner<T> {
	fn timer_fired(&self) {
		// Clear before draining: an append that races with the drain either
		// lands in this batch or arms the next timer.
		self.scheduled.store(false, Ordering::Release);
		self.deliver_buffered();
	}

	fn deliver_buffered(&self) {
		let _delivery = self.delivery.lock();
		let batch = self.buffer.drain_all();
		if batch.is_empty() {
			return;
		}
		self.batches_delivered.fetch_add(1, Ordering::Relaxed);
		self.entries_delivered.fetch_add(batch.len() as u64, Ordering::Relaxed);
		trace!(entries = batch.len(), "log_panel.flush");
		self.sink.deliver(batch);
	}
}

/// Coalesces appends from any thread into one sink delivery per window.
///
/// Idle until an append arrives; that append arms a single timer
/// (compare-and-set on the scheduled flag, so concurrent producers arm it
/// exactly once) and every append until the timer fires joins the same batch.
/// Cloning shares the same buffer and timer.
pub struct DebouncedFlush<T> {
	inner: Arc<Inner<T>>,
}

impl<T> Clone for DebouncedFlush<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> std::fmt::Debug for DebouncedFlush<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DebouncedFlush")
			.field("window", &self.inner.window)
			.field("scheduled", &self.is_scheduled())
			.field("buffered", &self.buffered())
			.finish()
	}
}

impl<T> DebouncedFlush<T> {
	/// Returns true while a flush timer is pending.
	pub fn is_scheduled(&self) -> bool {
		self.inner.scheduled.load(Ordering::Acquire)
	}

	/// Number of entries waiting for the next flush.
	pub fn buffered(&self) -> usize {
		self.inner.buffer.len()
	}

	/// Coalescing window.
	pub fn window(&self) -> Duration {
		self.inner.window
	}

	/// Snapshot of flush counters.
	pub fn stats(&self) -> FlushStats {
		FlushStats {
			timers_armed: self.inner.timers_armed.load(Ordering::Relaxed),
			batches_delivered: self.inner.batches_delivered.load(Ordering::Relaxed),
			entries_delivered: self.inner.entries_delivered.load(Ordering::Relaxed),
		}
	}
}

impl<T: Send + 'static> DebouncedFlush<T> {
	/// Creates an idle controller. Timers run on the runtime that is current
	/// at construction, or on the shared worker runtime.
	pub fn new(window: Duration, sink: impl BatchSink<T>) -> Self {
		Self {
			inner: Arc::new(Inner {
				buffer: BatchBuffer::new(),
				scheduled: AtomicBool::new(false),
				window,
				sink: Box::new(sink),
				delivery: Mutex::new(()),
				runtime: vellum_worker::runtime_handle(),
				shutdown: CancellationToken::new(),
				timers_armed: AtomicU64::new(0),
				batches_delivered: AtomicU64::new(0),
				entries_delivered: AtomicU64::new(0),
			}),
		}
	}

	/// Buffers `entry`, arming the flush timer if none is pending.
	///
	/// Never blocks beyond the buffer insertion and never fails.
	pub fn append(&self, entry: T) {
		self.inner.buffer.append(entry);
		if self
			.inner
			.scheduled
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			return;
		}

		self.inner.timers_armed.fetch_add(1, Ordering::Relaxed);
		let inner = Arc::clone(&self.inner);
		let _guard = self.inner.runtime.enter();
		spawn(TaskClass::Background, async move {
			tokio::select! {
				biased;
				_ = inner.shutdown.cancelled() => {}
				_ = tokio::time::sleep(inner.window) => {}
			}
			inner.timer_fired();
		});
	}

	/// Drains and delivers whatever is buffered right now.
	///
	/// A pending timer stays armed and keeps its deadline; entries appended
	/// after this call join its batch.
	pub fn flush_now(&self) {
		self.inner.deliver_buffered();
	}

	/// Flushes immediately and stops debouncing. The pending timer, if any,
	/// fires early and returns the controller to idle; later appends are
	/// delivered as soon as their timer task runs.
	pub fn shutdown(&self) {
		self.inner.shutdown.cancel();
		self.inner.deliver_buffered();
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Barrier;

	use pretty_assertions::assert_eq;

	use super::*;

	const WINDOW: Duration = Duration::from_secs(3);

	fn recording<T: Send + 'static>() -> (DebouncedFlush<T>, Arc<Mutex<Vec<Vec<T>>>>) {
		let batches = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&batches);
		let flush = DebouncedFlush::new(WINDOW, move |batch: Vec<T>| sink.lock().push(batch));
		(flush, batches)
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn appends_within_window_coalesce_into_one_batch() {
		let (flush, batches) = recording();

		flush.append("A");
		tokio::time::sleep(Duration::from_secs(1)).await;
		flush.append("B");
		assert!(flush.is_scheduled());
		assert!(batches.lock().is_empty());

		tokio::time::sleep(WINDOW).await;

		assert_eq!(*batches.lock(), vec![vec!["A", "B"]]);
		assert!(!flush.is_scheduled());
		assert_eq!(
			flush.stats(),
			FlushStats {
				timers_armed: 1,
				batches_delivered: 1,
				entries_delivered: 2,
			}
		);
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn append_after_flush_arms_a_new_window() {
		let (flush, batches) = recording();

		flush.append(1);
		tokio::time::sleep(WINDOW + Duration::from_millis(1)).await;
		flush.append(2);
		tokio::time::sleep(WINDOW + Duration::from_millis(1)).await;

		assert_eq!(*batches.lock(), vec![vec![1], vec![2]]);
		assert_eq!(flush.stats().timers_armed, 2);
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn concurrent_producers_arm_exactly_one_timer() {
		const PRODUCERS: usize = 8;
		const PER_PRODUCER: usize = 1_000;

		let (flush, batches) = recording();
		let barrier = Arc::new(Barrier::new(PRODUCERS));

		// Producers are plain threads; the paused runtime cannot advance while
		// this test thread blocks on the joins, so no flush can interleave.
		let producers: Vec<_> = (0..PRODUCERS)
			.map(|p| {
				let flush = flush.clone();
				let barrier = Arc::clone(&barrier);
				std::thread::spawn(move || {
					barrier.wait();
					for i in 0..PER_PRODUCER {
						flush.append((p, i));
					}
				})
			})
			.collect();
		for producer in producers {
			producer.join().expect("producer should not panic");
		}

		assert_eq!(flush.stats().timers_armed, 1);
		assert_eq!(flush.buffered(), PRODUCERS * PER_PRODUCER);

		tokio::time::sleep(WINDOW + Duration::from_millis(1)).await;

		let batches = batches.lock();
		assert_eq!(batches.len(), 1);
		assert_eq!(batches[0].len(), PRODUCERS * PER_PRODUCER);
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn shutdown_flushes_pending_batch() {
		let (flush, batches) = recording();
		flush.append("late");
		flush.shutdown();
		assert_eq!(*batches.lock(), vec![vec!["late"]]);
		assert!(flush.is_scheduled(), "the cancelled timer still owns the flag");

		// The cancelled timer runs at once, finds nothing, and goes idle.
		tokio::task::yield_now().await;
		assert!(!flush.is_scheduled());
		assert_eq!(flush.stats().batches_delivered, 1);
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn flush_now_leaves_pending_timer_in_charge() {
		let (flush, batches) = recording();

		flush.append(1);
		tokio::time::sleep(Duration::from_secs(1)).await;
		flush.flush_now();
		flush.append(2);
		assert_eq!(flush.stats().timers_armed, 1, "the pending timer must not be doubled");
		assert!(flush.is_scheduled());

		// The original timer fires at t=3 and carries entry 2.
		tokio::time::sleep(Duration::from_millis(2_001)).await;
		assert_eq!(*batches.lock(), vec![vec![1], vec![2]]);

		flush.append(3);
		assert_eq!(flush.stats().timers_armed, 2);

		// A full window must pass before entry 3 goes out.
		tokio::time::sleep(Duration::from_secs(1)).await;
		assert_eq!(batches.lock().len(), 2);
		tokio::time::sleep(Duration::from_millis(2_100)).await;
		assert_eq!(*batches.lock(), vec![vec![1], vec![2], vec![3]]);
		assert!(!flush.is_scheduled());
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn flush_now_skips_empty_batches() {
		let (flush, batches) = recording::<u8>();
		flush.flush_now();
		assert!(batches.lock().is_empty());
		assert_eq!(flush.stats(), FlushStats::default());
	}
}
