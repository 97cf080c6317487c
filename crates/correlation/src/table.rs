//! Thread-safe table of pending tasks keyed by [`TaskId`].

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

use crate::{DuplicateIdError, TaskId, WaitError};

/// A registered task whose result slot has not been written yet.
///
/// Returned by [`CorrelationTable::evict`]; the table no longer knows about it.
/// Dropping it closes the slot, and a caller still waiting sees
/// [`WaitError::Abandoned`].
#[derive(Debug)]
pub struct PendingTask<R> {
	id: TaskId,
	_slot: oneshot::Sender<R>,
}

impl<R> PendingTask<R> {
	/// Returns the task id.
	pub fn id(&self) -> TaskId {
		self.id
	}
}

/// Caller-side handle to a pending task's result slot.
///
/// Resolves to the delivered value, or to [`WaitError::Abandoned`] if the slot
/// is dropped unresolved. Polling through `&mut` is allowed, so one handle can
/// be waited on repeatedly with different timeouts.
#[derive(Debug)]
pub struct PendingHandle<R> {
	id: TaskId,
	rx: oneshot::Receiver<R>,
}

impl<R> PendingHandle<R> {
	/// Returns the task id.
	pub fn id(&self) -> TaskId {
		self.id
	}

	/// Takes the value if it has already been delivered.
	pub fn try_take(&mut self) -> Option<R> {
		self.rx.try_recv().ok()
	}
}

impl<R> Future for PendingHandle<R> {
	type Output = Result<R, WaitError>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let id = self.id;
		Pin::new(&mut self.rx).poll(cx).map(|res| res.map_err(|_| WaitError::Abandoned { id }))
	}
}

/// Concurrent map from task id to pending result slot.
///
/// Every operation takes the internal lock for the map access only; the lock
/// is released before a slot is written, and never held while anyone waits.
/// An entry leaves the table exactly once, through either
/// [`resolve`](Self::resolve) or [`evict`](Self::evict), so no task is ever
/// resolved twice.
pub struct CorrelationTable<R> {
	pending: Mutex<HashMap<TaskId, oneshot::Sender<R>>>,
}

impl<R> Default for CorrelationTable<R> {
	fn default() -> Self {
		Self::new()
	}
}

impl<R> std::fmt::Debug for CorrelationTable<R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CorrelationTable").field("pending", &self.len()).finish()
	}
}

impl<R> CorrelationTable<R> {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self {
			pending: Mutex::new(HashMap::new()),
		}
	}

	/// Registers `id` and returns the caller-side handle for its result.
	pub fn register(&self, id: TaskId) -> Result<PendingHandle<R>, DuplicateIdError> {
		let (tx, rx) = oneshot::channel();
		match self.pending.lock().entry(id) {
			Entry::Occupied(_) => return Err(DuplicateIdError(id)),
			Entry::Vacant(slot) => {
				slot.insert(tx);
			}
		}
		trace!(task_id = %id, "correlation.register");
		Ok(PendingHandle { id, rx })
	}

	/// Registers a freshly generated id.
	pub fn register_new(&self) -> Result<PendingHandle<R>, DuplicateIdError> {
		self.register(TaskId::new())
	}

	/// Completes and removes the entry for `id`.
	///
	/// Unknown ids (never registered, already resolved, or evicted) are a
	/// silent no-op. Returns true only when a waiting caller received `value`.
	pub fn resolve(&self, id: TaskId, value: R) -> bool {
		let Some(slot) = self.pending.lock().remove(&id) else {
			trace!(task_id = %id, "correlation.resolve.unknown");
			return false;
		};
		let delivered = slot.send(value).is_ok();
		trace!(task_id = %id, delivered, "correlation.resolve");
		delivered
	}

	/// Removes the entry for `id` without resolving it.
	pub fn evict(&self, id: TaskId) -> Option<PendingTask<R>> {
		let slot = self.pending.lock().remove(&id)?;
		trace!(task_id = %id, "correlation.evict");
		Some(PendingTask { id, _slot: slot })
	}

	/// Returns true while `id` is pending.
	pub fn contains(&self, id: TaskId) -> bool {
		self.pending.lock().contains_key(&id)
	}

	/// Number of pending entries.
	pub fn len(&self) -> usize {
		self.pending.lock().len()
	}

	/// Returns true when nothing is pending.
	pub fn is_empty(&self) -> bool {
		self.pending.lock().is_empty()
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;

	#[test]
	fn resolve_delivers_once_and_removes() {
		let table = CorrelationTable::new();
		let mut handle = table.register_new().expect("fresh id");
		let id = handle.id();

		assert!(table.resolve(id, "first"));
		assert!(!table.contains(id));
		assert!(!table.resolve(id, "second"), "second completion must be a no-op");
		assert_eq!(handle.try_take(), Some("first"));
	}

	#[test]
	fn resolve_unknown_id_is_noop() {
		let table: CorrelationTable<u32> = CorrelationTable::new();
		let _held = table.register_new().expect("fresh id");
		assert!(!table.resolve(TaskId::new(), 1));
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn duplicate_registration_is_rejected() {
		let table: CorrelationTable<u32> = CorrelationTable::new();
		let id = TaskId::new();
		let _first = table.register(id).expect("first registration");
		assert_eq!(table.register(id).unwrap_err(), DuplicateIdError(id));
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn evicted_task_ignores_late_resolve() {
		let table = CorrelationTable::new();
		let mut handle = table.register_new().expect("fresh id");
		let id = handle.id();

		let task = table.evict(id).expect("entry should be pending");
		assert_eq!(task.id(), id);
		assert!(!table.resolve(id, 5));
		assert!(table.is_empty());
		assert_eq!(handle.try_take(), None);
	}

	#[tokio::test]
	async fn dropped_slot_abandons_handle() {
		let table: CorrelationTable<u32> = CorrelationTable::new();
		let handle = table.register_new().expect("fresh id");
		let id = handle.id();
		drop(table.evict(id));
		assert_eq!(handle.await, Err(WaitError::Abandoned { id }));
	}

	#[test]
	fn resolve_after_caller_left_reports_undelivered() {
		let table = CorrelationTable::new();
		let handle = table.register_new().expect("fresh id");
		let id = handle.id();
		drop(handle);
		assert!(!table.resolve(id, 1));
		assert!(table.is_empty());
	}

	#[derive(Debug, Clone)]
	enum Op {
		Register(usize),
		Resolve(usize, u32),
		Evict(usize),
	}

	fn op() -> impl Strategy<Value = Op> {
		prop_oneof![
			(0..6usize).prop_map(Op::Register),
			(0..6usize, any::<u32>()).prop_map(|(slot, v)| Op::Resolve(slot, v)),
			(0..6usize).prop_map(Op::Evict),
		]
	}

	proptest! {
		#[test]
		fn no_task_is_resolved_twice(ops in proptest::collection::vec(op(), 1..64)) {
			let table = CorrelationTable::new();
			let ids: Vec<TaskId> = (0..6).map(|_| TaskId::new()).collect();
			let mut handles: Vec<Vec<PendingHandle<u32>>> = (0..6).map(|_| Vec::new()).collect();
			let mut live = [false; 6];
			let mut deliveries = [0usize; 6];
			let mut registrations = [0usize; 6];

			for op in ops {
				match op {
					Op::Register(slot) => {
						let result = table.register(ids[slot]);
						prop_assert_eq!(result.is_ok(), !live[slot]);
						if let Ok(handle) = result {
							handles[slot].push(handle);
							registrations[slot] += 1;
							live[slot] = true;
						}
					}
					Op::Resolve(slot, value) => {
						let before = table.len();
						let delivered = table.resolve(ids[slot], value);
						prop_assert_eq!(delivered, live[slot]);
						if live[slot] {
							deliveries[slot] += 1;
							prop_assert_eq!(table.len(), before - 1);
						} else {
							prop_assert_eq!(table.len(), before);
						}
						live[slot] = false;
					}
					Op::Evict(slot) => {
						prop_assert_eq!(table.evict(ids[slot]).is_some(), live[slot]);
						live[slot] = false;
					}
				}
				prop_assert_eq!(table.len(), live.iter().filter(|l| **l).count());
			}

			for slot in 0..6 {
				let received = handles[slot].iter_mut().filter_map(|h| h.try_take()).count();
				prop_assert_eq!(received, deliveries[slot]);
				prop_assert!(deliveries[slot] <= registrations[slot]);
			}
		}
	}
}
