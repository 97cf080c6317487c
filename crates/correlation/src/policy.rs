//! Staged waits on a pending handle.

use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::{CorrelationTable, PendingHandle, WaitError};

/// Default first stage: long enough for a warm engine to answer.
pub const DEFAULT_FIRST_STAGE: Duration = Duration::from_secs(5);
/// Default second stage: tolerates an engine that is still starting up.
pub const DEFAULT_SECOND_STAGE: Duration = Duration::from_secs(60);

/// Sequence of timeouts applied to one pending handle.
///
/// When a stage elapses the wait continues on the *same* handle with the next
/// stage's timeout; the underlying request is never re-issued. Once every stage
/// has elapsed the entry is evicted from the table, so a completion that
/// arrives afterwards is dropped by [`CorrelationTable::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationPolicy {
	stages: Vec<Duration>,
}

impl Default for EscalationPolicy {
	fn default() -> Self {
		Self::two_stage(DEFAULT_FIRST_STAGE, DEFAULT_SECOND_STAGE)
	}
}

impl EscalationPolicy {
	/// Short wait followed by one longer escalation.
	pub fn two_stage(first: Duration, second: Duration) -> Self {
		Self { stages: vec![first, second] }
	}

	/// Arbitrary stage list. An empty list times out immediately.
	pub fn from_stages(stages: impl IntoIterator<Item = Duration>) -> Self {
		Self {
			stages: stages.into_iter().collect(),
		}
	}

	/// Stage timeouts in order.
	pub fn stages(&self) -> &[Duration] {
		&self.stages
	}

	/// Upper bound on the time a caller can spend waiting.
	pub fn total(&self) -> Duration {
		self.stages.iter().sum()
	}

	/// Waits for `handle` under this policy, evicting its entry from `table`
	/// when every stage has elapsed.
	///
	/// The entry is also evicted if the returned future is dropped mid-wait.
	pub async fn wait<R>(&self, table: &CorrelationTable<R>, mut handle: PendingHandle<R>) -> Result<R, WaitError> {
		let id = handle.id();
		let _evict = EvictOnDrop { table, handle_id: id };

		for (stage, timeout) in self.stages.iter().enumerate() {
			match tokio::time::timeout(*timeout, &mut handle).await {
				Ok(result) => return result,
				Err(_) => {
					if stage + 1 < self.stages.len() {
						debug!(task_id = %id, stage, timeout_ms = timeout.as_millis() as u64, "correlation.wait.escalate");
					}
				}
			}
		}

		if let Some(value) = settle_expired(table, &mut handle) {
			return Ok(value);
		}
		let waited = self.total();
		warn!(task_id = %id, waited_ms = waited.as_millis() as u64, "correlation.wait.timed_out");
		Err(WaitError::TimedOut { id, waited })
	}
}

/// Evicts an expired task. Returns the result instead when it was resolved
/// between the last timeout and the eviction.
fn settle_expired<R>(table: &CorrelationTable<R>, handle: &mut PendingHandle<R>) -> Option<R> {
	if table.evict(handle.id()).is_some() {
		return None;
	}
	handle.try_take()
}

struct EvictOnDrop<'a, R> {
	table: &'a CorrelationTable<R>,
	handle_id: crate::TaskId,
}

impl<R> Drop for EvictOnDrop<'_, R> {
	fn drop(&mut self) {
		if let Some(task) = self.table.evict(self.handle_id) {
			trace!(task_id = %task.id(), "correlation.wait.cancelled");
		}
	}
}
