//! Request/response correlation for completions that arrive out of band.
//!
//! A caller registers a fresh [`TaskId`] in a [`CorrelationTable`], hands the
//! id to some foreign context, and later waits on the returned
//! [`PendingHandle`]. Whatever delivers the completion only knows the id and
//! calls [`CorrelationTable::resolve`].
//!
//! * [`CorrelationTable`]: atomic register/resolve/evict over pending slots
//! * [`EscalationPolicy`]: staged wait that re-waits on the same handle
//! * [`TaskId`]: opaque, collision-free task identifier

#![warn(missing_docs)]

pub mod error;
pub mod id;
pub mod policy;
pub mod table;

pub use error::{DuplicateIdError, WaitError};
pub use id::{ParseTaskIdError, TaskId};
pub use policy::EscalationPolicy;
pub use table::{CorrelationTable, PendingHandle, PendingTask};
