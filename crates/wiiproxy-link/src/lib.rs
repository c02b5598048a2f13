//! One physical MSP link shared by many callers.
//!
//! Callers submit requests to a [`Link`] (or a cloned [`LinkHandle`]) and get
//! a [`Completion`] back. A single worker thread owns the transport, takes
//! the highest-priority eligible request, sends it, reads and decodes the
//! reply, publishes it to the [`SnapshotStore`] and resolves the completion.
//! Only one request per command code is ever in flight.

pub mod config;
pub mod error;
pub mod link;
pub mod request;
pub mod scheduler;
pub mod snapshot;
pub mod worker;

pub use config::LinkConfig;
pub use error::{LinkError, Result};
pub use link::{Link, LinkHandle};
pub use request::{Completion, Priority, Request, RequestId};
pub use scheduler::Scheduler;
pub use snapshot::{SnapshotEntry, SnapshotStore};
pub use worker::{LinkStats, WorkerState};
