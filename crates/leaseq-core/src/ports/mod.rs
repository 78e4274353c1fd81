//! Ports - traits at the seams of the broker.
//!
//! Time, id generation and durable storage are reached only through these
//! traits, so tests can swap in deterministic implementations.

pub mod clock;
pub mod id_generator;
pub mod snapshot_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, RandomIdGenerator, TASK_ID_LEN, WIDE_TASK_ID_LEN};
pub use self::snapshot_store::SnapshotStore;
