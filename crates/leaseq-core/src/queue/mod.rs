//! Queue module: task store, lease tracker, and the state that binds them.

mod lease_tracker;
mod state;
mod store;

pub use lease_tracker::LeaseTracker;
pub use state::{QueueCounts, QueueState};
pub use store::TaskStore;
