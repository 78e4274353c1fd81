//! Domain model (ids, tasks, leases, errors).

pub mod errors;
pub mod ids;
pub mod lease;
pub mod task;

pub use self::errors::{BrokerError, ClientError, ProtocolError, SnapshotError};
pub use self::ids::{QueueName, TaskId};
pub use self::lease::Lease;
pub use self::task::{LeasedTask, Task};
