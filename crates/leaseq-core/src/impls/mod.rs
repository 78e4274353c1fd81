//! Impls - implementations of the ports.
//!
//! # Included
//! - **JsonFileSnapshotStore**: production snapshot file
//! - **InMemorySnapshotStore**: tests and embedding

pub mod inmem_snapshot;
pub mod json_file_store;

pub use self::inmem_snapshot::InMemorySnapshotStore;
pub use self::json_file_store::JsonFileSnapshotStore;
