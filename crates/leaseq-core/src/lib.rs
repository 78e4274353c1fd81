//! leaseq-core
//!
//! Core building blocks of the leaseq task broker.
//!
//! # Modules
//! - **domain**: ids, tasks, leases, errors
//! - **ports**: Clock, IdGenerator, SnapshotStore
//! - **queue**: TaskStore, LeaseTracker, QueueState
//! - **protocol**: Command parsing and Reply encoding
//! - **impls**: JSON file and in-memory snapshot stores
//! - **app**: Broker, BrokerBuilder, Server, BrokerConfig
//! - **client**: async client for the wire protocol

pub mod app;
pub mod client;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod protocol;
pub mod queue;

pub use app::{Broker, BrokerBuilder, BrokerConfig, Server};
pub use client::Client;
pub use domain::{BrokerError, ClientError, LeasedTask, QueueName, TaskId};
