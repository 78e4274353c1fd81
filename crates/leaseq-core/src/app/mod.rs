//! App - the broker and its TCP server.
//!
//! # Components
//! - **BrokerConfig**: process-wide settings
//! - **BrokerBuilder**: wiring of the ports, snapshot restore
//! - **Broker**: sweep, dispatch and persist for one request
//! - **Server**: accept loop and per-connection request handling

pub mod broker;
pub mod builder;
pub mod config;
pub mod server;

pub use self::broker::Broker;
pub use self::builder::BrokerBuilder;
pub use self::config::BrokerConfig;
pub use self::server::Server;
