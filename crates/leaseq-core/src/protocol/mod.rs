//! Line-oriented wire protocol: one request in, one reply out.

mod command;
mod reply;

pub use command::{Command, CommandKind};
pub use reply::Reply;
