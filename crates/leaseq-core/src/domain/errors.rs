//! Errors and their classification.
//!
//! Lookup misses (unknown queue, unknown id) are not errors: they surface as
//! `NONE` / `NO` replies. Everything here ends up as an `ERR` reply or, at
//! startup, as a fatal error.

use thiserror::Error;

/// A request that does not have the shape of any command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty request")]
    Empty,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("{command} expects {expected} field(s), got {got}")]
    Arity {
        command: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("invalid length: {0}")]
    InvalidLength(String),

    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    #[error("request exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Reading or writing the state snapshot failed.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("inconsistent snapshot: {0}")]
    Inconsistent(String),
}

/// Failure of a single broker request.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("persistence failed: {0}")]
    Persistence(#[from] SnapshotError),
}

/// Failure seen by a client talking to the broker.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    /// The broker answered with `ERR <message>`.
    #[error("broker rejected request: {0}")]
    Rejected(String),

    #[error("malformed reply: {0}")]
    MalformedReply(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_messages() {
        let err = ProtocolError::Arity {
            command: "GET",
            expected: 1,
            got: 2,
        };
        assert_eq!(err.to_string(), "GET expects 1 field(s), got 2");
        assert_eq!(
            ProtocolError::UnknownCommand("put".into()).to_string(),
            "unknown command: put"
        );
    }

    #[test]
    fn broker_error_keeps_protocol_message() {
        let err = BrokerError::from(ProtocolError::Empty);
        assert_eq!(err.to_string(), "empty request");
    }
}
