//! Domain identifiers (strongly-typed names).
//!
//! Queue names and task ids are both plain whitespace-free tokens on the wire,
//! so they share one generic implementation. The marker type `T` only exists
//! at compile time (`PhantomData`) and keeps a `TaskId` from being passed where
//! a `QueueName` is expected.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;

/// Marker trait for each identifier kind.
pub trait IdentMarker: Send + Sync + 'static {
    /// Human readable kind, used in error messages.
    fn kind() -> &'static str;
}

/// Generic string identifier.
///
/// Serialized as the bare string, so a `QueueName` works as a JSON map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ident<T: IdentMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdentMarker> Ident<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn kind() -> &'static str {
        T::kind()
    }
}

impl<T: IdentMarker> From<&str> for Ident<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdentMarker> From<String> for Ident<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdentMarker> Borrow<str> for Ident<T> {
    fn borrow(&self) -> &str {
        &self.value
    }
}

impl<T: IdentMarker> PartialEq<str> for Ident<T> {
    fn eq(&self, other: &str) -> bool {
        self.value == other
    }
}

impl<T: IdentMarker> PartialEq<&str> for Ident<T> {
    fn eq(&self, other: &&str) -> bool {
        self.value == *other
    }
}

impl<T: IdentMarker> fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

// ========================================
// Marker types
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Queue {}

impl IdentMarker for Queue {
    fn kind() -> &'static str {
        "queue"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdentMarker for Task {
    fn kind() -> &'static str {
        "task id"
    }
}

/// Name of a queue. Queues are created implicitly by the first ADD.
pub type QueueName = Ident<Queue>;

/// Identifier of a task, unique within its queue.
pub type TaskId = Ident<Task>;
