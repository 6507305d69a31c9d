//! Handle traits for the two halves of an entry key.
//!
//! Handles are opaque to the registry: they are compared and hashed, never
//! inspected. The one exception is [`Producer::name`], which is written into
//! messages that do not name their producer.

use std::hash::Hash;

/// Identifies a message source (e.g. a linter instance).
pub trait Producer: Clone + Eq + Hash + Send + 'static {
    /// Display name stamped onto this producer's messages by `Message::fill`.
    fn name(&self) -> &str;
}

impl Producer for String {
    fn name(&self) -> &str {
        self
    }
}

impl Producer for &'static str {
    fn name(&self) -> &str {
        self
    }
}

/// Identifies the document a snapshot belongs to.
pub trait Scope: Clone + Eq + Hash + Send + 'static {}

impl<T> Scope for T where T: Clone + Eq + Hash + Send + 'static {}
