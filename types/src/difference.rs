//! The unit published to subscribers after a recompute.

use std::sync::Arc;

use crate::message::Message;

/// Change set since the previous broadcast, plus the full current state.
///
/// Messages are shared: a message that survives across recomputes is the same
/// `Arc` allocation in every difference that carries it. A difference is
/// immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Difference {
    added: Vec<Arc<Message>>,
    removed: Vec<Arc<Message>>,
    current: Vec<Arc<Message>>,
}

impl Difference {
    #[must_use]
    pub fn new(
        added: Vec<Arc<Message>>,
        removed: Vec<Arc<Message>>,
        current: Vec<Arc<Message>>,
    ) -> Self {
        Self {
            added,
            removed,
            current,
        }
    }

    #[must_use]
    pub fn added(&self) -> &[Arc<Message>] {
        &self.added
    }

    #[must_use]
    pub fn removed(&self) -> &[Arc<Message>] {
        &self.removed
    }

    /// Every message published across all tracked entries.
    #[must_use]
    pub fn current(&self) -> &[Arc<Message>] {
        &self.current
    }

    /// Whether anything was added or removed. A difference without changes
    /// is never broadcast.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}
