//! Message registry for linthub.
//!
//! Producers push full snapshots of their messages per `(producer, scope)`;
//! the registry diffs each snapshot against what it last published for that
//! pair and, on a debounced cycle, broadcasts one coalesced [`Difference`]
//! to subscribers. Unchanged snapshots never produce a broadcast, and a
//! message that survives a snapshot change keeps its original `Arc`.

pub mod config;

pub(crate) mod debounce;
pub(crate) mod publisher;
pub(crate) mod store;

mod registry;

pub use config::ConfigError;
pub use linthub_types::{
    Difference, Location, Message, MessageKey, Position, Producer, Range, RegistrySettings,
    Scope, Severity,
};
pub use publisher::{Subscription, SubscriptionId};
pub use registry::MessageRegistry;
