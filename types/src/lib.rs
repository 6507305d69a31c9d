//! Core domain types for linthub.
//!
//! This crate contains pure domain types with no IO and no async: the
//! messages producers push, the differences subscribers receive, the handle
//! traits that key tracked entries, and validated settings.

mod difference;
mod handle;
mod message;
mod settings;

pub use difference::Difference;
pub use handle::{Producer, Scope};
pub use message::{Location, Message, MessageKey, Position, Range, Severity};
pub use settings::{DEFAULT_DEBOUNCE_MS, MAX_DEBOUNCE_MS, RegistrySettings, SettingsError};
