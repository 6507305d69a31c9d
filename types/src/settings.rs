//! Resolved registry settings.
//!
//! Raw deserialization input is validated at the parse boundary; an existing
//! [`RegistrySettings`] is always usable as-is.

use std::time::Duration;

use serde::Deserialize;

/// Quiescence window used when nothing is configured.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Upper bound on the quiescence window.
pub const MAX_DEBOUNCE_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("debounce_ms must be greater than zero")]
    ZeroDebounce,
    #[error("debounce_ms must be at most {max}, got {0}", max = MAX_DEBOUNCE_MS)]
    DebounceTooLong(u64),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRegistrySettings {
    #[serde(default = "default_debounce_ms")]
    debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

/// Validated registry settings.
///
/// Invariant: `0 < debounce_ms <= MAX_DEBOUNCE_MS` (enforced via
/// `#[serde(try_from)]` at the deserialization boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRegistrySettings")]
pub struct RegistrySettings {
    debounce_ms: u64,
}

impl TryFrom<RawRegistrySettings> for RegistrySettings {
    type Error = SettingsError;

    fn try_from(raw: RawRegistrySettings) -> Result<Self, Self::Error> {
        Self::new(raw.debounce_ms)
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl RegistrySettings {
    pub fn new(debounce_ms: u64) -> Result<Self, SettingsError> {
        if debounce_ms == 0 {
            return Err(SettingsError::ZeroDebounce);
        }
        if debounce_ms > MAX_DEBOUNCE_MS {
            return Err(SettingsError::DebounceTooLong(debounce_ms));
        }
        Ok(Self { debounce_ms })
    }

    #[must_use]
    pub fn debounce_ms(&self) -> u64 {
        self.debounce_ms
    }

    /// The debounce quiescence window.
    #[must_use]
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
