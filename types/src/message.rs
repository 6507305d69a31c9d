//! Diagnostic messages pushed by producers.
//!
//! A [`Message`] is what a producer (a linter, a language server, a build
//! step) reports. Two of its fields are completed lazily by the registry when
//! the message is first published: the producer name (defaulted from the
//! producer handle) and the identity key.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Severity level for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// 0-indexed line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Where a message points: a file and a range within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub range: Range,
}

impl Location {
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, range: Range) -> Self {
        Self {
            file: file.into(),
            range,
        }
    }
}

/// Deterministic content fingerprint of a message (lowercase SHA-256 hex).
///
/// Equal content always yields an equal key; the registry uses it to match
/// "the same" message across two snapshots of one producer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageKey(String);

impl MessageKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single diagnostic reported by a producer.
///
/// Content fields are private and set at construction. The producer name and
/// the identity key are filled in by [`Message::fill`] when the message is
/// first published; a key is never accepted from the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    severity: Severity,
    excerpt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    producer_name: Option<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    key: Option<MessageKey>,
}

impl Message {
    #[must_use]
    pub fn new(severity: Severity, excerpt: impl Into<String>) -> Self {
        Self {
            severity,
            excerpt: excerpt.into(),
            location: None,
            description: None,
            url: None,
            producer_name: None,
            key: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attribute the message to a named producer explicitly. Without this,
    /// [`Message::fill`] uses the name of the producer that pushed it.
    #[must_use]
    pub fn with_producer_name(mut self, name: impl Into<String>) -> Self {
        self.producer_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn excerpt(&self) -> &str {
        &self.excerpt
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        self.location.as_ref().map(|l| l.file.as_path())
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    #[must_use]
    pub fn producer_name(&self) -> Option<&str> {
        self.producer_name.as_deref()
    }

    /// The identity key, once assigned by [`Message::fill`].
    #[must_use]
    pub fn key(&self) -> Option<&MessageKey> {
        self.key.as_ref()
    }

    /// Compute the identity key from the current content.
    ///
    /// Pure: does not read or write the assigned key. Every field is length
    /// prefixed so adjacent fields cannot bleed into each other.
    #[must_use]
    pub fn identity(&self) -> MessageKey {
        let mut hasher = Sha256::new();
        hash_field(&mut hasher, self.producer_name.as_deref().unwrap_or(""));
        hash_field(&mut hasher, self.severity.label());
        hash_field(&mut hasher, &self.excerpt);
        hash_field(&mut hasher, self.description.as_deref().unwrap_or(""));
        hash_field(&mut hasher, self.url.as_deref().unwrap_or(""));
        match &self.location {
            Some(location) => {
                hash_bytes(&mut hasher, location.file.as_os_str().as_encoded_bytes());
                let Range { start, end } = location.range;
                for n in [start.line, start.column, end.line, end.column] {
                    hasher.update(n.to_le_bytes());
                }
            }
            None => hasher.update([0u8]),
        }
        MessageKey(format!("{:x}", hasher.finalize()))
    }

    /// Complete the message for publication.
    ///
    /// Defaults the producer name, then assigns the identity key if none is
    /// assigned yet. Calling it again on the same message changes nothing.
    pub fn fill(&mut self, producer_name: &str) -> &MessageKey {
        if self.producer_name.is_none() {
            self.producer_name = Some(producer_name.to_string());
        }
        let key = match self.key.take() {
            Some(key) => key,
            None => self.identity(),
        };
        self.key.insert(key)
    }

    /// Format as `file:line:col: severity: [producer] excerpt` (1-indexed for display).
    #[must_use]
    pub fn display(&self) -> String {
        let producer = self.producer_name.as_deref().unwrap_or("unknown");
        match &self.location {
            Some(location) => format!(
                "{}:{}:{}: {}: [{producer}] {}",
                location.file.display(),
                location.range.start.line + 1,
                location.range.start.column + 1,
                self.severity.label(),
                self.excerpt,
            ),
            None => format!("{}: [{producer}] {}", self.severity.label(), self.excerpt),
        }
    }
}

fn hash_field(hasher: &mut Sha256, value: &str) {
    hash_bytes(hasher, value.as_bytes());
}

fn hash_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
