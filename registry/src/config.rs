//! Loading registry settings from a TOML file.
//!
//! ```toml
//! [registry]
//! debounce_ms = 100
//! ```
//!
//! A missing file or a missing `[registry]` table means "use defaults";
//! malformed TOML or out-of-range values are errors.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use linthub_types::RegistrySettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    registry: Option<RegistrySettings>,
}

/// Load settings from `path`.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn load(path: &Path) -> Result<Option<RegistrySettings>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            tracing::warn!("Failed to read config at {}: {err}", path.display());
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: err,
            });
        }
    };

    match parse(&content) {
        Ok(settings) => Ok(Some(settings)),
        Err(err) => {
            tracing::warn!("Failed to parse config at {}: {err}", path.display());
            Err(ConfigError::Parse {
                path: path.to_path_buf(),
                source: err,
            })
        }
    }
}

/// Parse settings from an in-memory TOML document.
pub fn from_toml_str(content: &str) -> Result<RegistrySettings, toml::de::Error> {
    parse(content)
}

fn parse(content: &str) -> Result<RegistrySettings, toml::de::Error> {
    let file: ConfigFile = toml::from_str(content)?;
    Ok(file.registry.unwrap_or_default())
}
