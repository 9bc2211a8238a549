//! Session settings persistence.
//!
//! The settings blob is whatever `/auth/settings/get` returned. It is stored
//! and loaded as opaque text and never parsed here.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::debug;

use crate::error::{ApiError, Result};

/// What `load` returns when nothing has been saved yet.
pub const EMPTY_SETTINGS: &str = "{}";

/// Read the settings file verbatim. A missing file reads as `"{}"`.
///
/// The blob is opaque but must be UTF-8, as `/auth/settings/get` returns
/// JSON text; any other content fails with `ApiError::File` (`InvalidData`).
pub fn load(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(content) => {
            debug!("loaded {} bytes of settings from {}", content.len(), path.display());
            Ok(content)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("no settings at {}", path.display());
            Ok(EMPTY_SETTINGS.to_string())
        }
        Err(source) => Err(ApiError::File {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Replace the settings file with `content`, byte for byte.
pub fn save(path: impl AsRef<Path>, content: &str) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, content).map_err(|source| ApiError::File {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("saved {} bytes of settings to {}", content.len(), path.display());
    Ok(())
}

/// True when `settings` holds no session: blank or the empty object.
pub fn is_empty(settings: &str) -> bool {
    let trimmed = settings.trim();
    trimmed.is_empty() || trimmed == EMPTY_SETTINGS
}
