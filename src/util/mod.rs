//! Utility functions for common operations.
//!
//! - Atomic file writes for configuration
//! - Credential redaction for URLs shown in logs and messages

use std::io::{self, Write};
use std::path::Path;

use reqwest::Url;
use tempfile::NamedTempFile;

use crate::error::{KbrowseError, Result};

/// Atomically write content to a file.
///
/// The content goes to a temporary file in the same directory, is flushed,
/// and is then renamed over `path`. On failure the original file is left
/// untouched. Missing parent directories are created.
///
/// # Example
///
/// ```rust,no_run
/// use kbrowse_client::util::atomic_write;
///
/// atomic_write("config.toml", b"[server]\nbase_url = \"http://localhost:4000\"\n").unwrap();
/// ```
pub fn atomic_write(path: impl AsRef<Path>, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => {
            return Err(KbrowseError::io(
                format!("Cannot determine parent directory for: {}", path.display()),
                io::Error::new(io::ErrorKind::InvalidInput, "No parent directory"),
            ))
        }
    };

    if !parent.exists() {
        std::fs::create_dir_all(parent).map_err(|e| {
            KbrowseError::io(format!("Failed to create directory: {}", parent.display()), e)
        })?;
    }

    // Same directory as the target so the rename stays on one filesystem.
    let mut temp_file = NamedTempFile::new_in(parent).map_err(|e| {
        KbrowseError::io(
            format!("Failed to create temporary file in: {}", parent.display()),
            e,
        )
    })?;

    temp_file
        .write_all(content)
        .and_then(|()| temp_file.flush())
        .map_err(|e| {
            KbrowseError::io(
                format!("Failed to write temporary file for: {}", path.display()),
                e,
            )
        })?;

    temp_file.persist(path).map_err(|e| {
        KbrowseError::io(
            format!("Failed to atomically write file: {}", path.display()),
            e.error,
        )
    })?;

    Ok(())
}

/// Render a URL with any password replaced.
#[must_use]
pub fn redact_url(url: &Url) -> String {
    if url.password().is_none() {
        return url.to_string();
    }

    let mut redacted = url.clone();
    // Only fails for cannot-be-a-base URLs, which carry no password.
    let _ = redacted.set_password(Some("****"));
    redacted.to_string()
}
