//! Filename and scratch-directory helpers
//!
//! Builds collision-resistant image filenames from user prompts and clears
//! stale files from the scratch directory.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use chrono::{DateTime, TimeZone};
use log::{debug, warn};
use std::io;
use std::path::Path;

// ============================================================================
// Constants
// ============================================================================

/// Longest filename stem derived from a prompt, in UTF-8 bytes.
///
/// Filesystems cap a name at 255 bytes; the stem leaves room for the
/// `_<timestamp>.png` suffix.
pub const MAX_STEM_BYTES: usize = 200;

/// Timestamp layout appended to every image filename (14 digits)
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Stem used when nothing usable survives sanitising
const FALLBACK_STEM: &str = "image";

// ============================================================================
// Filename utilities
// ============================================================================

/// Sanitize a prompt for use as a filename stem.
///
/// Spaces and path separators become underscores, as do control characters
/// and characters Windows refuses in filenames. Truncated to
/// [`MAX_STEM_BYTES`] bytes on a char boundary.
pub fn sanitize_prompt(prompt: &str) -> String {
    let mut stem = String::with_capacity(prompt.len().min(MAX_STEM_BYTES));
    for c in prompt.trim().chars() {
        let c = match c {
            ' ' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() || c.is_whitespace() => '_',
            c => c,
        };
        if stem.len() + c.len_utf8() > MAX_STEM_BYTES {
            break;
        }
        stem.push(c);
    }

    // "." and ".." would resolve to directories
    if stem.chars().all(|c| c == '.' || c == '_') {
        return FALLBACK_STEM.to_string();
    }
    stem
}

/// Build `<sanitized-prompt>_<YYYYMMDDHHMMSS>.png`
pub fn image_filename<Tz>(prompt: &str, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}_{}.png",
        sanitize_prompt(prompt),
        at.format(TIMESTAMP_FORMAT)
    )
}

// ============================================================================
// Cleanup
// ============================================================================

/// Delete every regular file directly inside `dir`.
///
/// Subdirectories are left alone. A missing directory counts as already
/// clean. Returns the number of files removed.
pub async fn sweep_dir(dir: &Path) -> io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to delete {}: {e}", path.display()),
        }
    }
    Ok(removed)
}

// ============================================================================
// Tests
// ============================================================================
