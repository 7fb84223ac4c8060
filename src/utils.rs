//! Small helpers for file naming, log output and the download directory.

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::fs;
use tracing::{info, instrument};

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[/\\]").unwrap());

/// Make an edition or caderno label safe to embed in a file name.
///
/// Spaces become `_`, path separators become `-`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_label("Nº 123/2024"), "Nº_123-2024");
/// ```
pub fn sanitize_label(label: &str) -> String {
    SEPARATORS.replace_all(label, "-").replace(' ', "_")
}

/// Deterministic local name for a downloaded artifact:
/// `<PREFIX>_<YYYY-MM-DD>_<label>.<ext>`.
pub fn artifact_file_name(prefix: &str, date: NaiveDate, label: &str, extension: &str) -> String {
    format!(
        "{}_{}_{}.{}",
        prefix,
        date.format("%Y-%m-%d"),
        sanitize_label(label),
        extension
    )
}

/// Truncate a string for logging purposes.
///
/// Cuts at a character boundary at or below `max` bytes and appends the
/// number of bytes dropped.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Download directory is writable");
    Ok(())
}
