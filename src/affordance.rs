//! Input affordances derived from session flags.
//!
//! Pure functions only: what the front end may enable, where it shows a busy
//! indicator, and what the "current file" line says.

use serde::Serialize;

/// Control state for the input bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Affordances {
    pub send_enabled: bool,
    pub upload_enabled: bool,
    /// Spinner on the send and upload controls.
    pub send_busy: bool,
    /// Spinner on the current-file line.
    pub file_busy: bool,
}

pub fn derive(loading: bool, processing: bool, input: &str) -> Affordances {
    Affordances {
        send_enabled: !loading && !input.trim().is_empty(),
        upload_enabled: !loading,
        send_busy: loading,
        file_busy: processing,
    }
}

/// The "current file" line of the upload menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "name", rename_all = "snake_case")]
pub enum FileStatus {
    NoFile,
    Processing,
    Ready(String),
    Error,
}

pub fn file_status(
    selected: Option<&str>,
    processing: bool,
    validated: bool,
    max_name_len: usize,
) -> FileStatus {
    match selected {
        None => FileStatus::NoFile,
        Some(_) if processing => FileStatus::Processing,
        Some(name) if validated => FileStatus::Ready(display_file_name(name, max_name_len)),
        Some(_) => FileStatus::Error,
    }
}

/// Shorten `name` to `max_len` characters followed by `...`.
pub fn display_file_name(name: &str, max_len: usize) -> String {
    if name.chars().count() > max_len {
        let head: String = name.chars().take(max_len).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}
