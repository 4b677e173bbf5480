//! =============================================================================
//! Utility Helpers
//! =============================================================================
//!
//! URI to path conversion and range builders shared by the diagnostic parser
//! and the code action engine.

use std::path::Path;

use lsp_types::{Position, Range};
use url::Url;

pub fn uri_to_file_path(uri: &str) -> Option<String> {
    let parsed = Url::parse(uri).ok()?;
    parsed
        .to_file_path()
        .ok()
        .map(|p| p.to_string_lossy().into_owned())
}

/// Rewrites a document URI into the path convention MetaEditor prints in its
/// log: percent-decoded, relative to `cwd`, without a leading separator.
pub fn compiler_target_path(uri: &str, cwd: &Path) -> String {
    let path = uri_to_file_path(uri)
        .unwrap_or_else(|| uri.strip_prefix("file://").unwrap_or(uri).to_string());
    let cwd = cwd.to_string_lossy();
    let relative = if cwd.is_empty() {
        path.as_str()
    } else {
        path.strip_prefix(&*cwd).unwrap_or(&path)
    };
    relative
        .strip_prefix(['/', '\\'])
        .unwrap_or(relative)
        .to_string()
}

/// Length of `text` in UTF-16 code units, the unit LSP columns are counted in.
pub fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count() as u32
}

/// Single-line range on `line` spanning `start..end`.
pub fn line_range(line: u32, start: u32, end: u32) -> Range {
    Range {
        start: Position {
            line,
            character: start,
        },
        end: Position {
            line,
            character: end,
        },
    }
}
