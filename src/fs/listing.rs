//! Validation of the file listing returned by the server.

use serde_json::Value;
use tracing::warn;

use crate::fs::node::FileEntry;

/// Keep only well-formed listing entries, in server order.
///
/// An entry survives if it is an object with a non-blank `name` and a
/// non-empty `size_display`. Everything else is dropped.
pub fn filter_listing(raw: Vec<Value>) -> Vec<FileEntry> {
    let total = raw.len();
    let files: Vec<FileEntry> = raw.into_iter().filter_map(parse_entry).collect();
    if files.len() != total {
        warn!(dropped = total - files.len(), "ignored malformed listing entries");
    }
    files
}

fn parse_entry(value: Value) -> Option<FileEntry> {
    let obj = value.as_object()?;
    let name = obj.get("name")?.as_str()?;
    let size_display = obj.get("size_display")?.as_str()?;
    if name.trim().is_empty() || size_display.is_empty() {
        return None;
    }
    let modified_display = obj
        .get("modified_display")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    Some(FileEntry {
        name: name.to_string(),
        size_display: size_display.to_string(),
        modified_display,
    })
}
