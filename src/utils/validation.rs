use chrono::Utc;
use std::path::Path;

/// Replaces every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_key_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Object store key for `original_name`, prefixed with the current time in
/// milliseconds.
///
/// Uniqueness is best-effort: the same name uploaded twice within one
/// millisecond yields the same key and the later PUT replaces the earlier one.
pub fn storage_key(original_name: &str) -> String {
    storage_key_at(Utc::now().timestamp_millis(), original_name)
}

pub fn storage_key_at(timestamp_millis: i64, original_name: &str) -> String {
    format!(
        "{}_{}",
        timestamp_millis,
        sanitize_key_component(original_name)
    )
}

/// Extension (with leading dot) to keep on the staged copy of an upload.
/// Empty when the name has none or it is not plain alphanumeric.
pub fn staged_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 16 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}
