//! Utility functions and helpers.

pub mod http;

/// Make a provider name safe to use as a file name.
///
/// Keeps ASCII letters, digits, `-`, `_` and `.`; everything else becomes `_`.
pub fn file_safe_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "provider".to_string()
    } else {
        cleaned.to_string()
    }
}
