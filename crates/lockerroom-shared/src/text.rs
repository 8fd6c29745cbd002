//! Message content rules.
//!
//! Lengths are counted in Unicode scalar values, not bytes.

use crate::constants::{ELLIPSIS, MAX_MESSAGE_CHARS, SUMMARY_PREVIEW_CHARS};
use crate::error::ValidationError;

/// Trim `raw` and check it against the content limits.
pub fn validate_content(raw: &str) -> Result<&str, ValidationError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(ValidationError::Empty);
    }
    let len = content.chars().count();
    if len > MAX_MESSAGE_CHARS {
        return Err(ValidationError::too_long(len));
    }
    Ok(content)
}

/// Thread preview for `content`: the first 30 characters, plus an ellipsis
/// marker when anything was cut.
pub fn summarize(content: &str) -> String {
    let mut chars = content.chars();
    let mut preview: String = chars.by_ref().take(SUMMARY_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        preview.push(ELLIPSIS);
    }
    preview
}
