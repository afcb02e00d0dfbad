//! Best-effort recovery of a JSON object from language-model output.

use serde_json::{Map, Value as JsonValue};

use crate::error::ProxyError;

/// Extracts a JSON object from `text`.
///
/// Tries, in order: the text as-is, the text with markdown code fences
/// removed, and the substring between the outermost `{` and `}`.
///
/// # Errors
///
/// Returns [`ProxyError::InvalidAiResponse`] if no attempt yields an object.
pub fn extract_json_object(text: &str) -> Result<Map<String, JsonValue>, ProxyError> {
    let trimmed = text.trim();

    let candidates = [
        Some(trimmed),
        strip_code_fences(trimmed),
        outermost_braces(trimmed),
    ];

    for candidate in candidates.into_iter().flatten() {
        if let Ok(JsonValue::Object(object)) = serde_json::from_str::<JsonValue>(candidate) {
            return Ok(object);
        }
    }

    Err(ProxyError::InvalidAiResponse {
        reason: format!("no JSON object in {} bytes of output", text.len()),
    })
}

/// Returns the body of the first fenced block, dropping a language tag.
fn strip_code_fences(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
    let body = &after_fence[body_start..];
    let end = body.find("```").unwrap_or(body.len());
    Some(body[..end].trim())
}

fn outermost_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
