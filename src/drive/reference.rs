//! File id extraction from raw ids and sharing URLs.

use crate::error::ServerError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Compiled once at first use; the patterns are fixed.
static PATH_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/d/([A-Za-z0-9_-]+)")
        .unwrap_or_else(|e| panic!("Internal error: invalid path id pattern: {}", e))
});

static QUERY_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[?&]id=([A-Za-z0-9_-]+)")
        .unwrap_or_else(|e| panic!("Internal error: invalid query id pattern: {}", e))
});

static RAW_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+$")
        .unwrap_or_else(|e| panic!("Internal error: invalid raw id pattern: {}", e))
});

/// Accept a raw file id, a `.../d/<id>/...` URL or a `...?id=<id>` URL.
pub fn extract_file_id(reference: &str) -> Result<String, ServerError> {
    let reference = reference.trim();

    if RAW_ID_PATTERN.is_match(reference) {
        return Ok(reference.to_string());
    }

    for pattern in [&*PATH_ID_PATTERN, &*QUERY_ID_PATTERN] {
        if let Some(id) = pattern.captures(reference).and_then(|c| c.get(1)) {
            return Ok(id.as_str().to_string());
        }
    }

    Err(ServerError::InvalidObjectReference(reference.to_string()))
}
