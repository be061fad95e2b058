//! Log Redaction Layer
//!
//! Scrubs provider API keys, bearer tokens and phone numbers from strings
//! prior to logging. Applied to upstream error bodies, prompts and tool
//! arguments.

use regex::Regex;
use std::sync::LazyLock;

static TELEPHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[-.\s]?)?\(?\b\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}\b").unwrap()
});
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9\-_]{20,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").unwrap()
});
static HEADER_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)("?(?:x-api-key|api_key|apikey)"?\s*[:=]\s*"?)[^"\s,}]+"#).unwrap()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = TELEPHONE_RE.replace_all(input, "[REDACTED_PHONE]");
    let redacted = API_KEY_RE.replace_all(&redacted, "[REDACTED_TOKEN]");
    HEADER_KEY_RE
        .replace_all(&redacted, "${1}[REDACTED_TOKEN]")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redaction() {
        let raw = "Sending to +1-555-123-4567 with Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("+1-555-123-4567"));
        assert!(!clean.contains("Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"));
    }

    #[test]
    fn test_provider_keys_redacted() {
        let body = r#"{"error": "invalid x-api-key", "api_key": "abc123secret", "hint": "sk-ant-REDACTED"}"#;
        let clean = redact_sensitive_data(body);
        assert!(!clean.contains("abc123secret"));
        assert!(!clean.contains("sk-ant-api03"));
        assert!(clean.contains("invalid x-api-key"));
    }

    #[test]
    fn test_canvas_coordinates_survive() {
        let args = r##"{"object_id": 42, "x": 120.5, "y": 300, "fill": "#4A90D9"}"##;
        assert_eq!(redact_sensitive_data(args), args);
    }
}
