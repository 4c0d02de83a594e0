//! Log Redaction Layer
//!
//! Scrubs API keys, access tokens, and phone numbers from strings prior to
//! logging. Provider error bodies echo request data back, so they always pass
//! through here.

use regex::Regex;
use once_cell::sync::Lazy;

static TELEPHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap()
});
static API_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(sk-[a-zA-Z0-9_\-]{20,})|(hf_[a-zA-Z0-9]{20,})|(AIza[0-9A-Za-z_\-]{30,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)",
    )
    .unwrap()
});
static KEY_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([?&](?:key|api_key|token)=)[^&\s]+").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = TELEPHONE_RE.replace_all(input, "[REDACTED_PHONE]");
    let redacted = API_KEY_RE.replace_all(&redacted, "[REDACTED_TOKEN]");
    KEY_PARAM_RE.replace_all(&redacted, "${1}[REDACTED_TOKEN]").into_owned()
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
    fn provider_keys_are_scrubbed() {
        let raw = "bad token hf_abcdefghijklmnopqrstuvwx for https://x/api?key=secret123&alt=json";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("hf_abcdefghijklmnopqrstuvwx"));
        assert!(!clean.contains("secret123"));
        assert!(clean.contains("?key=[REDACTED_TOKEN]&alt=json"));
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(redact_sensitive_data("model is loading"), "model is loading");
    }
}
