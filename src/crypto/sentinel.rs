//! Reference sentinels.
//!
//! An encrypted cookie keeps a placeholder value of the form
//! `__cg_enc_ref:<b64 domain>:<b64 name>` (URL-safe base64, no padding).
//! It names the envelope but carries none of the plaintext.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

pub const SENTINEL_PREFIX: &str = "__cg_enc_ref:";

pub fn encode(domain: &str, name: &str) -> String {
    format!(
        "{}{}:{}",
        SENTINEL_PREFIX,
        URL_SAFE_NO_PAD.encode(domain),
        URL_SAFE_NO_PAD.encode(name)
    )
}

pub fn is_sentinel(value: &str) -> bool {
    value.starts_with(SENTINEL_PREFIX)
}

/// Recover `(domain, name)` from a sentinel.
pub fn parse(value: &str) -> Option<(String, String)> {
    let rest = value.strip_prefix(SENTINEL_PREFIX)?;
    let (domain, name) = rest.split_once(':')?;
    let domain = String::from_utf8(URL_SAFE_NO_PAD.decode(domain).ok()?).ok()?;
    let name = String::from_utf8(URL_SAFE_NO_PAD.decode(name).ok()?).ok()?;
    Some((domain, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_parse() {
        let value = encode(".mybank.com", "sess:id");
        assert!(is_sentinel(&value));
        assert!(!value.contains("mybank"));
        assert_eq!(
            parse(&value),
            Some((".mybank.com".to_string(), "sess:id".to_string()))
        );
    }

    #[test]
    fn test_plain_values_are_not_sentinels() {
        assert!(!is_sentinel("abc"));
        assert_eq!(parse("abc"), None);
        assert_eq!(parse("__cg_enc_ref:%%%:x"), None);
    }
}
