//! Dialog identifier handling
//!
//! A dialog is keyed by `call-id : local-tag : remote-tag`. The separator is
//! legal *inside* a Call-ID, so the key can never be split at fixed
//! positions; classification uses a token count and the tags are always the
//! trailing two tokens.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between key tokens. Also legal inside a Call-ID.
pub const KEY_SEPARATOR: char = ':';

/// Identifier of an established (tagged) dialog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DialogKey {
    pub call_id: String,
    pub local_tag: String,
    pub remote_tag: String,
}

impl DialogKey {
    pub fn new(
        call_id: impl Into<String>,
        local_tag: impl Into<String>,
        remote_tag: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            local_tag: local_tag.into(),
            remote_tag: remote_tag.into(),
        }
    }

    /// Whether a raw identifier encodes an established (tagged) dialog.
    ///
    /// Token-count heuristic: at least three separator-delimited tokens with
    /// both trailing tag tokens non-empty. `callid-with:colon:tagA:tagB`
    /// (four tokens, colon embedded in the Call-ID) is established.
    pub fn is_established(raw: &str) -> bool {
        let tokens: Vec<&str> = raw.split(KEY_SEPARATOR).collect();
        tokens.len() >= 3
            && !tokens[tokens.len() - 1].is_empty()
            && !tokens[tokens.len() - 2].is_empty()
    }

    /// Parse an established dialog key; the last two tokens are the tags,
    /// everything before them (colons included) is the Call-ID.
    pub fn parse(raw: &str) -> Option<Self> {
        if !Self::is_established(raw) {
            return None;
        }
        let tokens: Vec<&str> = raw.split(KEY_SEPARATOR).collect();
        let n = tokens.len();
        Some(Self {
            call_id: tokens[..n - 2].join(&KEY_SEPARATOR.to_string()),
            local_tag: tokens[n - 2].to_string(),
            remote_tag: tokens[n - 1].to_string(),
        })
    }
}

impl fmt::Display for DialogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.call_id,
            self.local_tag,
            self.remote_tag,
            sep = KEY_SEPARATOR
        )
    }
}

/// Table key for a dialog that is not yet confirmed (no remote tag).
pub fn early_key(call_id: &str, local_tag: Option<&str>) -> String {
    match local_tag {
        Some(tag) => format!("{}{}{}", call_id, KEY_SEPARATOR, tag),
        None => call_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_key_round_trip() {
        let key = DialogKey::parse("callid1:tagA:tagB").unwrap();
        assert_eq!(key.call_id, "callid1");
        assert_eq!(key.local_tag, "tagA");
        assert_eq!(key.remote_tag, "tagB");
        assert_eq!(key.to_string(), "callid1:tagA:tagB");
    }

    #[test]
    fn test_call_id_with_embedded_colon_is_established() {
        let raw = "callid-with:colon:tagA:tagB";
        assert!(DialogKey::is_established(raw));
        let key = DialogKey::parse(raw).unwrap();
        assert_eq!(key.call_id, "callid-with:colon");
        assert_eq!(key.local_tag, "tagA");
        assert_eq!(key.remote_tag, "tagB");
    }

    #[test]
    fn test_untagged_ids_are_not_established() {
        assert!(!DialogKey::is_established("callid1"));
        assert!(!DialogKey::is_established("callid1:tagA"));
        assert!(!DialogKey::is_established("callid1:tagA:"));
        assert!(DialogKey::parse("callid1:tagA").is_none());
    }

    #[test]
    fn test_early_key_forms() {
        assert_eq!(early_key("c1", Some("t1")), "c1:t1");
        assert_eq!(early_key("c1", None), "c1");
    }
}
