//! Session keys for conversation history.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::error::ConversationError;
use crate::persona::PersonaId;

/// Longest accepted session key.
pub const MAX_SESSION_KEY_LEN: usize = 128;

/// Validated identifier of one history window.
///
/// Accepts 1..=128 characters from `[A-Za-z0-9_:.-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionKey(String);

impl SessionKey {
    /// Parse and validate a caller-supplied session identifier.
    pub fn parse(raw: &str) -> Result<Self, ConversationError> {
        if raw.is_empty() {
            return Err(ConversationError::InvalidSessionId(
                "session id is empty".to_string(),
            ));
        }
        if raw.len() > MAX_SESSION_KEY_LEN {
            return Err(ConversationError::InvalidSessionId(format!(
                "session id exceeds {MAX_SESSION_KEY_LEN} characters"
            )));
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.' | '-')))
        {
            return Err(ConversationError::InvalidSessionId(format!(
                "session id contains invalid character {bad:?}"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// The key used when history is scoped to a persona.
    ///
    /// Every user talking to the same persona shares this window.
    pub fn for_persona(id: &PersonaId) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionKey {
    type Err = ConversationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SessionKey {
    type Error = ConversationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionKey> for String {
    fn from(key: SessionKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_uuid_and_composite_keys() {
        let id = PersonaId::new();
        assert!(SessionKey::parse(&id.to_string()).is_ok());
        assert!(SessionKey::parse("user-42:persona.7").is_ok());
    }

    #[test]
    fn test_rejects_malformed_keys() {
        assert!(SessionKey::parse("").is_err());
        assert!(SessionKey::parse("has space").is_err());
        assert!(SessionKey::parse("slash/key").is_err());
        assert!(SessionKey::parse(&"a".repeat(MAX_SESSION_KEY_LEN + 1)).is_err());
        assert!(SessionKey::parse(&"a".repeat(MAX_SESSION_KEY_LEN)).is_ok());
    }

    #[test]
    fn test_for_persona_matches_id_text() {
        let id = PersonaId::new();
        assert_eq!(SessionKey::for_persona(&id).as_str(), id.to_string());
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<SessionKey>("\"ok-key\"").is_ok());
        assert!(serde_json::from_str::<SessionKey>("\"bad key\"").is_err());
    }
}
