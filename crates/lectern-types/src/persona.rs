use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Unique identifier for a persona, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonaId(pub Uuid);

impl PersonaId {
    /// Create a new PersonaId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a PersonaId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for PersonaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PersonaId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A conversational identity the reading companion can role-play as.
///
/// The `kind` decides which `profile` fields matter. Fields that do not
/// apply to the kind are carried along untouched and never validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: PersonaId,
    /// Display name, used in the identity line of the system prompt.
    pub name: String,
    pub kind: PersonaKind,
    /// Free-text description appended after the identity line.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: PersonaConfig,
    #[serde(default)]
    pub profile: PersonaProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied persona fields for create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaDraft {
    pub name: String,
    #[serde(default)]
    pub kind: PersonaKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: PersonaConfig,
    #[serde(default)]
    pub profile: PersonaProfile,
}

/// Behavioural variant of a persona.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonaKind {
    /// A character from a book.
    Character,
    /// A reader with a profession and an interest.
    Reader,
    /// A historical figure from a given era.
    Historical,
    /// Any tag this build does not know about.
    #[serde(other)]
    #[default]
    Unspecified,
}

impl fmt::Display for PersonaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonaKind::Character => write!(f, "character"),
            PersonaKind::Reader => write!(f, "reader"),
            PersonaKind::Historical => write!(f, "historical"),
            PersonaKind::Unspecified => write!(f, "unspecified"),
        }
    }
}

impl FromStr for PersonaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "character" => Ok(PersonaKind::Character),
            "reader" => Ok(PersonaKind::Reader),
            "historical" => Ok(PersonaKind::Historical),
            "unspecified" => Ok(PersonaKind::Unspecified),
            other => Err(format!("invalid persona kind: '{other}'")),
        }
    }
}

/// Runtime switches for a persona.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Whether the model may call the internet search tool for this persona.
    #[serde(default)]
    pub enable_search: bool,
    /// Knowledge bases attached to the persona. Stored, not yet consulted.
    #[serde(default)]
    pub knowledge_base_ids: Vec<String>,
    /// Model override; falls back to the configured default model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Variant-specific profile data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaProfile {
    pub avatar: Option<String>,
    pub language: Option<String>,
    pub book_name: Option<String>,
    pub role_name: Option<String>,
    pub profession: Option<String>,
    pub interest: Option<String>,
    pub historical_era: Option<String>,
    pub bio: Option<String>,
    /// Free-text instruction appended verbatim at the end of the system prompt.
    pub custom_prompt: Option<String>,
}

/// Treat `None`, empty, and whitespace-only values alike.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}
