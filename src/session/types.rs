use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Server-assigned session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(SessionId)
    }
}

/// Answer language for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    Hindi,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Hindi => "Hindi",
        }
    }

    /// Parse a user-supplied language name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "english" | "en" => Some(Self::English),
            "hindi" | "hi" => Some(Self::Hindi),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persistent conversation scoped to one subject/chapter/language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub subject: String,
    pub chapter: String,
    pub language: Language,
    pub title: String,
}

impl Session {
    /// Title used when the server did not assign one
    pub fn default_title(subject: &str, chapter: &str) -> String {
        format!("{} - {}", subject, chapter)
    }
}

/// Message identity: optimistic entries carry a local id that is never
/// rewritten to the server's id once the exchange is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    Local(u64),
    Remote(i64),
}

impl MessageId {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A session's metadata together with its full, ordered message history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDetail {
    pub session: Session,
    pub messages: Vec<Message>,
}

/// One entry of the subject catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub chapters: Vec<String>,
}

/// The resolved (subject, chapter, language) triple that creates a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub subject: String,
    pub chapter: String,
    pub language: Language,
}

/// Result of an operation whose completion may have been superseded by a
/// later request before it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Applied(T),
    Superseded,
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Superseded => None,
        }
    }
}
