// Request/response bodies of the backend (JSON over HTTP)

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::session::{
    Language, Message, MessageId, MessageRole, Session, SessionDetail, SessionId, UserRole,
};

#[derive(Debug, Serialize)]
pub(crate) struct LoginBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateSessionBody<'a> {
    pub subject: &'a str,
    pub chapter: &'a str,
    pub language: Language,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageBody<'a> {
    pub role: MessageRole,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerBody {
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionRecord {
    pub id: i64,
    pub subject: String,
    pub chapter: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageRecord {
    pub id: i64,
    pub role: MessageRole,
    pub content: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn into_session(self) -> Session {
        self.split().0
    }

    pub fn into_detail(self) -> SessionDetail {
        let (session, messages) = self.split();
        SessionDetail { session, messages }
    }

    fn split(self) -> (Session, Vec<Message>) {
        let language = self
            .language
            .as_deref()
            .and_then(Language::from_name)
            .unwrap_or_default();
        let title = match self.title {
            Some(title) if !title.trim().is_empty() => title,
            _ => Session::default_title(&self.subject, &self.chapter),
        };
        let session = Session {
            id: SessionId(self.id),
            subject: self.subject,
            chapter: self.chapter,
            language,
            title,
        };
        let messages = self
            .messages
            .into_iter()
            .map(|record| Message {
                id: MessageId::Remote(record.id),
                role: record.role,
                content: record.content,
                created_at: record.created_at,
            })
            .collect();
        (session, messages)
    }
}

/// Accepts RFC 3339 timestamps and offset-less ones (treated as UTC)
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}
