use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Main error type for edubot
///
/// Every variant is scoped to a single interaction: nothing here is fatal to
/// the process. The type is `Clone` so the controller can keep the last
/// failure around as a retrievable banner while also returning it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Missing, expired or rejected credential. Routes to sign-out.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The backend rejected the input (unknown subject/chapter, bad payload).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The addressed session no longer exists for this user.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network or service fault. Never retried automatically.
    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChatError {
    /// Whether the caller should sign the user out
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Map an HTTP status plus the response body to a taxonomy entry
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = extract_detail(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string()
        });

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Auth(detail),
            StatusCode::NOT_FOUND => Self::NotFound(detail),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Self::Validation(detail),
            _ => Self::Remote(format!("{} ({})", detail, status.as_u16())),
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Remote(format!("malformed response: {}", err))
        } else {
            Self::Remote(err.to_string())
        }
    }
}

/// FastAPI error bodies: `{"detail": "..."}` or a list of validation items
#[derive(Deserialize)]
struct ErrorBody {
    detail: Detail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Detail {
    Message(String),
    Items(Vec<DetailItem>),
}

#[derive(Deserialize)]
struct DetailItem {
    msg: String,
}

fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let text = match parsed.detail {
        Detail::Message(msg) => msg,
        Detail::Items(items) => items
            .into_iter()
            .map(|item| item.msg)
            .collect::<Vec<_>>()
            .join("; "),
    };
    (!text.trim().is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(ChatError::from_status(StatusCode::UNAUTHORIZED, "").is_auth());
        assert!(ChatError::from_status(StatusCode::FORBIDDEN, "").is_auth());
        assert!(matches!(
            ChatError::from_status(StatusCode::NOT_FOUND, ""),
            ChatError::NotFound(_)
        ));
        assert!(matches!(
            ChatError::from_status(StatusCode::UNPROCESSABLE_ENTITY, ""),
            ChatError::Validation(_)
        ));
        assert!(matches!(
            ChatError::from_status(StatusCode::BAD_GATEWAY, ""),
            ChatError::Remote(_)
        ));
    }

    #[test]
    fn test_detail_extraction() {
        let err = ChatError::from_status(
            StatusCode::NOT_FOUND,
            r#"{"detail": "Session not found"}"#,
        );
        assert_eq!(err, ChatError::NotFound("Session not found".to_string()));

        let err = ChatError::from_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail": [{"loc": ["body", "subject"], "msg": "field required", "type": "missing"}]}"#,
        );
        assert_eq!(err, ChatError::Validation("field required".to_string()));
    }

    #[test]
    fn test_remote_error_keeps_status_code() {
        let err = ChatError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "not json");
        assert_eq!(
            err,
            ChatError::Remote("Internal Server Error (500)".to_string())
        );
    }
}
