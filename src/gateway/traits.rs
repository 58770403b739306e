use async_trait::async_trait;

use crate::session::{Credential, Session, SessionDetail, SessionId, SessionParams, Subject};
use crate::utils::ChatError;

pub type GatewayResult<T> = Result<T, ChatError>;

/// Remote contract for the backend's session and message endpoints
///
/// Implementations carry no client-side logic: they translate each call into
/// one request and map failures onto [`ChatError`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// All sessions of the principal, most recent first
    async fn list_sessions(&self, credential: &Credential) -> GatewayResult<Vec<Session>>;

    async fn create_session(
        &self,
        credential: &Credential,
        params: &SessionParams,
    ) -> GatewayResult<Session>;

    /// Session metadata plus its ordered message history
    async fn get_session(
        &self,
        credential: &Credential,
        id: SessionId,
    ) -> GatewayResult<SessionDetail>;

    /// Post a user message and return the assistant's answer text
    async fn send_message(
        &self,
        credential: &Credential,
        id: SessionId,
        text: &str,
    ) -> GatewayResult<String>;

    async fn list_subjects(&self, credential: &Credential) -> GatewayResult<Vec<Subject>>;
}
