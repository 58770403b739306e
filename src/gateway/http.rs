use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::traits::{GatewayResult, SessionGateway};
use super::wire::{
    AnswerBody, CreateSessionBody, LoginBody, LoginResponse, SendMessageBody, SessionRecord,
};
use crate::app::{ApiConfig, EndpointPaths};
use crate::session::{
    AuthSession, Credential, MessageRole, Session, SessionDetail, SessionId, SessionParams,
    Subject,
};
use crate::utils::ChatError;

/// Gateway over the backend's JSON HTTP API
///
/// Every address comes from the configured base URL and path table; no call
/// site builds its own endpoint.
pub struct HttpGateway {
    client: Client,
    base_url: String,
    paths: EndpointPaths,
}

impl HttpGateway {
    pub fn new(config: &ApiConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            paths: config.paths.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchange email/password for a bearer token
    pub async fn login(&self, email: &str, password: &str) -> GatewayResult<AuthSession> {
        let request = self
            .client
            .post(self.url(&self.paths.login))
            .json(&LoginBody { email, password });
        let response: LoginResponse = self.execute(request).await?;

        Ok(AuthSession::new(Credential::new(response.token), response.role))
    }

    fn authorized(
        &self,
        request: RequestBuilder,
        credential: &Credential,
    ) -> GatewayResult<RequestBuilder> {
        if credential.is_blank() {
            return Err(ChatError::Auth("not signed in".to_string()));
        }
        Ok(request.bearer_auth(credential.token()))
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> GatewayResult<T> {
        let response = request.send().await.map_err(|e| {
            ChatError::Remote(format!(
                "failed to reach backend at {}: {}",
                self.base_url, e
            ))
        })?;

        let status = response.status();
        debug!("{} {}", status.as_u16(), response.url().path());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::from_status(status, &body));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl SessionGateway for HttpGateway {
    async fn list_sessions(&self, credential: &Credential) -> GatewayResult<Vec<Session>> {
        let request = self.authorized(self.client.get(self.url(&self.paths.sessions)), credential)?;
        let records: Vec<SessionRecord> = self.execute(request).await?;
        Ok(records.into_iter().map(SessionRecord::into_session).collect())
    }

    async fn create_session(
        &self,
        credential: &Credential,
        params: &SessionParams,
    ) -> GatewayResult<Session> {
        let body = CreateSessionBody {
            subject: &params.subject,
            chapter: &params.chapter,
            language: params.language,
        };
        let request = self.authorized(
            self.client.post(self.url(&self.paths.sessions)).json(&body),
            credential,
        )?;
        let record: SessionRecord = self.execute(request).await?;
        Ok(record.into_session())
    }

    async fn get_session(
        &self,
        credential: &Credential,
        id: SessionId,
    ) -> GatewayResult<SessionDetail> {
        let request = self.authorized(
            self.client.get(self.url(&self.paths.session_path(id))),
            credential,
        )?;
        let record: SessionRecord = self.execute(request).await?;
        Ok(record.into_detail())
    }

    async fn send_message(
        &self,
        credential: &Credential,
        id: SessionId,
        text: &str,
    ) -> GatewayResult<String> {
        let body = SendMessageBody {
            role: MessageRole::User,
            content: text,
        };
        let request = self.authorized(
            self.client
                .post(self.url(&self.paths.session_message_path(id)))
                .json(&body),
            credential,
        )?;
        let answer: AnswerBody = self.execute(request).await?;
        Ok(answer.answer)
    }

    async fn list_subjects(&self, credential: &Credential) -> GatewayResult<Vec<Subject>> {
        let request = self.authorized(self.client.get(self.url(&self.paths.subjects)), credential)?;
        self.execute(request).await
    }
}
