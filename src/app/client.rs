use std::sync::Arc;
use tracing::{info, warn};

use crate::gateway::SessionGateway;
use crate::session::{
    AuthSession, ConversationController, Language, Outcome, Session, SessionSetup, SessionStore,
};
use crate::utils::ChatError;

/// Everything that lives for one signed-in user
///
/// Owns the session list, the single conversation controller and the
/// session picker. Built from an [`AuthSession`] after login and torn down by
/// [`ChatClient::logout`].
pub struct ChatClient {
    auth: AuthSession,
    gateway: Arc<dyn SessionGateway>,
    store: Arc<SessionStore>,
    conversation: ConversationController,
    setup: SessionSetup,
}

impl ChatClient {
    pub fn new(
        auth: AuthSession,
        gateway: Arc<dyn SessionGateway>,
        default_language: Language,
    ) -> Self {
        let store = Arc::new(SessionStore::new(
            gateway.clone(),
            auth.credential.clone(),
        ));
        let conversation =
            ConversationController::new(gateway.clone(), auth.credential.clone(), store.clone());

        Self {
            auth,
            gateway,
            store,
            conversation,
            setup: SessionSetup::new(default_language),
        }
    }

    /// Initial load: subject catalog first, then the session list
    ///
    /// A failed catalog does not block the session list unless the
    /// credential was rejected. The first failure is returned.
    pub async fn bootstrap(&mut self) -> Result<(), ChatError> {
        let catalog = match self.gateway.list_subjects(&self.auth.credential).await {
            Ok(subjects) => {
                self.setup.set_catalog(subjects);
                Ok(())
            }
            Err(err) if err.is_auth() => return Err(err),
            Err(err) => {
                warn!(error = %err, "failed to load subject catalog");
                Err(err)
            }
        };
        let sessions = self.store.load().await.map(|_| ());
        catalog.and(sessions)?;

        info!(
            subjects = self.setup.catalog().len(),
            sessions = self.store.len(),
            "chat client ready"
        );
        Ok(())
    }

    /// Start a session from the picker's current selection
    pub async fn start_selected(&self) -> Result<Outcome<Session>, ChatError> {
        self.setup.start(&self.conversation).await
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.store
    }

    pub fn conversation(&self) -> &ConversationController {
        &self.conversation
    }

    pub fn setup(&self) -> &SessionSetup {
        &self.setup
    }

    pub fn setup_mut(&mut self) -> &mut SessionSetup {
        &mut self.setup
    }

    /// Sign out: the credential, session list and conversation go with `self`
    pub fn logout(self) {
        info!("signed out");
    }
}
