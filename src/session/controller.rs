use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::auth::Credential;
use super::store::SessionStore;
use super::types::{Message, MessageId, MessageRole, Outcome, Session, SessionId, SessionParams};
use crate::gateway::SessionGateway;
use crate::utils::ChatError;

/// Lifecycle of the open conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// No session open
    Idle,
    /// History fetch or session creation in flight
    Loading,
    /// History loaded, accepting input
    Ready,
    /// One message round-trip in flight
    Sending,
    /// Last send failed; the error is held until dismissed or the next send
    ReadyWithError,
    /// History fetch failed; the error is retrievable and `retry_open` applies
    LoadFailed,
}

/// Why a `send` was refused without touching the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejection {
    Empty,
    NoSession,
    /// A previous send in this conversation is unresolved
    Busy,
    /// History is still loading or failed to load
    NotReady,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The assistant entry appended after the optimistic user entry
    Answered(Message),
    Rejected(SendRejection),
    /// The conversation was switched before the answer arrived
    Superseded,
}

/// Ordered, append-only message history of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub session: SessionId,
    pub messages: Vec<Message>,
}

/// Read-only snapshot for the display layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationView {
    pub state: ConversationState,
    /// Session the controller currently targets (may still be loading)
    pub session: Option<SessionId>,
    /// Held history; its `session` can differ from the target while a
    /// switch is loading or after the switch failed
    pub conversation: Option<Conversation>,
    pub error: Option<ChatError>,
}

/// Staleness tag attached to every in-flight request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket {
    epoch: u64,
    session: Option<SessionId>,
}

struct Inner {
    state: ConversationState,
    target: Option<SessionId>,
    conversation: Option<Conversation>,
    error: Option<ChatError>,
    epoch: u64,
    next_local_id: u64,
}

impl Inner {
    fn ticket(&self) -> Ticket {
        Ticket {
            epoch: self.epoch,
            session: self.target,
        }
    }

    /// Supersede everything in flight and retarget
    fn begin(&mut self, target: Option<SessionId>, state: ConversationState) -> Ticket {
        self.epoch += 1;
        self.target = target;
        self.state = state;
        self.error = None;
        self.ticket()
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.ticket() == ticket
    }

    fn local_message(&mut self, role: MessageRole, content: String) -> Message {
        self.next_local_id += 1;
        Message {
            id: MessageId::Local(self.next_local_id),
            role,
            content,
            created_at: Utc::now(),
        }
    }

    fn open_conversation_mut(&mut self) -> Option<&mut Conversation> {
        let target = self.target?;
        self.conversation
            .as_mut()
            .filter(|conversation| conversation.session == target)
    }
}

/// A rejected credential ends the whole login, so it is reported even for a
/// superseded request. The controller state is left alone.
fn surface_auth<T>(result: &Result<T, ChatError>) -> Result<(), ChatError> {
    match result {
        Err(err) if err.is_auth() => {
            warn!(error = %err, "credential rejected on a superseded request");
            Err(err.clone())
        }
        _ => Ok(()),
    }
}

/// Owns the open session's message list
///
/// The controller is the only writer of its conversation. All state sits
/// behind a lock that is never held across a network call, so concurrent
/// operations interleave at their await points; completions that no longer
/// match the current target are dropped.
pub struct ConversationController {
    gateway: Arc<dyn SessionGateway>,
    credential: Credential,
    store: Arc<SessionStore>,
    inner: Mutex<Inner>,
}

impl ConversationController {
    pub fn new(
        gateway: Arc<dyn SessionGateway>,
        credential: Credential,
        store: Arc<SessionStore>,
    ) -> Self {
        Self {
            gateway,
            credential,
            store,
            inner: Mutex::new(Inner {
                state: ConversationState::Idle,
                target: None,
                conversation: None,
                error: None,
                epoch: 0,
                next_local_id: 0,
            }),
        }
    }

    /// Fetch the full history of `id` and make it the open conversation
    ///
    /// The previously held conversation stays in place until the new history
    /// arrives. Returns the number of messages loaded.
    pub async fn open(&self, id: SessionId) -> Result<Outcome<usize>, ChatError> {
        let ticket = self.inner.lock().begin(Some(id), ConversationState::Loading);
        info!(session = %id, "opening session");

        let result = self.gateway.get_session(&self.credential, id).await;

        let mut inner = self.inner.lock();
        if !inner.is_current(ticket) {
            surface_auth(&result)?;
            warn!(session = %id, "discarding history for a session that is no longer open");
            return Ok(Outcome::Superseded);
        }

        match result {
            Ok(detail) => {
                let count = detail.messages.len();
                inner.conversation = Some(Conversation {
                    session: id,
                    messages: detail.messages,
                });
                inner.state = ConversationState::Ready;
                debug!(session = %id, count, "history loaded");
                Ok(Outcome::Applied(count))
            }
            Err(err) => {
                warn!(session = %id, error = %err, "failed to load session");
                inner.state = ConversationState::LoadFailed;
                inner.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Re-issue `open` for the targeted session after a failed load
    pub async fn retry_open(&self) -> Result<Outcome<usize>, ChatError> {
        let target = {
            let inner = self.inner.lock();
            match (inner.state, inner.target) {
                (ConversationState::LoadFailed, Some(id)) => id,
                _ => {
                    return Err(ChatError::Validation(
                        "no failed session load to retry".to_string(),
                    ))
                }
            }
        };
        self.open(target).await
    }

    /// Create a session for the selection and open it with an empty history
    ///
    /// The created session is recorded in the store even when a later action
    /// superseded this request, since it exists server-side either way.
    pub async fn start_new(&self, params: SessionParams) -> Result<Outcome<Session>, ChatError> {
        let ticket = {
            let mut inner = self.inner.lock();
            inner.conversation = None;
            inner.begin(None, ConversationState::Loading)
        };
        info!(subject = %params.subject, chapter = %params.chapter, language = %params.language, "creating session");

        let result = self.gateway.create_session(&self.credential, &params).await;

        if let Ok(session) = &result {
            self.store.append(session.clone());
        }

        let mut inner = self.inner.lock();
        if !inner.is_current(ticket) {
            surface_auth(&result)?;
            warn!("discarding superseded session creation");
            return Ok(Outcome::Superseded);
        }

        match result {
            Ok(session) => {
                inner.target = Some(session.id);
                inner.conversation = Some(Conversation {
                    session: session.id,
                    messages: Vec::new(),
                });
                inner.state = ConversationState::Ready;
                info!(session = %session.id, "session created");
                Ok(Outcome::Applied(session))
            }
            Err(err) => {
                warn!(error = %err, "failed to create session");
                inner.state = ConversationState::Idle;
                inner.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Close the open session; anything in flight is discarded on arrival
    pub fn new_chat(&self) {
        let mut inner = self.inner.lock();
        inner.conversation = None;
        inner.begin(None, ConversationState::Idle);
        debug!("conversation reset");
    }

    /// Send a user message to the open session
    ///
    /// The user entry is appended before the request goes out and is kept
    /// when the request fails.
    pub async fn send(&self, text: &str) -> Result<SendOutcome, ChatError> {
        if text.trim().is_empty() {
            return Ok(SendOutcome::Rejected(SendRejection::Empty));
        }

        let (ticket, session) = {
            let mut inner = self.inner.lock();
            let rejection = match (inner.state, inner.target) {
                (_, None) | (ConversationState::Idle, _) => Some(SendRejection::NoSession),
                (ConversationState::Sending, _) => Some(SendRejection::Busy),
                (ConversationState::Loading | ConversationState::LoadFailed, _) => {
                    Some(SendRejection::NotReady)
                }
                (ConversationState::Ready | ConversationState::ReadyWithError, Some(_)) => None,
            };
            if let Some(rejection) = rejection {
                debug!(?rejection, "send rejected");
                return Ok(SendOutcome::Rejected(rejection));
            }

            let pending = inner.local_message(MessageRole::User, text.to_string());
            let Some(conversation) = inner.open_conversation_mut() else {
                return Ok(SendOutcome::Rejected(SendRejection::NotReady));
            };
            let session = conversation.session;
            conversation.messages.push(pending);

            inner.state = ConversationState::Sending;
            inner.error = None;
            (inner.ticket(), session)
        };
        debug!(session = %session, "sending message");

        let result = self
            .gateway
            .send_message(&self.credential, session, text)
            .await;

        let mut inner = self.inner.lock();
        if !inner.is_current(ticket) {
            surface_auth(&result)?;
            warn!(session = %session, "discarding answer for a conversation that is no longer open");
            return Ok(SendOutcome::Superseded);
        }

        match result {
            Ok(answer) => {
                let reply = inner.local_message(MessageRole::Assistant, answer);
                if let Some(conversation) = inner.open_conversation_mut() {
                    conversation.messages.push(reply.clone());
                }
                inner.state = ConversationState::Ready;
                Ok(SendOutcome::Answered(reply))
            }
            Err(err) => {
                warn!(session = %session, error = %err, "send failed");
                inner.state = ConversationState::ReadyWithError;
                inner.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Clear the surfaced error
    pub fn dismiss_error(&self) {
        let mut inner = self.inner.lock();
        inner.error = None;
        if inner.state == ConversationState::ReadyWithError {
            inner.state = ConversationState::Ready;
        }
    }

    pub fn state(&self) -> ConversationState {
        self.inner.lock().state
    }

    pub fn current_session(&self) -> Option<SessionId> {
        self.inner.lock().target
    }

    pub fn error(&self) -> Option<ChatError> {
        self.inner.lock().error.clone()
    }

    /// Messages of the open session (empty while none is loaded)
    pub fn messages(&self) -> Vec<Message> {
        let inner = self.inner.lock();
        match (&inner.conversation, inner.target) {
            (Some(conversation), Some(target)) if conversation.session == target => {
                conversation.messages.clone()
            }
            _ => Vec::new(),
        }
    }

    pub fn snapshot(&self) -> ConversationView {
        let inner = self.inner.lock();
        ConversationView {
            state: inner.state,
            session: inner.target,
            conversation: inner.conversation.clone(),
            error: inner.error.clone(),
        }
    }
}
