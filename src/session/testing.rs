// Test support: a gateway whose responses are released by the test

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

use super::auth::Credential;
use super::types::{
    Language, Message, MessageId, MessageRole, Session, SessionDetail, SessionId, SessionParams,
    Subject,
};
use crate::gateway::{GatewayResult, SessionGateway};
use crate::utils::ChatError;

pub(crate) fn session(id: i64, subject: &str, chapter: &str) -> Session {
    Session {
        id: SessionId(id),
        subject: subject.to_string(),
        chapter: chapter.to_string(),
        language: Language::English,
        title: Session::default_title(subject, chapter),
    }
}

pub(crate) fn remote_message(id: i64, role: MessageRole, content: &str) -> Message {
    Message {
        id: MessageId::Remote(id),
        role,
        content: content.to_string(),
        created_at: Utc::now(),
    }
}

pub(crate) fn detail(id: i64, contents: &[&str]) -> SessionDetail {
    let messages = contents
        .iter()
        .enumerate()
        .map(|(i, content)| {
            let role = if i % 2 == 0 {
                MessageRole::User
            } else {
                MessageRole::Assistant
            };
            remote_message(id * 100 + i as i64, role, content)
        })
        .collect();
    SessionDetail {
        session: session(id, "Science", "Light"),
        messages,
    }
}

pub(crate) fn catalog() -> Vec<Subject> {
    vec![
        Subject {
            name: "Science".to_string(),
            chapters: vec!["Light".to_string(), "Sound".to_string()],
        },
        Subject {
            name: "Maths".to_string(),
            chapters: vec!["Algebra".to_string(), "Geometry".to_string()],
        },
        Subject {
            name: "Art".to_string(),
            chapters: vec![],
        },
    ]
}

type Pending<T> = oneshot::Receiver<GatewayResult<T>>;

/// Each call takes the next deferred response queued for its operation and
/// waits until the test sends it. Calls with nothing queued fail with a
/// remote error.
#[derive(Default)]
pub(crate) struct ScriptedGateway {
    lists: Mutex<VecDeque<Pending<Vec<Session>>>>,
    creates: Mutex<VecDeque<Pending<Session>>>,
    details: Mutex<HashMap<SessionId, VecDeque<Pending<SessionDetail>>>>,
    sends: Mutex<VecDeque<Pending<String>>>,
    sends_in_flight: AtomicUsize,
    max_sends_in_flight: AtomicUsize,
    send_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn defer_list_sessions(&self) -> oneshot::Sender<GatewayResult<Vec<Session>>> {
        let (tx, rx) = oneshot::channel();
        self.lists.lock().push_back(rx);
        tx
    }

    pub fn defer_create_session(&self) -> oneshot::Sender<GatewayResult<Session>> {
        let (tx, rx) = oneshot::channel();
        self.creates.lock().push_back(rx);
        tx
    }

    pub fn defer_get_session(&self, id: i64) -> oneshot::Sender<GatewayResult<SessionDetail>> {
        let (tx, rx) = oneshot::channel();
        self.details
            .lock()
            .entry(SessionId(id))
            .or_default()
            .push_back(rx);
        tx
    }

    pub fn defer_send_message(&self) -> oneshot::Sender<GatewayResult<String>> {
        let (tx, rx) = oneshot::channel();
        self.sends.lock().push_back(rx);
        tx
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn max_sends_in_flight(&self) -> usize {
        self.max_sends_in_flight.load(Ordering::SeqCst)
    }
}

async fn wait<T>(pending: Option<Pending<T>>, what: &str) -> GatewayResult<T> {
    match pending {
        Some(rx) => rx
            .await
            .unwrap_or_else(|_| Err(ChatError::Remote(format!("{} dropped", what)))),
        None => Err(ChatError::Remote(format!("unexpected {} call", what))),
    }
}

#[async_trait]
impl SessionGateway for ScriptedGateway {
    async fn list_sessions(&self, _credential: &Credential) -> GatewayResult<Vec<Session>> {
        let pending = self.lists.lock().pop_front();
        wait(pending, "list_sessions").await
    }

    async fn create_session(
        &self,
        _credential: &Credential,
        _params: &SessionParams,
    ) -> GatewayResult<Session> {
        let pending = self.creates.lock().pop_front();
        wait(pending, "create_session").await
    }

    async fn get_session(
        &self,
        _credential: &Credential,
        id: SessionId,
    ) -> GatewayResult<SessionDetail> {
        let pending = self
            .details
            .lock()
            .get_mut(&id)
            .and_then(|queue| queue.pop_front());
        wait(pending, "get_session").await
    }

    async fn send_message(
        &self,
        _credential: &Credential,
        _id: SessionId,
        _text: &str,
    ) -> GatewayResult<String> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.sends_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_sends_in_flight.fetch_max(now, Ordering::SeqCst);

        let pending = self.sends.lock().pop_front();
        let result = wait(pending, "send_message").await;

        self.sends_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn list_subjects(&self, _credential: &Credential) -> GatewayResult<Vec<Subject>> {
        Ok(catalog())
    }
}
