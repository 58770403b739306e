use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::auth::Credential;
use super::types::{Outcome, Session, SessionId};
use crate::gateway::SessionGateway;
use crate::utils::ChatError;

/// In-memory list of the principal's sessions, most recent first
///
/// Mutated only by [`SessionStore::load`] and [`SessionStore::append`].
/// Loads are ticketed: a completion whose ticket is older than the last one
/// applied is discarded, and sessions appended while a load was in flight
/// survive that load.
pub struct SessionStore {
    gateway: Arc<dyn SessionGateway>,
    credential: Credential,
    inner: Mutex<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    sessions: Vec<Session>,
    /// Shared sequence for load tickets and appends
    sequence: u64,
    applied_load: u64,
    loads_in_flight: usize,
    /// Appends made while a load was in flight; empty otherwise
    recent_appends: Vec<(u64, Session)>,
}

impl StoreInner {
    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn finish_load(&mut self) {
        self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
        if self.loads_in_flight == 0 {
            self.recent_appends.clear();
        }
    }
}

impl SessionStore {
    pub fn new(gateway: Arc<dyn SessionGateway>, credential: Credential) -> Self {
        Self {
            gateway,
            credential,
            inner: Mutex::new(StoreInner::default()),
        }
    }

    /// Fetch every session of the principal and replace the held list
    ///
    /// Returns the number of sessions held afterwards, or `Superseded` when a
    /// load issued later has already been applied.
    pub async fn load(&self) -> Result<Outcome<usize>, ChatError> {
        let ticket = {
            let mut inner = self.inner.lock();
            inner.loads_in_flight += 1;
            inner.next_sequence()
        };
        debug!(ticket, "loading session list");

        let result = self.gateway.list_sessions(&self.credential).await;

        let mut inner = self.inner.lock();
        let fetched = match result {
            Ok(fetched) => fetched,
            Err(err) => {
                inner.finish_load();
                return Err(err);
            }
        };
        if ticket <= inner.applied_load {
            warn!(
                ticket,
                applied = inner.applied_load,
                "discarding superseded session list"
            );
            inner.finish_load();
            return Ok(Outcome::Superseded);
        }

        let mut merged: Vec<Session> = inner
            .recent_appends
            .iter()
            .rev()
            .filter(|(seq, _)| *seq > ticket)
            .map(|(_, session)| session.clone())
            .collect();
        let fetched: Vec<Session> = fetched
            .into_iter()
            .filter(|session| !merged.iter().any(|kept| kept.id == session.id))
            .collect();
        merged.extend(fetched);

        inner.applied_load = ticket;
        inner.recent_appends.retain(|(seq, _)| *seq > ticket);
        inner.sessions = merged;
        inner.finish_load();

        info!(count = inner.sessions.len(), "session list loaded");
        Ok(Outcome::Applied(inner.sessions.len()))
    }

    /// Insert a newly created session at the head without re-fetching
    pub fn append(&self, session: Session) {
        let mut inner = self.inner.lock();
        let seq = inner.next_sequence();

        inner.sessions.retain(|existing| existing.id != session.id);
        inner.sessions.insert(0, session.clone());
        if inner.loads_in_flight > 0 {
            inner.recent_appends.push((seq, session));
        }
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.inner.lock().sessions.clone()
    }

    pub fn get(&self, id: SessionId) -> Option<Session> {
        self.inner
            .lock()
            .sessions
            .iter()
            .find(|session| session.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockSessionGateway;
    use crate::session::testing::{session, ScriptedGateway};
    use pretty_assertions::assert_eq;

    fn ids(store: &SessionStore) -> Vec<i64> {
        store.sessions().iter().map(|s| s.id.0).collect()
    }

    #[tokio::test]
    async fn test_load_then_append_puts_new_session_first() {
        let mut gateway = MockSessionGateway::new();
        gateway
            .expect_list_sessions()
            .times(1)
            .returning(|_| Ok(vec![session(2, "Science", "Light"), session(1, "Maths", "Algebra")]));
        let store = SessionStore::new(Arc::new(gateway), Credential::new("tok"));

        assert_eq!(store.load().await.unwrap(), Outcome::Applied(2));
        store.append(session(3, "History", "Harappa"));

        assert_eq!(ids(&store), vec![3, 2, 1]);
        assert_eq!(store.get(SessionId(3)).unwrap().subject, "History");
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_append_existing_id_moves_it_to_head() {
        let store = SessionStore::new(
            Arc::new(MockSessionGateway::new()),
            Credential::new("tok"),
        );
        store.append(session(1, "Maths", "Algebra"));
        store.append(session(2, "Science", "Light"));
        store.append(session(1, "Maths", "Algebra"));

        assert_eq!(ids(&store), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_auth_error_leaves_store_untouched() {
        let mut gateway = MockSessionGateway::new();
        gateway
            .expect_list_sessions()
            .returning(|_| Err(ChatError::Auth("token expired".to_string())));
        let store = SessionStore::new(Arc::new(gateway), Credential::new("tok"));
        store.append(session(5, "Maths", "Algebra"));

        let err = store.load().await.unwrap_err();
        assert!(err.is_auth());
        assert_eq!(ids(&store), vec![5]);
    }

    #[tokio::test]
    async fn test_out_of_order_loads_keep_latest_issued() {
        let gateway = Arc::new(ScriptedGateway::default());
        let first = gateway.defer_list_sessions();
        let second = gateway.defer_list_sessions();
        let store = SessionStore::new(gateway.clone(), Credential::new("tok"));

        let (older, newer, ()) = futures::join!(store.load(), store.load(), async {
            let _ = second.send(Ok(vec![session(2, "Science", "Light"), session(1, "Maths", "Algebra")]));
            tokio::task::yield_now().await;
            let _ = first.send(Ok(vec![session(1, "Maths", "Algebra")]));
        });

        assert_eq!(older.unwrap(), Outcome::Superseded);
        assert_eq!(newer.unwrap(), Outcome::Applied(2));
        assert_eq!(ids(&store), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_append_during_load_survives() {
        let gateway = Arc::new(ScriptedGateway::default());
        let pending = gateway.defer_list_sessions();
        let store = SessionStore::new(gateway.clone(), Credential::new("tok"));

        let (loaded, ()) = futures::join!(store.load(), async {
            tokio::task::yield_now().await;
            store.append(session(9, "Science", "Sound"));
            let _ = pending.send(Ok(vec![session(4, "Maths", "Algebra")]));
        });

        assert_eq!(loaded.unwrap(), Outcome::Applied(2));
        assert_eq!(ids(&store), vec![9, 4]);
    }

    #[tokio::test]
    async fn test_load_does_not_duplicate_appended_session() {
        let gateway = Arc::new(ScriptedGateway::default());
        let pending = gateway.defer_list_sessions();
        let store = SessionStore::new(gateway.clone(), Credential::new("tok"));

        let (loaded, ()) = futures::join!(store.load(), async {
            tokio::task::yield_now().await;
            store.append(session(9, "Science", "Sound"));
            let _ = pending.send(Ok(vec![session(9, "Science", "Sound"), session(4, "Maths", "Algebra")]));
        });

        assert_eq!(loaded.unwrap(), Outcome::Applied(2));
        assert_eq!(ids(&store), vec![9, 4]);
    }

    #[tokio::test]
    async fn test_appends_are_not_retained_once_loads_settle() {
        let gateway = Arc::new(ScriptedGateway::default());
        let _ = gateway
            .defer_list_sessions()
            .send(Ok(vec![session(4, "Maths", "Algebra")]));
        let pending = gateway.defer_list_sessions();
        let store = SessionStore::new(gateway.clone(), Credential::new("tok"));
        store.load().await.unwrap();

        store.append(session(5, "Science", "Light"));
        store.append(session(6, "Science", "Sound"));
        assert!(store.inner.lock().recent_appends.is_empty());

        let (loaded, ()) = futures::join!(store.load(), async {
            tokio::task::yield_now().await;
            store.append(session(7, "Maths", "Geometry"));
            assert_eq!(store.inner.lock().recent_appends.len(), 1);
            let _ = pending.send(Err(ChatError::Remote("backend down".to_string())));
        });

        assert!(loaded.is_err());
        assert_eq!(ids(&store), vec![7, 6, 5, 4]);
        assert!(store.inner.lock().recent_appends.is_empty());
    }
}
