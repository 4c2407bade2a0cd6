//! Session store: a registry for hosts running many conversations at once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::id::SessionId;
use crate::session::Session;

/// Thread-safe session registry.
///
/// Sessions share nothing with each other, so holders of different handles
/// can run exchanges concurrently without coordination. The store itself is
/// cheap to clone and share across tasks.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a session and return the shared handle to it.
    pub async fn insert(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        let mut map = self.sessions.write().await;
        map.insert(session.id(), session.clone());
        session
    }

    /// Look up a session by id.
    pub async fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Drop a session from the registry. Returns true if it was present.
    /// Handles already held elsewhere stay usable.
    pub async fn remove(&self, id: &SessionId) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Check if a session is registered.
    pub async fn exists(&self, id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Number of registered sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Ids of all registered sessions, in no particular order.
    pub async fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().copied().collect()
    }

    /// Reap sessions idle longer than `max_idle`. Sessions with an exchange
    /// in flight are kept regardless of age. Returns the number removed.
    pub async fn reap_idle(&self, max_idle: Duration) -> usize {
        let mut map = self.sessions.write().await;
        let before = map.len();
        map.retain(|id, session| {
            let stale = !session.is_busy() && session.idle_for() > max_idle;
            if stale {
                tracing::info!(session = %id, "reaping idle session");
            }
            !stale
        });
        before - map.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::*;
    use crate::{
        InferenceError, NormalizationError, NormalizedInput, Normalizer, Reply, Responder,
        StateMap,
    };

    struct PassthroughNormalizer;

    #[async_trait::async_trait]
    impl Normalizer for PassthroughNormalizer {
        async fn normalize(&self, raw: &str) -> Result<NormalizedInput, NormalizationError> {
            Ok(NormalizedInput::verbatim(raw))
        }
    }

    struct EchoResponder;

    #[async_trait::async_trait]
    impl Responder for EchoResponder {
        async fn respond(
            &self,
            input: &NormalizedInput,
            state: &StateMap,
        ) -> Result<Reply, InferenceError> {
            Ok(Reply::text(format!("echo: {}", input.canonical), state))
        }
    }

    /// Parks inside `respond` until released.
    struct BlockingResponder {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait::async_trait]
    impl Responder for BlockingResponder {
        async fn respond(
            &self,
            _input: &NormalizedInput,
            state: &StateMap,
        ) -> Result<Reply, InferenceError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(Reply::text("done", state))
        }
    }

    fn echo_session() -> Session {
        Session::new(Arc::new(PassthroughNormalizer), Arc::new(EchoResponder))
    }

    fn blocking_session(entered: Arc<Notify>, release: Arc<Notify>) -> Session {
        Session::new(
            Arc::new(PassthroughNormalizer),
            Arc::new(BlockingResponder { entered, release }),
        )
    }

    #[tokio::test]
    async fn insert_get_remove() {
        let store = SessionStore::new();
        assert_eq!(store.count().await, 0);

        let session = store.insert(echo_session()).await;
        let id = session.id();
        assert_eq!(store.count().await, 1);
        assert!(store.exists(&id).await);
        assert!(store.get(&id).await.is_some());
        assert_eq!(store.ids().await, vec![id]);

        assert!(store.remove(&id).await);
        assert!(!store.remove(&id).await);
        assert!(store.get(&id).await.is_none());
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn get_unknown_id_is_none() {
        let store = SessionStore::new();
        assert!(store.get(&SessionId::new()).await.is_none());
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let store = SessionStore::new();
        let a = store.insert(echo_session()).await;
        let b = store.insert(echo_session()).await;
        a.start().unwrap();
        b.start().unwrap();

        a.submit("for a").await.unwrap();

        assert_eq!(a.turn_count(), 3);
        assert_eq!(b.turn_count(), 1);
        assert!(b.state().is_empty());
    }

    #[tokio::test]
    async fn exchanges_on_distinct_sessions_run_concurrently() {
        let store = SessionStore::new();
        let entered_a = Arc::new(Notify::new());
        let release_a = Arc::new(Notify::new());
        let entered_b = Arc::new(Notify::new());
        let release_b = Arc::new(Notify::new());

        let a = store
            .insert(blocking_session(entered_a.clone(), release_a.clone()))
            .await;
        let b = store
            .insert(blocking_session(entered_b.clone(), release_b.clone()))
            .await;
        a.start().unwrap();
        b.start().unwrap();

        let task_a = {
            let a = a.clone();
            tokio::spawn(async move { a.submit("hold a").await })
        };
        let task_b = {
            let b = b.clone();
            tokio::spawn(async move { b.submit("hold b").await })
        };

        // Both exchanges are in flight at once; neither blocked the other.
        entered_a.notified().await;
        entered_b.notified().await;
        assert!(a.is_busy() && b.is_busy());

        release_a.notify_one();
        release_b.notify_one();
        assert_eq!(task_a.await.unwrap().unwrap(), "done");
        assert_eq!(task_b.await.unwrap().unwrap(), "done");
    }

    #[tokio::test]
    async fn reap_idle_removes_stale_sessions() {
        let store = SessionStore::new();
        let session = store.insert(echo_session()).await;
        session.start().unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.reap_idle(Duration::from_secs(60)).await, 0);
        assert_eq!(store.count().await, 1);

        assert_eq!(store.reap_idle(Duration::from_millis(1)).await, 1);
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn reap_idle_skips_busy_sessions() {
        let store = SessionStore::new();
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let session = store
            .insert(blocking_session(entered.clone(), release.clone()))
            .await;
        session.start().unwrap();

        let exchange = {
            let session = session.clone();
            tokio::spawn(async move { session.submit("hold").await })
        };
        entered.notified().await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.reap_idle(Duration::from_millis(1)).await, 0);
        assert_eq!(store.count().await, 1);

        release.notify_one();
        exchange.await.unwrap().unwrap();
    }
}
