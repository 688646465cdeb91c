//! Session storage behind a swappable trait.
//!
//! Default: `InMemorySessionStore` with timeout eviction.
//! `AppState` holds an `Arc<dyn SessionStore>` so a persistent or distributed
//! backend can replace it without touching the handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::Session;

/// Exclusive access to one session for read-modify-write cycles.
pub type SessionHandle = Arc<Mutex<Session>>;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores a new session and returns its handle.
    async fn put(&self, session: Session) -> SessionHandle;

    /// Looks up a live session and refreshes its idle timer.
    async fn get(&self, id: Uuid) -> Option<SessionHandle>;

    async fn delete(&self, id: Uuid) -> bool;

    /// Drops every session idle for longer than the timeout. Returns how many were removed.
    async fn evict_expired(&self) -> usize;
}

struct StoredSession {
    handle: SessionHandle,
    last_access: Instant,
}

pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, StoredSession>>,
    timeout: Duration,
}

impl InMemorySessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timeout,
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session: Session) -> SessionHandle {
        let id = session.id;
        let handle = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(
            id,
            StoredSession {
                handle: handle.clone(),
                last_access: Instant::now(),
            },
        );
        debug!("Session {id} stored");
        handle
    }

    async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        {
            let mut sessions = self.sessions.write().await;
            let stored = sessions.get_mut(&id)?;
            if stored.last_access.elapsed() <= self.timeout {
                stored.last_access = Instant::now();
                return Some(stored.handle.clone());
            }
        }

        self.delete(id).await;
        info!("Session {id} expired");
        None
    }

    async fn delete(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    async fn evict_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let timeout = self.timeout;
        sessions.retain(|_, stored| stored.last_access.elapsed() <= timeout);
        before - sessions.len()
    }
}

/// Periodically evicts idle sessions for the lifetime of the process.
pub fn spawn_sweeper(store: Arc<dyn SessionStore>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await; // first tick fires immediately
        loop {
            ticker.tick().await;
            let evicted = store.evict_expired().await;
            if evicted > 0 {
                info!("Evicted {evicted} expired session(s)");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn session() -> Session {
        Session::new("a.docx".to_string(), Bytes::new(), Vec::new())
    }

    #[tokio::test]
    async fn test_put_then_get_returns_same_session() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let s = session();
        let id = s.id;
        store.put(s).await;

        let handle = store.get(id).await.expect("session present");
        assert_eq!(handle.lock().await.id, id);
        assert!(store.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_session() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let s = session();
        let id = s.id;
        store.put(s).await;
        assert!(store.delete(id).await);
        assert!(!store.delete(id).await);
        assert!(store.get(id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_after_timeout_evicts_lazily() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let s = session();
        let id = s.id;
        store.put(s).await;

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(store.get(id).await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_access_refreshes_idle_timer() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let s = session();
        let id = s.id;
        store.put(s).await;

        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(store.get(id).await.is_some());
        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(store.get(id).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_expired_only_drops_idle_sessions() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let old = session();
        store.put(old).await;
        tokio::time::advance(Duration::from_secs(50)).await;
        let fresh = session();
        let fresh_id = fresh.id;
        store.put(fresh).await;
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(store.evict_expired().await, 1);
        assert!(store.get(fresh_id).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_in_background() {
        let store = Arc::new(InMemorySessionStore::new(Duration::from_secs(60)));
        store.put(session()).await;
        let sweeper = spawn_sweeper(store.clone(), Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(store.len().await, 0);
        sweeper.abort();
    }
}
