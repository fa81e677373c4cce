//! In-memory registry of chat sessions.
//!
//! Sessions idle for longer than `chat.session_ttl_secs` are dropped, and
//! the store never holds more than `chat.max_sessions`: making room evicts
//! the least recently used session. A session whose turn is in progress is
//! never evicted.

use super::ChatSession;
use crate::config::ChatSettings;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Shared handle to one session; a turn holds the lock for its duration.
pub type SessionHandle = Arc<Mutex<ChatSession>>;

struct Entry {
    handle: SessionHandle,
    last_used: Instant,
}

impl Entry {
    fn new(session: ChatSession, now: Instant) -> Self {
        Self {
            handle: Arc::new(Mutex::new(session)),
            last_used: now,
        }
    }

    fn in_use(&self) -> bool {
        self.handle.try_lock().is_err()
    }
}

/// Sessions keyed by id. Cloning shares the same map.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Entry>>>,
    settings: ChatSettings,
}

impl SessionStore {
    pub fn new(settings: ChatSettings) -> Self {
        Self {
            sessions: Arc::default(),
            settings,
        }
    }

    /// Start a new session.
    pub async fn create(&self) -> (Uuid, SessionHandle) {
        let session = ChatSession::from_settings(&self.settings);
        let id = session.id();
        let handle = self.insert(id, session).await;
        (id, handle)
    }

    /// Look up a session and mark it as used.
    pub async fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        entry.last_used = Instant::now();
        Some(entry.handle.clone())
    }

    /// Look up `id`, creating the session under that id if it is unknown.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, SessionHandle) {
        let Some(id) = id else {
            return self.create().await;
        };

        if let Some(handle) = self.get(&id).await {
            return (id, handle);
        }

        let session =
            ChatSession::with_id(id, &self.settings.greeting, self.settings.inject_history);
        (id, self.insert(id, session).await)
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop sessions idle past the TTL. Returns how many were dropped.
    pub async fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now()).await
    }

    async fn evict_idle_at(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        self.prune_idle(&mut sessions, now)
    }

    async fn insert(&self, id: Uuid, session: ChatSession) -> SessionHandle {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        // A concurrent request may have created it meanwhile
        if let Some(entry) = sessions.get_mut(&id) {
            entry.last_used = now;
            return entry.handle.clone();
        }

        self.prune_idle(&mut sessions, now);
        self.make_room(&mut sessions);

        let entry = Entry::new(session, now);
        let handle = entry.handle.clone();
        sessions.insert(id, entry);
        handle
    }

    fn prune_idle(&self, sessions: &mut HashMap<Uuid, Entry>, now: Instant) -> usize {
        let ttl = self.settings.session_ttl();
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.in_use() || now.saturating_duration_since(entry.last_used) <= ttl
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!("Evicted {} idle session(s)", evicted);
        }
        evicted
    }

    fn make_room(&self, sessions: &mut HashMap<Uuid, Entry>) {
        while sessions.len() >= self.settings.max_sessions.max(1) {
            let oldest = sessions
                .iter()
                .filter(|(_, entry)| !entry.in_use())
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| *id);

            match oldest {
                Some(id) => {
                    debug!("Session limit reached, evicting {}", id);
                    sessions.remove(&id);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn capped(max_sessions: usize) -> SessionStore {
        SessionStore::new(ChatSettings {
            max_sessions,
            ..ChatSettings::default()
        })
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = SessionStore::new(ChatSettings::default());
        assert!(store.is_empty().await);

        let (id, handle) = store.create().await;
        handle.lock().await.push_user("hello there");

        let fetched = store.get(&id).await.unwrap();
        assert_eq!(fetched.lock().await.messages().len(), 2);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_or_create_keeps_requested_id() {
        let store = SessionStore::new(ChatSettings::default());
        let wanted = Uuid::new_v4();

        let (id, handle) = store.get_or_create(Some(wanted)).await;
        assert_eq!(id, wanted);
        assert_eq!(handle.lock().await.id(), wanted);

        let (again, _) = store.get_or_create(Some(wanted)).await;
        assert_eq!(again, wanted);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = SessionStore::new(ChatSettings::default());
        let (_, a) = store.create().await;
        let (_, b) = store.create().await;

        // Holding one session's lock does not block another
        let _guard = a.lock().await;
        b.lock().await.push_user("still responsive");
        assert_eq!(b.lock().await.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = SessionStore::new(ChatSettings::default());
        let (id, _) = store.create().await;
        assert!(store.remove(&id).await);
        assert!(!store.remove(&id).await);
        assert!(store.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let store = SessionStore::new(ChatSettings::default());
        let (idle, _) = store.create().await;
        let (busy, busy_handle) = store.create().await;

        let later = Instant::now() + ChatSettings::default().session_ttl() + Duration::from_secs(1);
        let _turn = busy_handle.lock().await;
        assert_eq!(store.evict_idle_at(later).await, 1);

        assert!(store.get(&idle).await.is_none());
        assert!(store.get(&busy).await.is_some());
    }

    #[tokio::test]
    async fn test_recent_sessions_survive_sweep() {
        let store = SessionStore::new(ChatSettings::default());
        let (id, _) = store.create().await;

        assert_eq!(store.evict_idle().await, 0);
        assert!(store.get(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_cap_evicts_least_recently_used() {
        let store = capped(2);
        let (first, _) = store.create().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let (second, _) = store.create().await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        // Touch the first so the second becomes the oldest
        store.get(&first).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let (third, _) = store.get_or_create(Some(Uuid::new_v4())).await;
        assert_eq!(store.len().await, 2);
        assert!(store.get(&second).await.is_none());
        assert!(store.get(&first).await.is_some());
        assert!(store.get(&third).await.is_some());
    }

    #[tokio::test]
    async fn test_cap_spares_session_in_use() {
        let store = capped(1);
        let (first, handle) = store.create().await;
        let _turn = handle.lock().await;

        store.create().await;
        assert_eq!(store.len().await, 2);
        assert!(store.sessions.read().await.contains_key(&first));
    }
}
