use pickside_core::chat::{ChatBackend, ChatSession, MessageQuotaGate};
use pickside_core::storage::CounterStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Chat sessions keyed by installation id, capped at a fixed size with
/// least-recently-used eviction. The map lock is only ever held for the
/// lookup itself; callers hydrate and send under the returned per-session
/// lock, so one installation's slow backend call never stalls another's.
pub struct SessionRegistry {
    store: Arc<dyn CounterStore>,
    backend: Arc<dyn ChatBackend>,
    max_sessions: usize,
    inner: Mutex<Inner>,
}

struct Inner {
    entries: HashMap<String, Entry>,
    clock: u64,
}

struct Entry {
    session: Arc<Mutex<ChatSession>>,
    last_used: u64,
}

impl SessionRegistry {
    /// Env override: MAX_CHAT_SESSIONS.
    pub fn new(store: Arc<dyn CounterStore>, backend: Arc<dyn ChatBackend>) -> Self {
        let max_sessions = std::env::var("MAX_CHAT_SESSIONS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_SESSIONS);
        Self::with_capacity(store, backend, max_sessions)
    }

    pub fn with_capacity(
        store: Arc<dyn CounterStore>,
        backend: Arc<dyn ChatBackend>,
        max_sessions: usize,
    ) -> Self {
        Self {
            store,
            backend,
            max_sessions: max_sessions.max(1),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                clock: 0,
            }),
        }
    }

    /// Returns the installation's session, creating an unhydrated one if
    /// needed. At capacity the least recently used entry is dropped; its
    /// counter survives in the store and rehydrates on the next request.
    pub async fn get_or_create(&self, installation_id: &str) -> Arc<Mutex<ChatSession>> {
        let mut inner = self.inner.lock().await;
        inner.clock += 1;
        let now = inner.clock;

        if let Some(entry) = inner.entries.get_mut(installation_id) {
            entry.last_used = now;
            return Arc::clone(&entry.session);
        }

        if inner.entries.len() >= self.max_sessions {
            if let Some(stale) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone())
            {
                inner.entries.remove(&stale);
            }
        }

        let gate = MessageQuotaGate::new(Arc::clone(&self.store), installation_id);
        let session = Arc::new(Mutex::new(ChatSession::new(gate, Arc::clone(&self.backend))));
        inner.entries.insert(
            installation_id.to_string(),
            Entry {
                session: Arc::clone(&session),
                last_used: now,
            },
        );
        session
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }
}
