use crate::storage::CounterStore;
use std::sync::Arc;

/// Messages a free-tier user may send per installation, ever.
pub const FREE_MESSAGE_LIMIT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CounterState {
    Unloaded,
    Loaded(u32),
}

/// Free-tier chat message cap over a persisted per-installation counter.
///
/// The gate fails open: until the stored count has been hydrated, and
/// whenever persistence misbehaves, it errs on the side of letting the user
/// send. The in-memory count is authoritative for the session; writes to the
/// store are fire-and-forget.
pub struct MessageQuotaGate {
    state: CounterState,
    store: Arc<dyn CounterStore>,
    key: String,
}

impl MessageQuotaGate {
    pub fn new(store: Arc<dyn CounterStore>, installation_id: &str) -> Self {
        Self {
            state: CounterState::Unloaded,
            store,
            key: installation_id.to_string(),
        }
    }

    /// Loads the persisted count. Absent or corrupt values count as zero;
    /// read failures are logged and count as zero. A gate that has already
    /// advanced past `Unloaded` is left alone.
    pub async fn hydrate(&mut self) {
        if !matches!(self.state, CounterState::Unloaded) {
            return;
        }

        let count = match self.store.read(&self.key).await {
            Ok(Some(raw)) => match raw.trim().parse::<u32>() {
                Ok(n) => n,
                Err(_) => {
                    tracing::warn!(key = %self.key, raw = %raw, "stored counter is not an integer; treating as 0");
                    0
                }
            },
            Ok(None) => 0,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "counter read failed; treating as 0");
                0
            }
        };

        self.state = CounterState::Loaded(count);
    }

    pub fn is_hydrated(&self) -> bool {
        matches!(self.state, CounterState::Loaded(_))
    }

    pub fn sent_count(&self) -> u32 {
        match self.state {
            CounterState::Unloaded => 0,
            CounterState::Loaded(n) => n,
        }
    }

    /// Privileged callers always pass. Free-tier callers pass while the
    /// counter is below the limit, or while hydration is still pending.
    pub fn can_send(&self, privileged: bool) -> bool {
        if privileged {
            return true;
        }
        match self.state {
            CounterState::Unloaded => true,
            CounterState::Loaded(n) => n < FREE_MESSAGE_LIMIT,
        }
    }

    /// Advances the counter after a message has been accepted for sending.
    /// Privileged sends are not counted. The persistence write is queued and
    /// its failure only logged; the in-memory count stays authoritative.
    pub fn record_send(&mut self, privileged: bool) {
        if privileged {
            return;
        }

        let next = self.sent_count() + 1;
        self.state = CounterState::Loaded(next);

        let store = Arc::clone(&self.store);
        let key = self.key.clone();
        tokio::spawn(async move {
            if let Err(err) = store.write(&key, &next.to_string()).await {
                tracing::warn!(key = %key, error = %err, "counter persist failed; keeping in-memory count");
            }
        });
    }

    /// Sends left before the gate closes. `None` for privileged callers.
    pub fn remaining(&self, privileged: bool) -> Option<u32> {
        if privileged {
            None
        } else {
            Some(FREE_MESSAGE_LIMIT.saturating_sub(self.sent_count()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryCounterStore;

    struct FailingStore;

    #[async_trait::async_trait]
    impl CounterStore for FailingStore {
        async fn read(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("store unavailable")
        }

        async fn write(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("store unavailable")
        }
    }

    #[tokio::test]
    async fn free_tier_is_capped_at_the_limit() {
        let mut gate = MessageQuotaGate::new(Arc::new(MemoryCounterStore::new()), "install-1");
        gate.hydrate().await;

        for expected in 1..=FREE_MESSAGE_LIMIT {
            assert!(gate.can_send(false));
            gate.record_send(false);
            assert_eq!(gate.sent_count(), expected);
        }

        assert!(!gate.can_send(false));
        assert_eq!(gate.sent_count(), FREE_MESSAGE_LIMIT);
    }

    #[tokio::test]
    async fn hydration_picks_up_the_stored_count() {
        let store = MemoryCounterStore::seed("install-1", "3");
        let mut gate = MessageQuotaGate::new(Arc::new(store), "install-1");
        gate.hydrate().await;

        assert_eq!(gate.sent_count(), 3);
        assert!(!gate.can_send(false));
        assert!(gate.can_send(true));
    }

    #[tokio::test]
    async fn corrupt_stored_count_falls_back_to_zero() {
        let store = MemoryCounterStore::seed("install-1", "not-a-number");
        let mut gate = MessageQuotaGate::new(Arc::new(store), "install-1");
        gate.hydrate().await;

        assert_eq!(gate.sent_count(), 0);
        assert!(gate.can_send(false));
    }

    #[tokio::test]
    async fn unhydrated_gate_fails_open() {
        // The store holds an exhausted count, but it has not been read yet.
        let store = MemoryCounterStore::seed("install-1", "3");
        let gate = MessageQuotaGate::new(Arc::new(store), "install-1");

        assert!(!gate.is_hydrated());
        assert!(gate.can_send(false));
    }

    #[tokio::test]
    async fn hydrate_does_not_clobber_an_advanced_counter() {
        let store = Arc::new(MemoryCounterStore::seed("install-1", "1"));
        let mut gate = MessageQuotaGate::new(store, "install-1");

        // A send that happened during the fail-open window.
        gate.record_send(false);
        assert_eq!(gate.sent_count(), 1);

        gate.hydrate().await;
        assert_eq!(gate.sent_count(), 1);
    }

    #[tokio::test]
    async fn privileged_sends_are_not_counted() {
        let mut gate = MessageQuotaGate::new(Arc::new(MemoryCounterStore::new()), "install-1");
        gate.hydrate().await;

        for _ in 0..10 {
            assert!(gate.can_send(true));
            gate.record_send(true);
        }

        assert_eq!(gate.sent_count(), 0);
        assert_eq!(gate.remaining(true), None);
        assert_eq!(gate.remaining(false), Some(FREE_MESSAGE_LIMIT));
    }

    #[tokio::test]
    async fn store_failure_never_blocks_the_session() {
        let mut gate = MessageQuotaGate::new(Arc::new(FailingStore), "install-1");
        gate.hydrate().await;

        assert!(gate.can_send(false));
        gate.record_send(false);

        // The write failed in the background, but the in-memory count moved.
        assert_eq!(gate.sent_count(), 1);
        assert!(gate.can_send(false));
        assert_eq!(gate.remaining(false), Some(FREE_MESSAGE_LIMIT - 1));
    }
}
