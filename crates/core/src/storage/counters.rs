use anyhow::Context;
use std::collections::HashMap;
use std::sync::Mutex;

/// Durable per-installation key-value store backing the chat message counter.
/// Reads and writes are best-effort from the gate's point of view; the gate
/// logs failures and keeps its in-memory count authoritative.
#[async_trait::async_trait]
pub trait CounterStore: Send + Sync {
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn write(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct PgCounterStore {
    pool: sqlx::PgPool,
}

impl PgCounterStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CounterStore for PgCounterStore {
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT sent_count FROM chat_message_counters WHERE installation_id = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .context("read chat_message_counters failed")?;

        Ok(row.map(|(n,)| n.to_string()))
    }

    async fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let sent_count: i32 = value
            .parse()
            .with_context(|| format!("counter value is not an integer: {value}"))?;

        // GREATEST keeps the stored row monotone even if writes land out of order.
        sqlx::query(
            "INSERT INTO chat_message_counters (installation_id, sent_count, updated_at) \
             VALUES ($1, $2, NOW()) \
             ON CONFLICT (installation_id) DO UPDATE \
             SET sent_count = GREATEST(chat_message_counters.sent_count, EXCLUDED.sent_count), \
                 updated_at = NOW()",
        )
        .bind(key)
        .bind(sent_count)
        .execute(&self.pool)
        .await
        .context("upsert chat_message_counters failed")?;

        Ok(())
    }
}

/// In-process store for tests and for the API's degraded mode when no
/// database is configured.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(key: &str, value: &str) -> Self {
        let store = Self::default();
        store.lock().insert(key.to_string(), value.to_string());
        store
    }

    // A panic while the lock is held poisons it; the map itself is still
    // usable, so recover the guard instead of propagating the panic.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl CounterStore for MemoryCounterStore {
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
