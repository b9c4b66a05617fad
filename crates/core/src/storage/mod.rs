pub mod counters;

use anyhow::Context;

pub use counters::{CounterStore, MemoryCounterStore, PgCounterStore};

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}
