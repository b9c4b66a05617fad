use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use pickside_core::access::TierAccessEvaluator;
use pickside_core::chat::{ChatBackend, HttpChatBackend, SendOutcome};
use pickside_core::domain::bonus::WelcomeBonusWindow;
use pickside_core::domain::prediction::FilteredPredictionSet;
use pickside_core::domain::tier::SubscriptionTier;
use pickside_core::provider::{EffectiveTier, HttpJsonPredictionsProvider, PredictionsProvider};
use pickside_core::storage::{CounterStore, MemoryCounterStore, PgCounterStore};

mod sessions;

use sessions::SessionRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = pickside_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let evaluator = TierAccessEvaluator::from_env()?;
    let provider: Arc<dyn PredictionsProvider> =
        Arc::new(HttpJsonPredictionsProvider::from_settings(&settings)?);
    let backend: Arc<dyn ChatBackend> = Arc::new(HttpChatBackend::from_settings(&settings)?);

    // Counter persistence degrades to in-memory rather than refusing to
    // start; the gate is fail-open by design.
    let store: Arc<dyn CounterStore> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match pickside_core::storage::migrate(&pool).await {
                Ok(()) => Arc::new(PgCounterStore::new(pool)),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; using in-memory counter store");
                    Arc::new(MemoryCounterStore::new())
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; using in-memory counter store");
                Arc::new(MemoryCounterStore::new())
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "DATABASE_URL missing; using in-memory counter store");
            Arc::new(MemoryCounterStore::new())
        }
    };

    let state = AppState {
        evaluator,
        provider,
        sessions: Arc::new(SessionRegistry::new(store, backend)),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/picks/:user_id", get(get_todays_picks))
        .route("/chat/messages", post(post_chat_message))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    evaluator: TierAccessEvaluator,
    provider: Arc<dyn PredictionsProvider>,
    sessions: Arc<SessionRegistry>,
}

#[derive(Debug, Deserialize)]
struct PicksQuery {
    tier: String,
    #[serde(default)]
    bonus_claimed: bool,
    bonus_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct PicksResponse {
    quota: usize,
    #[serde(flatten)]
    picks: FilteredPredictionSet,
}

async fn get_todays_picks(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<PicksQuery>,
) -> Result<Json<PicksResponse>, StatusCode> {
    let tier: SubscriptionTier = query.tier.parse().map_err(|_| StatusCode::BAD_REQUEST)?;

    let window = WelcomeBonusWindow {
        claimed: query.bonus_claimed,
        expires_at: query.bonus_expires_at,
    };

    // Evaluated once; the same result drives the remote fetch and the local
    // truncation.
    let bonus_active = window.is_active_at(Utc::now());
    let effective_tier = EffectiveTier::for_request(tier, bonus_active);

    let items = state
        .provider
        .fetch_todays_predictions(user_id, effective_tier)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(%user_id, error = %e, "predictions fetch failed");
            StatusCode::BAD_GATEWAY
        })?;

    let picks = state.evaluator.filter_by_tier(&items, tier, bonus_active);
    let quota = state.evaluator.resolve_quota(tier, bonus_active);

    Ok(Json(PicksResponse { quota, picks }))
}

#[derive(Debug, Deserialize)]
struct SendMessageBody {
    installation_id: String,
    text: String,
    tier: String,
}

#[derive(Debug, Serialize)]
struct SendMessageReply {
    delivered: bool,
    reply: Option<String>,
    sent_count: u32,
    remaining: Option<u32>,
}

async fn post_chat_message(
    State(state): State<AppState>,
    Json(body): Json<SendMessageBody>,
) -> Result<Json<SendMessageReply>, StatusCode> {
    let tier: SubscriptionTier = body.tier.parse().map_err(|_| StatusCode::BAD_REQUEST)?;
    let privileged = tier.is_privileged();

    // The registry lock covers only the lookup; hydration and the backend
    // call run under this installation's own lock.
    let session = state.sessions.get_or_create(&body.installation_id).await;
    let mut session = session.lock().await;
    session.hydrate().await;

    match session.send_message(&body.text, privileged).await {
        Ok(SendOutcome::Delivered { reply }) => Ok(Json(SendMessageReply {
            delivered: true,
            reply: Some(reply),
            sent_count: session.gate().sent_count(),
            remaining: session.gate().remaining(privileged),
        })),
        Ok(SendOutcome::Blocked) => Ok(Json(SendMessageReply {
            delivered: false,
            reply: None,
            sent_count: session.gate().sent_count(),
            remaining: session.gate().remaining(privileged),
        })),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(installation_id = %body.installation_id, error = %e, "chat send failed");
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &pickside_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
