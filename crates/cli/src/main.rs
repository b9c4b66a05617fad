use anyhow::Context;
use chrono::{Duration, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use pickside_core::access::TierAccessEvaluator;
use pickside_core::domain::bonus::WelcomeBonusWindow;
use pickside_core::domain::tier::SubscriptionTier;
use pickside_core::provider::{EffectiveTier, HttpJsonPredictionsProvider, PredictionsProvider};

/// Previews the gated pick sheet a user would see for a given tier and
/// welcome-bonus state, against the live predictions provider.
#[derive(Debug, Parser)]
#[command(name = "pickside_cli")]
struct Args {
    /// User to fetch picks for. A random id is used when omitted.
    #[arg(long)]
    user_id: Option<Uuid>,

    /// Subscription tier to preview (free | pro | elite).
    #[arg(long, default_value = "free")]
    tier: String,

    /// Preview with a claimed welcome bonus expiring this many minutes from now.
    #[arg(long)]
    bonus_expires_in_mins: Option<i64>,

    /// Print the filtered set as one JSON document instead of log lines.
    #[arg(long)]
    json: bool,
}

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

    let args = Args::parse();

    let tier: SubscriptionTier = args.tier.parse()?;
    let user_id = args.user_id.unwrap_or_else(Uuid::new_v4);

    let now = Utc::now();
    let window = match args.bonus_expires_in_mins {
        Some(mins) => WelcomeBonusWindow::claimed_until(now + Duration::minutes(mins)),
        None => WelcomeBonusWindow::unclaimed(),
    };
    let bonus_active = window.is_active_at(now);

    let evaluator = TierAccessEvaluator::from_env()?;
    let provider = HttpJsonPredictionsProvider::from_settings(&settings)?;

    let effective_tier = EffectiveTier::for_request(tier, bonus_active);
    let items = match provider
        .fetch_todays_predictions(user_id, effective_tier)
        .await
        .context("fetching today's predictions failed")
    {
        Ok(items) => items,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(%user_id, error = %err, "pick sheet preview failed");
            return Err(err);
        }
    };

    let quota = evaluator.resolve_quota(tier, bonus_active);
    let set = evaluator.filter_by_tier(&items, tier, bonus_active);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&set)?);
        return Ok(());
    }

    tracing::info!(
        %user_id,
        %tier,
        bonus_active,
        quota,
        fetched = items.len(),
        visible = set.all.len(),
        team_picks = set.team_picks.len(),
        player_props_picks = set.player_props_picks.len(),
        "gated pick sheet"
    );

    for (idx, item) in set.all.iter().enumerate() {
        tracing::info!(
            rank = idx + 1,
            match_label = %item.match_label,
            pick = %item.pick,
            odds = item.odds,
            confidence = item.confidence,
            bet_type = item.bet_type.as_deref().unwrap_or("-"),
            "pick"
        );
    }

    Ok(())
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
