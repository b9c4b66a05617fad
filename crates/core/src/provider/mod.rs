pub mod http;
pub mod types;

use crate::domain::prediction::PredictionItem;
use crate::domain::tier::SubscriptionTier;
use anyhow::Result;
use uuid::Uuid;

pub use http::HttpJsonPredictionsProvider;

/// Tier label sent to the provider. The provider applies its own quota on
/// top of the local one, so it has to know about an active welcome bonus.
/// Callers evaluate the bonus window once and pass the result in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveTier {
    Tier(SubscriptionTier),
    WelcomeBonus,
}

impl EffectiveTier {
    pub fn for_request(tier: SubscriptionTier, bonus_active: bool) -> Self {
        if bonus_active {
            EffectiveTier::WelcomeBonus
        } else {
            EffectiveTier::Tier(tier)
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EffectiveTier::Tier(tier) => tier.as_str(),
            EffectiveTier::WelcomeBonus => "welcome_bonus",
        }
    }
}

#[async_trait::async_trait]
pub trait PredictionsProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Returns today's picks for the user, ordered by the provider's own
    /// ranking. Order is significant downstream.
    async fn fetch_todays_predictions(
        &self,
        user_id: Uuid,
        effective_tier: EffectiveTier,
    ) -> Result<Vec<PredictionItem>>;
}
