use crate::domain::bonus::WELCOME_BONUS_PICKS;
use crate::domain::prediction::{FilteredPredictionSet, PredictionItem};
use crate::domain::tier::{SubscriptionTier, TierCapabilities};

/// Substring markers for game-level markets (moneyline / spread / totals).
const TEAM_BET_MARKERS: &[&str] = &["moneyline", "spread", "total", "over", "under"];

/// Substring markers for player-statistic markets.
const PROP_BET_MARKERS: &[&str] = &[
    "prop",
    "hit",
    "homer",
    "rbi",
    "strikeout",
    "assist",
    "rebound",
];

/// How `bet_type` is matched against the category vocabularies.
///
/// `Legacy` reproduces the historical client behavior where team markers were
/// matched against the raw string while prop markers were matched against the
/// lowercased string. Kept behind a switch for clients that depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryMatchPolicy {
    #[default]
    CaseInsensitive,
    Legacy,
}

impl CategoryMatchPolicy {
    /// Env override: CATEGORY_MATCH_POLICY=legacy.
    pub fn from_env() -> Self {
        match std::env::var("CATEGORY_MATCH_POLICY") {
            Ok(s) if s.trim().eq_ignore_ascii_case("legacy") => CategoryMatchPolicy::Legacy,
            _ => CategoryMatchPolicy::CaseInsensitive,
        }
    }

    fn is_team_bet(self, bet_type: &str) -> bool {
        match self {
            CategoryMatchPolicy::CaseInsensitive => {
                let lowered = bet_type.to_lowercase();
                TEAM_BET_MARKERS.iter().any(|m| lowered.contains(m))
            }
            CategoryMatchPolicy::Legacy => TEAM_BET_MARKERS.iter().any(|m| bet_type.contains(m)),
        }
    }

    fn is_player_prop_bet(self, bet_type: &str) -> bool {
        let lowered = bet_type.to_lowercase();
        PROP_BET_MARKERS.iter().any(|m| lowered.contains(m))
    }
}

/// Converts a provider-ordered pick list into the tier-appropriate view.
///
/// Stateless and free of I/O. Callers evaluate the welcome bonus window once
/// (`WelcomeBonusWindow::is_active_at`) and pass the result in, so the same
/// evaluation feeds both the provider request and the local truncation.
#[derive(Debug, Clone, Default)]
pub struct TierAccessEvaluator {
    capabilities: TierCapabilities,
    match_policy: CategoryMatchPolicy,
}

impl TierAccessEvaluator {
    pub fn new(capabilities: TierCapabilities, match_policy: CategoryMatchPolicy) -> Self {
        Self {
            capabilities,
            match_policy,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(
            TierCapabilities::from_env()?,
            CategoryMatchPolicy::from_env(),
        ))
    }

    /// How many picks the user may currently see. An active welcome bonus
    /// overrides the tier quota with a flat grant.
    pub fn resolve_quota(&self, tier: SubscriptionTier, bonus_active: bool) -> usize {
        if bonus_active {
            WELCOME_BONUS_PICKS
        } else {
            self.capabilities.daily_picks(tier)
        }
    }

    /// Prefix-takes `items` to the resolved quota (provider order encodes the
    /// ranking; never re-sorted here), then splits the kept picks into the
    /// two category views. Picks without a `bet_type` stay in `all` only.
    pub fn filter_by_tier(
        &self,
        items: &[PredictionItem],
        tier: SubscriptionTier,
        bonus_active: bool,
    ) -> FilteredPredictionSet {
        let quota = self.resolve_quota(tier, bonus_active);
        let visible = &items[..quota.min(items.len())];

        let mut team_picks = Vec::new();
        let mut player_props_picks = Vec::new();
        for item in visible {
            let Some(bet_type) = item.bet_type.as_deref() else {
                continue;
            };
            if self.match_policy.is_team_bet(bet_type) {
                team_picks.push(item.clone());
            }
            if self.match_policy.is_player_prop_bet(bet_type) {
                player_props_picks.push(item.clone());
            }
        }

        FilteredPredictionSet {
            all: visible.to_vec(),
            team_picks,
            player_props_picks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bonus::{WelcomeBonusWindow, WELCOME_BONUS_PICKS};
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn item(confidence: f64, bet_type: Option<&str>) -> PredictionItem {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap();
        PredictionItem {
            id: Uuid::new_v4(),
            match_label: "NYY @ BOS".to_string(),
            pick: "BOS -1.5".to_string(),
            odds: 1.91,
            confidence,
            sport: "mlb".to_string(),
            event_time: now + Duration::hours(3),
            bet_type: bet_type.map(|s| s.to_string()),
            value_pct: None,
            roi_estimate: None,
            risk_level: None,
        }
    }

    fn evaluator() -> TierAccessEvaluator {
        TierAccessEvaluator::new(
            TierCapabilities::default(),
            CategoryMatchPolicy::CaseInsensitive,
        )
    }

    #[test]
    fn quota_follows_tier_ordering_without_bonus() {
        let eval = evaluator();
        let free = eval.resolve_quota(SubscriptionTier::Free, false);
        let pro = eval.resolve_quota(SubscriptionTier::Pro, false);
        let elite = eval.resolve_quota(SubscriptionTier::Elite, false);
        assert!(free < pro);
        assert!(pro <= elite);
    }

    #[test]
    fn active_bonus_overrides_every_tier() {
        let eval = evaluator();
        for tier in [
            SubscriptionTier::Free,
            SubscriptionTier::Pro,
            SubscriptionTier::Elite,
        ] {
            assert_eq!(eval.resolve_quota(tier, true), WELCOME_BONUS_PICKS);
        }
    }

    #[test]
    fn bonus_expiry_is_a_strict_boundary() {
        let eval = evaluator();
        let expires_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let window = WelcomeBonusWindow::claimed_until(expires_at);

        let active = window.is_active_at(expires_at - Duration::milliseconds(1));
        assert_eq!(
            eval.resolve_quota(SubscriptionTier::Free, active),
            WELCOME_BONUS_PICKS
        );

        // At the expiry instant the window is already over.
        let active = window.is_active_at(expires_at);
        assert_eq!(eval.resolve_quota(SubscriptionTier::Free, active), 2);
    }

    #[test]
    fn truncation_is_a_prefix_take() {
        let eval = evaluator();
        let items: Vec<_> = (0..10)
            .map(|i| item(95.0 - i as f64, Some("moneyline")))
            .collect();

        let set = eval.filter_by_tier(&items, SubscriptionTier::Free, false);

        assert_eq!(set.all.len(), 2);
        assert_eq!(set.all[0].id, items[0].id);
        assert_eq!(set.all[1].id, items[1].id);
    }

    #[test]
    fn quota_beyond_list_length_is_a_noop() {
        let eval = evaluator();
        let items = vec![item(90.0, Some("spread"))];
        let set = eval.filter_by_tier(&items, SubscriptionTier::Elite, false);
        assert_eq!(set.all.len(), 1);
        assert_eq!(set.team_picks.len(), 1);
    }

    #[test]
    fn empty_input_yields_empty_views() {
        let eval = evaluator();
        let set = eval.filter_by_tier(&[], SubscriptionTier::Pro, false);
        assert!(set.all.is_empty());
        assert!(set.team_picks.is_empty());
        assert!(set.player_props_picks.is_empty());
    }

    #[test]
    fn missing_bet_type_stays_out_of_both_categories() {
        let eval = evaluator();
        let items = vec![item(90.0, None), item(88.0, Some("moneyline"))];
        let set = eval.filter_by_tier(&items, SubscriptionTier::Pro, false);
        assert_eq!(set.all.len(), 2);
        assert_eq!(set.team_picks.len(), 1);
        assert!(set.player_props_picks.is_empty());
    }

    #[test]
    fn categories_may_overlap_and_need_not_cover() {
        let eval = evaluator();
        let items = vec![
            // Matches both vocabularies ("total" and "prop").
            item(92.0, Some("player prop total")),
            // Matches neither; stays in `all` only.
            item(90.0, Some("parlay")),
        ];
        let set = eval.filter_by_tier(&items, SubscriptionTier::Pro, false);

        assert_eq!(set.all.len(), 2);
        assert_eq!(set.team_picks.len(), 1);
        assert_eq!(set.player_props_picks.len(), 1);
        assert_eq!(set.team_picks[0].id, items[0].id);
        assert_eq!(set.player_props_picks[0].id, items[0].id);
    }

    #[test]
    fn legacy_policy_keeps_team_matching_case_sensitive() {
        let legacy =
            TierAccessEvaluator::new(TierCapabilities::default(), CategoryMatchPolicy::Legacy);
        let standard = evaluator();
        let items = vec![item(91.0, Some("Moneyline")), item(90.0, Some("Prop Hits"))];

        let legacy_set = legacy.filter_by_tier(&items, SubscriptionTier::Pro, false);
        // "Moneyline" misses the lowercase team markers under the old rules,
        // while props were always lowercased first.
        assert!(legacy_set.team_picks.is_empty());
        assert_eq!(legacy_set.player_props_picks.len(), 1);

        let standard_set = standard.filter_by_tier(&items, SubscriptionTier::Pro, false);
        assert_eq!(standard_set.team_picks.len(), 1);
        assert_eq!(standard_set.player_props_picks.len(), 1);
    }

    #[test]
    fn free_tier_sees_top_two_of_ten() {
        let eval = evaluator();
        let items: Vec<_> = (0..10)
            .map(|i| item(99.0 - i as f64, Some("total")))
            .collect();
        let set = eval.filter_by_tier(&items, SubscriptionTier::Free, false);
        assert_eq!(set.all.len(), 2);
        assert_eq!(set.all[0].confidence, 99.0);
        assert_eq!(set.all[1].confidence, 98.0);
    }
}
