use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One pick as produced by the predictions provider. The access layer only
/// inspects `bet_type` and list position; everything else passes through to
/// the client untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionItem {
    pub id: Uuid,
    pub match_label: String,
    pub pick: String,
    pub odds: f64,
    /// Model confidence in percent (0..=100).
    pub confidence: f64,
    pub sport: String,
    pub event_time: DateTime<Utc>,
    pub bet_type: Option<String>,
    pub value_pct: Option<f64>,
    pub roi_estimate: Option<f64>,
    pub risk_level: Option<String>,
}

/// Tier-gated view handed to the client: the quota-truncated list plus two
/// independently derived category slices. The slices are neither disjoint
/// nor exhaustive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilteredPredictionSet {
    pub all: Vec<PredictionItem>,
    pub team_picks: Vec<PredictionItem>,
    pub player_props_picks: Vec<PredictionItem>,
}
