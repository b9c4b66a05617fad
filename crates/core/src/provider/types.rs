use crate::domain::prediction::PredictionItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodaysPredictionsResponse {
    pub generated_at: DateTime<Utc>,
    pub items: Vec<PredictionItem>,
}
