use crate::config::Settings;
use crate::domain::prediction::PredictionItem;
use crate::provider::types::TodaysPredictionsResponse;
use crate::provider::{EffectiveTier, PredictionsProvider};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PATH: &str = "/v1/predictions/today";
const DEFAULT_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct HttpJsonPredictionsProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    path: String,
    retries: u32,
}

impl HttpJsonPredictionsProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_predictions_base_url()?.to_string();
        let api_key = settings.predictions_api_key.clone();

        let timeout_secs = std::env::var("PREDICTIONS_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("PREDICTIONS_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        let path = std::env::var("PREDICTIONS_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PATH.to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build predictions http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            path,
            retries,
        })
    }

    fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };

        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }

    async fn fetch_once(
        &self,
        user_id: Uuid,
        effective_tier: EffectiveTier,
    ) -> Result<TodaysPredictionsResponse> {
        let url = self.url();
        let headers = self.headers()?;

        let res = self
            .http
            .get(url)
            .headers(headers)
            .query(&[
                ("user_id", user_id.to_string()),
                ("tier", effective_tier.as_str().to_string()),
            ])
            .send()
            .await
            .context("predictions request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read predictions response")?;

        if !status.is_success() {
            anyhow::bail!("predictions provider HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<TodaysPredictionsResponse>(&text)
            .with_context(|| format!("failed to parse predictions response: {text}"))?;
        Ok(parsed)
    }

    fn validate(&self, resp: &TodaysPredictionsResponse) -> Result<()> {
        for item in &resp.items {
            validate_item(item)?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PredictionsProvider for HttpJsonPredictionsProvider {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn fetch_todays_predictions(
        &self,
        user_id: Uuid,
        effective_tier: EffectiveTier,
    ) -> Result<Vec<PredictionItem>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let res = self.fetch_once(user_id, effective_tier).await;
            match res {
                Ok(parsed) => {
                    self.validate(&parsed)?;
                    return Ok(parsed.items);
                }
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, error = %err, "predictions fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

fn validate_item(item: &PredictionItem) -> Result<()> {
    anyhow::ensure!(
        !item.match_label.trim().is_empty(),
        "match_label must be non-empty"
    );
    anyhow::ensure!(!item.pick.trim().is_empty(), "pick must be non-empty");
    anyhow::ensure!(
        item.odds.is_finite() && item.odds > 0.0,
        "odds must be positive (got {})",
        item.odds
    );
    anyhow::ensure!(
        (0.0..=100.0).contains(&item.confidence),
        "confidence must be in 0..=100 (got {})",
        item.confidence
    );
    Ok(())
}
