use crate::config::Settings;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_PATH: &str = "/v1/chat/messages";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Sends one user message and returns the assistant reply. Failure modes
    /// are opaque to callers; they surface as plain errors.
    async fn send_chat_message(&self, text: &str, privileged: bool) -> anyhow::Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    path: String,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    message: &'a str,
    privileged: bool,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    reply: String,
}

impl HttpChatBackend {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings.require_chat_backend_base_url()?.to_string();
        let api_key = settings.chat_backend_api_key.clone();

        let timeout_secs = std::env::var("CHAT_BACKEND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let path = std::env::var("CHAT_BACKEND_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PATH.to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build chat backend http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            path,
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

    fn headers(&self) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl ChatBackend for HttpChatBackend {
    fn backend_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn send_chat_message(&self, text: &str, privileged: bool) -> anyhow::Result<String> {
        let res = self
            .http
            .post(self.url())
            .headers(self.headers()?)
            .json(&SendMessageRequest {
                message: text,
                privileged,
            })
            .send()
            .await
            .context("chat backend request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read chat backend response")?;

        if !status.is_success() {
            anyhow::bail!("chat backend HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<SendMessageResponse>(&text)
            .with_context(|| format!("failed to parse chat backend response: {text}"))?;
        Ok(parsed.reply)
    }
}
