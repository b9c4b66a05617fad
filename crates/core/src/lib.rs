pub mod access;
pub mod chat;
pub mod domain;
pub mod provider;
pub mod storage;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub predictions_base_url: Option<String>,
        pub predictions_api_key: Option<String>,
        pub chat_backend_base_url: Option<String>,
        pub chat_backend_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                predictions_base_url: std::env::var("PREDICTIONS_BASE_URL").ok(),
                predictions_api_key: std::env::var("PREDICTIONS_API_KEY").ok(),
                chat_backend_base_url: std::env::var("CHAT_BACKEND_BASE_URL").ok(),
                chat_backend_api_key: std::env::var("CHAT_BACKEND_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_predictions_base_url(&self) -> anyhow::Result<&str> {
            self.predictions_base_url
                .as_deref()
                .context("PREDICTIONS_BASE_URL is required")
        }

        pub fn require_chat_backend_base_url(&self) -> anyhow::Result<&str> {
            self.chat_backend_base_url
                .as_deref()
                .context("CHAT_BACKEND_BASE_URL is required")
        }
    }
}
