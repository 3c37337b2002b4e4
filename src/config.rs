use crate::errors::AppError;

const API_URL_VAR: &str = "JOB_ASSISTANT_API_URL";
const TITLE_VAR: &str = "JOB_ASSISTANT_CONVERSATION_TITLE";

const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_CONVERSATION_TITLE: &str = "New conversation";

/// Client settings, read from the environment (and `.env` in development).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend origin without a trailing slash, e.g. `http://localhost:5000`.
    pub api_base_url: String,
    /// Title given to conversations created with "new conversation".
    pub conversation_title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            conversation_title: DEFAULT_CONVERSATION_TITLE.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let api_base_url = lookup(API_URL_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let parsed = reqwest::Url::parse(&api_base_url).map_err(|e| AppError::InvalidConfig {
            key: API_URL_VAR.to_string(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::InvalidConfig {
                key: API_URL_VAR.to_string(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let conversation_title = lookup(TITLE_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CONVERSATION_TITLE.to_string());

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            conversation_title,
        })
    }
}
