use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::chatbot::gemini;
use crate::chatbot::router::RouterConfig;
use crate::chatbot::sentiment;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file '{}': {source}", path.display())]
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    #[error("failed to parse config file '{}': {source}", path.display())]
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    telegram_bot_token: String,
    #[serde(default)]
    gemini_api_key: String,
    /// Gemini model used for chat replies.
    gemini_model: Option<String>,
    #[serde(default)]
    brave_search_api_key: String,
    /// Hugging Face token for the hosted sentiment model.
    hf_api_token: Option<String>,
    sentiment_model: Option<String>,
    /// Base URL of the inference API (model name is appended).
    sentiment_endpoint: Option<String>,
    #[serde(default = "default_true")]
    sentiment_enabled: bool,
    /// Use the word-list scorer when the hosted classifier fails.
    #[serde(default)]
    lexical_sentiment_fallback: bool,
    mongo_uri: Option<String>,
    #[serde(default = "default_mongo_db_name")]
    mongo_db_name: String,
    /// Append every answered chat turn to the `chats` collection.
    #[serde(default)]
    persist_chat_log: bool,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    /// Directory for logs and downloads. Defaults to current directory.
    data_dir: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_mongo_db_name() -> String {
    "AiBot".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

pub struct Config {
    pub telegram_bot_token: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub brave_search_api_key: String,
    pub hf_api_token: Option<String>,
    pub sentiment_model: String,
    pub sentiment_endpoint: String,
    pub sentiment_enabled: bool,
    pub lexical_sentiment_fallback: bool,
    pub mongo_uri: Option<String>,
    pub mongo_db_name: String,
    pub persist_chat_log: bool,
    /// Bound on every outbound HTTP call.
    pub request_timeout: Duration,
    /// Directory for state files (logs, downloads).
    pub data_dir: PathBuf,
}

impl Config {
    /// Load from a JSON file, filling empty secrets from the environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`], but a missing file is treated as empty so the
    /// whole config can come from the environment.
    pub fn load_or_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_or_env_with(path, |key| std::env::var(key).ok())
    }

    pub fn load_or_env_with<P, F>(path: P, env: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let config_path = path.as_ref().to_path_buf();
        if config_path.exists() {
            return Self::load_with_env(config_path, env);
        }
        let file: ConfigFile = serde_json::from_value(serde_json::json!({}))
            .map_err(|e| ConfigError::ParseJson { path: config_path, source: e })?;
        Self::from_file(file, env)
    }

    pub fn load_with_env<P, F>(path: P, env: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        Self::from_file(file, env)
    }

    fn from_file<F>(file: ConfigFile, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Environment only fills in what the file leaves empty
        let secret = |value: String, key: &str| -> String {
            if value.is_empty() {
                env(key).unwrap_or_default()
            } else {
                value
            }
        };
        let optional = |value: Option<String>, key: &str| -> Option<String> {
            value.filter(|v| !v.is_empty()).or_else(|| env(key)).filter(|v| !v.is_empty())
        };

        let telegram_bot_token = secret(file.telegram_bot_token, "BOT_TOKEN");
        let gemini_api_key = secret(file.gemini_api_key, "GEMINI_API_KEY");
        let brave_search_api_key = secret(file.brave_search_api_key, "BRAVE_SEARCH_API_KEY");
        let hf_api_token = optional(file.hf_api_token, "HF_API_TOKEN");
        let mongo_uri = optional(file.mongo_uri, "MONGO_URI");

        // Validate required fields
        if telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if gemini_api_key.is_empty() {
            return Err(ConfigError::Validation("gemini_api_key is required".into()));
        }
        if brave_search_api_key.is_empty() {
            return Err(ConfigError::Validation("brave_search_api_key is required".into()));
        }
        if file.persist_chat_log && mongo_uri.is_none() {
            return Err(ConfigError::Validation("persist_chat_log requires mongo_uri".into()));
        }
        if file.request_timeout_secs == 0 {
            return Err(ConfigError::Validation("request_timeout_secs must be positive".into()));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token,
            gemini_api_key,
            gemini_model: file.gemini_model.unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string()),
            brave_search_api_key,
            hf_api_token,
            sentiment_model: file
                .sentiment_model
                .unwrap_or_else(|| sentiment::DEFAULT_MODEL.to_string()),
            sentiment_endpoint: file
                .sentiment_endpoint
                .unwrap_or_else(|| sentiment::HF_INFERENCE_URL.to_string()),
            sentiment_enabled: file.sentiment_enabled,
            lexical_sentiment_fallback: file.lexical_sentiment_fallback,
            mongo_uri,
            mongo_db_name: file.mongo_db_name,
            persist_chat_log: file.persist_chat_log,
            request_timeout: Duration::from_secs(file.request_timeout_secs),
            data_dir,
        })
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            persist_chat_log: self.persist_chat_log,
            sentiment_enabled: self.sentiment_enabled,
        }
    }

    /// Where uploaded files are saved.
    pub fn download_dir(&self) -> PathBuf {
        self.data_dir.join("downloads")
    }
}
