//! Configuration management.
//!
//! Loaded from `~/.groupkeeper/config.json` (or an explicit path), falling
//! back to environment variables when no config file exists:
//!
//! ```json
//! {
//!   "telegram": { "bot_token": "...", "bot_username": "mybot" },
//!   "gemini": { "api_key": "...", "model": "gemini-2.5-flash", "timeout_seconds": 120 },
//!   "usage_log_path": "/var/lib/groupkeeper/usage.jsonl"
//! }
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs_config_dir().join("config.json")
}

/// Default usage log path.
pub fn default_usage_log_path() -> PathBuf {
    dirs_config_dir().join("usage.jsonl")
}

/// Get the .groupkeeper config directory path.
fn dirs_config_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".groupkeeper"))
        .unwrap_or_else(|| PathBuf::from(".groupkeeper"))
}

// ============================================================================
// Configuration File
// ============================================================================

#[derive(Debug, Deserialize)]
struct ConfigFile {
    telegram: TelegramConfigFile,
    gemini: GeminiConfigFile,
    #[serde(default)]
    usage_log_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct TelegramConfigFile {
    bot_token: String,
    #[serde(default)]
    bot_username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiConfigFile {
    api_key: String,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_timeout_seconds() -> u64 {
    120
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Telegram configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Without the leading `@`. Resolved with `getMe` when absent.
    pub bot_username: Option<String>,
}

/// Gemini configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// HTTP client timeout for completion requests
    pub timeout_seconds: u64,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub gemini: GeminiConfig,
    pub usage_log_path: PathBuf,
}

impl Config {
    /// Load configuration from JSON file, falling back to environment variables.
    ///
    /// Search order:
    /// 1. Provided config_path (if any)
    /// 2. `~/.groupkeeper/config.json`
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if path.exists() {
                return Self::from_json(&path);
            }
        }

        let default_path = default_config_path();
        if default_path.exists() {
            return Self::from_json(&default_path);
        }

        Self::from_env()
    }

    /// Load configuration from a JSON file.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let file: ConfigFile = serde_json::from_str(&content)?;

        if file.telegram.bot_token.is_empty() {
            return Err(ConfigError::MissingField("telegram.bot_token".to_string()));
        }
        if file.gemini.api_key.is_empty() {
            return Err(ConfigError::MissingField("gemini.api_key".to_string()));
        }

        Ok(Self {
            telegram: TelegramConfig {
                bot_token: file.telegram.bot_token,
                bot_username: normalize_username(file.telegram.bot_username),
            },
            gemini: GeminiConfig {
                api_key: file.gemini.api_key,
                model: file.gemini.model,
                timeout_seconds: file.gemini.timeout_seconds,
            },
            usage_log_path: file.usage_log_path.unwrap_or_else(default_usage_log_path),
        })
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file (silently ignore if not found)
        let _ = dotenvy::from_path(dirs_config_dir().join(".env"));

        let bot_token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".to_string()))?;

        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let timeout_seconds = match env::var("GEMINI_TIMEOUT_SECONDS") {
            Ok(value) => value.parse::<u64>().map_err(|_| {
                ConfigError::MissingField(
                    "GEMINI_TIMEOUT_SECONDS must be a valid integer".to_string(),
                )
            })?,
            Err(_) => default_timeout_seconds(),
        };

        Ok(Self {
            telegram: TelegramConfig {
                bot_token,
                bot_username: normalize_username(env::var("BOT_USERNAME").ok()),
            },
            gemini: GeminiConfig {
                api_key,
                model: env::var("GEMINI_MODEL").unwrap_or_else(|_| default_model()),
                timeout_seconds,
            },
            usage_log_path: env::var("USAGE_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_usage_log_path()),
        })
    }
}

/// Drop a leading `@` and treat blank names as absent.
fn normalize_username(username: Option<String>) -> Option<String> {
    username
        .map(|name| name.trim().trim_start_matches('@').to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, content).unwrap();
        (dir, config_path)
    }

    #[test]
    fn test_full_config() {
        let (_dir, path) = write_config(
            r#"{
                "telegram": {"bot_token": "token123", "bot_username": "@keeper_bot"},
                "gemini": {"api_key": "key456", "model": "gemini-2.5-pro", "timeout_seconds": 30},
                "usage_log_path": "/tmp/usage.jsonl"
            }"#,
        );

        let config = Config::from_json(&path).unwrap();
        assert_eq!(config.telegram.bot_token, "token123");
        assert_eq!(config.telegram.bot_username.as_deref(), Some("keeper_bot"));
        assert_eq!(config.gemini.api_key, "key456");
        assert_eq!(config.gemini.model, "gemini-2.5-pro");
        assert_eq!(config.gemini.timeout_seconds, 30);
        assert_eq!(config.usage_log_path, PathBuf::from("/tmp/usage.jsonl"));
    }

    #[test]
    fn test_defaults() {
        let (_dir, path) = write_config(
            r#"{
                "telegram": {"bot_token": "token123"},
                "gemini": {"api_key": "key456"}
            }"#,
        );

        let config = Config::from_json(&path).unwrap();
        assert!(config.telegram.bot_username.is_none());
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.gemini.timeout_seconds, 120);
        assert_eq!(config.usage_log_path, default_usage_log_path());
    }

    #[test]
    fn test_empty_token_is_rejected() {
        let (_dir, path) = write_config(
            r#"{"telegram": {"bot_token": ""}, "gemini": {"api_key": "key"}}"#,
        );
        assert!(matches!(
            Config::from_json(&path),
            Err(ConfigError::MissingField(field)) if field == "telegram.bot_token"
        ));
    }

    #[test]
    fn test_missing_gemini_section() {
        let (_dir, path) = write_config(r#"{"telegram": {"bot_token": "token"}}"#);
        assert!(matches!(
            Config::from_json(&path),
            Err(ConfigError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_config_file_not_found() {
        let result = Config::from_json(Path::new("/nonexistent/path.json"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username(Some("@bot".into())).as_deref(), Some("bot"));
        assert_eq!(normalize_username(Some("  ".into())), None);
        assert_eq!(normalize_username(None), None);
    }
}
