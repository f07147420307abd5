//! Error types for the application.

use std::path::PathBuf;
use thiserror::Error;

/// Errors related to configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// Errors returned by the chat platform.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The user cannot be inspected as an admin subject in this chat
    /// (not a participant, or an identifier the platform rejects).
    #[error("User is not a valid admin subject: {0}")]
    NotAdminSubject(String),

    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

impl PlatformError {
    pub fn is_not_admin_subject(&self) -> bool {
        matches!(self, PlatformError::NotAdminSubject(_))
    }
}

/// Errors from the generative AI backend.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Prompt blocked: {0}")]
    Blocked(String),

    #[error("The model returned no text")]
    EmptyResponse,
}

/// Errors related to usage log storage.
#[derive(Error, Debug)]
pub enum UsageLogError {
    #[error("Failed to access usage log: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid usage record: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Errors raised while relaying a prompt.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Ai(#[from] AiError),
}
