//! Feature usage logging.
//!
//! Records which chats use which features. Recording is fire-and-forget:
//! storage failures are logged and never reach the command handler.

use crate::config::default_usage_log_path;
use crate::error::UsageLogError;
use crate::platform::ChatRef;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Sink for feature usage records.
#[async_trait]
pub trait UsageLog: Send + Sync {
    async fn record(&self, chat: &ChatRef, feature: &str);
}

/// One usage record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageRecord {
    pub timestamp: u64,
    pub chat_id: i64,
    pub chat_kind: String,
    #[serde(default)]
    pub chat_title: Option<String>,
    pub feature: String,
}

impl UsageRecord {
    fn new(chat: &ChatRef, feature: &str) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            timestamp,
            chat_id: chat.id.0,
            chat_kind: chat.kind.as_str().to_string(),
            chat_title: chat.title.clone(),
            feature: feature.to_string(),
        }
    }
}

/// Usage log stored as JSON lines in a file.
#[derive(Debug, Clone)]
pub struct JsonlUsageLog {
    storage_path: PathBuf,
}

impl JsonlUsageLog {
    /// Create a log at the given path, or the default location.
    pub fn new(storage_path: Option<PathBuf>) -> Self {
        let path = storage_path.unwrap_or_else(default_usage_log_path);
        Self { storage_path: path }
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    /// Append a record, creating the file and its directory as needed.
    pub async fn append(&self, record: &UsageRecord) -> Result<(), UsageLogError> {
        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.storage_path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Read every record. A missing file reads as empty; malformed lines are skipped.
    pub async fn read_all(&self) -> Result<Vec<UsageRecord>, UsageLogError> {
        let content = match fs::read_to_string(&self.storage_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }

    /// Number of records per feature.
    pub async fn summarize(&self) -> Result<BTreeMap<String, u64>, UsageLogError> {
        let mut totals = BTreeMap::new();
        for record in self.read_all().await? {
            *totals.entry(record.feature).or_insert(0) += 1;
        }
        Ok(totals)
    }
}

#[async_trait]
impl UsageLog for JsonlUsageLog {
    async fn record(&self, chat: &ChatRef, feature: &str) {
        let record = UsageRecord::new(chat, feature);
        if let Err(e) = self.append(&record).await {
            warn!(chat_id = %chat.id, feature, error = %e, "Failed to record usage");
        }
    }
}
