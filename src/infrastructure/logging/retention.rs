//! Retention cleanup for rolled log files.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use tracing::{info, warn};

use super::logger::LOG_FILE_NAME;

/// Delete rolled log files in `log_dir` last modified more than
/// `retention_days` ago. Returns the number of files removed.
pub async fn prune_expired_logs(log_dir: impl AsRef<Path>, retention_days: u32) -> Result<usize> {
    let log_dir = log_dir.as_ref();

    if !log_dir.exists() {
        warn!(path = %log_dir.display(), "log directory does not exist");
        return Ok(0);
    }

    let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
    let mut deleted_count = 0;

    let mut entries = tokio::fs::read_dir(log_dir)
        .await
        .context("failed to read log directory")?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .context("failed to read directory entry")?
    {
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_NAME));
        if !is_log {
            continue;
        }

        let modified: DateTime<Utc> = tokio::fs::metadata(&path)
            .await
            .context("failed to get file metadata")?
            .modified()
            .context("failed to get file modification time")?
            .into();

        if modified < cutoff {
            tokio::fs::remove_file(&path)
                .await
                .context("failed to delete old log file")?;
            deleted_count += 1;
        }
    }

    if deleted_count > 0 {
        info!(count = deleted_count, "cleaned up old log files");
    }

    Ok(deleted_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::time::{sleep, Duration as TokioDuration};

    #[tokio::test]
    async fn test_prune_deletes_only_rolled_logs() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("janus.log.2026-01-01"), b"old").unwrap();
        std::fs::write(temp_dir.path().join("janus.log"), b"current").unwrap();
        std::fs::write(temp_dir.path().join("data.txt"), b"text").unwrap();

        sleep(TokioDuration::from_millis(10)).await;
        let deleted = prune_expired_logs(temp_dir.path(), 0).await.unwrap();

        assert_eq!(deleted, 2);
        assert!(temp_dir.path().join("data.txt").exists());
    }

    #[tokio::test]
    async fn test_prune_keeps_recent_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("janus.log.2026-10-01"), b"recent").unwrap();

        let deleted = prune_expired_logs(temp_dir.path(), 30).await.unwrap();
        assert_eq!(deleted, 0);
    }

    #[tokio::test]
    async fn test_prune_handles_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = prune_expired_logs(temp_dir.path().join("nonexistent"), 30).await;
        assert_eq!(result.unwrap(), 0);
    }
}
