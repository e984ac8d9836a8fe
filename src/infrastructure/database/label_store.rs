use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ResolutionRecord;
use crate::domain::ports::LabelStore;

/// `SQLite` implementation of `LabelStore`
///
/// Summary columns are kept alongside the full record as JSON so that
/// review queries can filter without decoding every row.
#[derive(Debug, Clone)]
pub struct SqliteLabelStore {
    pool: SqlitePool,
}

impl SqliteLabelStore {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recent records first.
    pub async fn list_recent(&self, limit: u32) -> DomainResult<Vec<ResolutionRecord>> {
        let rows = sqlx::query(
            r"
            SELECT record_json
            FROM resolution_records
            ORDER BY recorded_at DESC
            LIMIT ?
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> DomainResult<ResolutionRecord> {
                let json: String = row.try_get("record_json")?;
                Ok(serde_json::from_str(&json)?)
            })
            .collect()
    }

    /// Number of stored records per outcome.
    pub async fn count_by_outcome(&self) -> DomainResult<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r"
            SELECT outcome, COUNT(*)
            FROM resolution_records
            GROUP BY outcome
            ORDER BY outcome
            ",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl LabelStore for SqliteLabelStore {
    async fn record(&self, record: &ResolutionRecord) -> DomainResult<()> {
        let record_json = serde_json::to_string(record)?;
        let tokens = i64::try_from(record.consumed.tokens)
            .map_err(|_| DomainError::Storage("token count overflows INTEGER".to_string()))?;
        let latency_ms = i64::try_from(record.consumed.latency.as_millis())
            .map_err(|_| DomainError::Storage("latency overflows INTEGER".to_string()))?;

        sqlx::query(
            r"
            INSERT OR REPLACE INTO resolution_records (
                query_id, query_text, language, outcome, final_action, escalation_reason,
                model_version, attempts, consumed_tokens, consumed_latency_ms, record_json,
                recorded_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(record.query_id.to_string())
        .bind(&record.query_text)
        .bind(record.language.code())
        .bind(&record.outcome)
        .bind(record.final_action.as_deref())
        .bind(record.escalation_reason.as_deref())
        .bind(&record.model_version)
        .bind(i64::from(record.attempts))
        .bind(tokens)
        .bind(latency_ms)
        .bind(record_json)
        .bind(record.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(query_id = %record.query_id, outcome = %record.outcome, "Resolution recorded");
        Ok(())
    }
}
