use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{AuditEntry, AuditKind},
    error::{AppError, Result},
    repository::AuditLogRepository,
};

#[derive(FromRow)]
struct AuditRow {
    id: String,
    kind: String,
    subject_id: String,
    detail: String,
    created_at: NaiveDateTime,
}

pub struct SqliteAuditLogRepository {
    pool: SqlitePool,
}

impl SqliteAuditLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogRepository for SqliteAuditLogRepository {
    async fn record(&self, kind: AuditKind, subject_id: &str, detail: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_log (id, kind, subject_id, detail, created_at) VALUES (?, ?, ?, ?, ?)"
        )
        .bind(Uuid::new_v4().to_string())
        .bind(kind.as_str())
        .bind(subject_id)
        .bind(detail)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, kind, subject_id, detail, created_at
            FROM audit_log
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                Ok(AuditEntry {
                    id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
                    kind: AuditKind::parse(&row.kind)
                        .ok_or_else(|| AppError::Database(format!("Invalid audit kind: {}", row.kind)))?,
                    subject_id: row.subject_id,
                    detail: row.detail,
                    created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
                })
            })
            .collect()
    }
}
