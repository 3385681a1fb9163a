use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::ReferralSession,
    error::{AppError, Result},
    repository::ReferralRepository,
};

#[derive(FromRow)]
struct ReferralSessionRow {
    id: String,
    store_id: String,
    source: Option<String>,
    order_id: Option<String>,
    converted_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
}

pub struct SqliteReferralRepository {
    pool: SqlitePool,
}

impl SqliteReferralRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_session(row: ReferralSessionRow) -> Result<ReferralSession> {
        let order_id = row
            .order_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ReferralSession {
            id: row.id,
            store_id: Uuid::parse_str(&row.store_id).map_err(|e| AppError::Database(e.to_string()))?,
            source: row.source,
            order_id,
            converted_at: row.converted_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl ReferralRepository for SqliteReferralRepository {
    async fn create_session(&self, store_id: Uuid, source: Option<String>) -> Result<ReferralSession> {
        let id = Uuid::new_v4().simple().to_string();

        sqlx::query(
            "INSERT INTO referral_sessions (id, store_id, source, created_at) VALUES (?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(store_id.to_string())
        .bind(&source)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_session(&id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created referral session".to_string())
        })
    }

    async fn find_session(&self, id: &str) -> Result<Option<ReferralSession>> {
        let row = sqlx::query_as::<_, ReferralSessionRow>(
            r#"
            SELECT id, store_id, source, order_id, converted_at, created_at
            FROM referral_sessions
            WHERE id = ?
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_session).transpose()
    }

    async fn attribute(
        &self,
        session_id: &str,
        store_id: Uuid,
        order_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE referral_sessions
            SET order_id = ?, converted_at = ?
            WHERE id = ? AND store_id = ? AND order_id IS NULL
            "#
        )
        .bind(order_id.to_string())
        .bind(at.naive_utc())
        .bind(session_id)
        .bind(store_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }
}
