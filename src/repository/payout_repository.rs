use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{NewPayoutRequest, PayoutRequest, PayoutSettlement, PayoutStatus},
    error::{AppError, Result},
    repository::PayoutRepository,
};

#[derive(FromRow)]
struct PayoutRow {
    id: String,
    seller_id: String,
    store_id: String,
    total_earned_cents: i64,
    platform_fee_cents: i64,
    final_amount_cents: i64,
    status: String,
    week_start_date: NaiveDate,
    week_end_date: NaiveDate,
    paid_at: Option<NaiveDateTime>,
    paid_by: Option<String>,
    admin_notes: Option<String>,
    proof_url: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const PAYOUT_COLUMNS: &str = r#"
    id, seller_id, store_id, total_earned_cents, platform_fee_cents,
    final_amount_cents, status, week_start_date, week_end_date,
    paid_at, paid_by, admin_notes, proof_url, created_at, updated_at
"#;

pub struct SqlitePayoutRepository {
    pool: SqlitePool,
}

impl SqlitePayoutRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_uuid(s: &str) -> Result<Uuid> {
        Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
    }

    async fn load_order_ids(&self, payout_id: &str) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT order_id FROM payout_request_orders WHERE payout_request_id = ? ORDER BY rowid"
        )
        .bind(payout_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        ids.iter().map(|s| Self::parse_uuid(s)).collect()
    }

    async fn row_to_payout(&self, row: PayoutRow) -> Result<PayoutRequest> {
        let order_ids = self.load_order_ids(&row.id).await?;
        Ok(PayoutRequest {
            id: Self::parse_uuid(&row.id)?,
            seller_id: Self::parse_uuid(&row.seller_id)?,
            store_id: Self::parse_uuid(&row.store_id)?,
            total_earned_cents: row.total_earned_cents,
            platform_fee_cents: row.platform_fee_cents,
            final_amount_cents: row.final_amount_cents,
            order_ids,
            status: PayoutStatus::parse(&row.status)
                .ok_or_else(|| AppError::Database(format!("Invalid payout status: {}", row.status)))?,
            week_start_date: row.week_start_date,
            week_end_date: row.week_end_date,
            paid_at: row.paid_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            paid_by: row.paid_by,
            admin_notes: row.admin_notes,
            proof_url: row.proof_url,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    async fn rows_to_payouts(&self, rows: Vec<PayoutRow>) -> Result<Vec<PayoutRequest>> {
        let mut payouts = Vec::with_capacity(rows.len());
        for row in rows {
            payouts.push(self.row_to_payout(row).await?);
        }
        Ok(payouts)
    }
}

#[async_trait]
impl PayoutRepository for SqlitePayoutRepository {
    async fn create_batch(&self, batch: NewPayoutRequest) -> Result<PayoutRequest> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO payout_requests (
                id, seller_id, store_id, total_earned_cents, platform_fee_cents,
                final_amount_cents, status, week_start_date, week_end_date,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?, ?)
            "#
        )
        .bind(&id_str)
        .bind(batch.seller_id.to_string())
        .bind(batch.store_id.to_string())
        .bind(batch.total_earned_cents)
        .bind(batch.platform_fee_cents)
        .bind(batch.final_amount_cents)
        .bind(batch.week_start_date)
        .bind(batch.week_end_date)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        for order_id in &batch.order_ids {
            let claimed = sqlx::query(
                "INSERT INTO payout_request_orders (order_id, payout_request_id) VALUES (?, ?)"
            )
            .bind(order_id.to_string())
            .bind(&id_str)
            .execute(&mut *tx)
            .await;

            match claimed {
                Ok(_) => {}
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    // dropping tx rolls back the request row and earlier claims
                    return Err(AppError::Conflict(format!(
                        "order {} is already claimed by another payout",
                        order_id
                    )));
                }
                Err(e) => return Err(AppError::Database(e.to_string())),
            }
        }

        tx.commit().await?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created payout request".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PayoutRequest>> {
        let row = sqlx::query_as::<_, PayoutRow>(&format!(
            "SELECT {} FROM payout_requests WHERE id = ?",
            PAYOUT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(self.row_to_payout(r).await?)),
            None => Ok(None)
        }
    }

    async fn list(&self, status: Option<PayoutStatus>, limit: i64, offset: i64) -> Result<Vec<PayoutRequest>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, PayoutRow>(&format!(
                    "SELECT {} FROM payout_requests WHERE status = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
                    PAYOUT_COLUMNS
                ))
                .bind(status.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, PayoutRow>(&format!(
                    "SELECT {} FROM payout_requests ORDER BY created_at DESC LIMIT ? OFFSET ?",
                    PAYOUT_COLUMNS
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.rows_to_payouts(rows).await
    }

    async fn mark_paid(&self, id: Uuid, settlement: &PayoutSettlement) -> Result<bool> {
        let paid_at = settlement.paid_at.naive_utc();
        let result = sqlx::query(
            r#"
            UPDATE payout_requests
            SET status = 'paid',
                paid_at = ?,
                paid_by = ?,
                proof_url = ?,
                admin_notes = COALESCE(?, admin_notes),
                updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#
        )
        .bind(paid_at)
        .bind(&settlement.paid_by)
        .bind(&settlement.proof_url)
        .bind(&settlement.notes)
        .bind(paid_at)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_rejected(
        &self,
        id: Uuid,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payout_requests
            SET status = 'rejected',
                admin_notes = COALESCE(?, admin_notes),
                updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#
        )
        .bind(notes)
        .bind(at.naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }
}
