use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{BankDetail, PayoutMethod, UpsertBankDetail},
    error::{AppError, Result},
    repository::BankDetailRepository,
};

#[derive(FromRow)]
struct BankDetailRow {
    seller_id: String,
    account_holder_name: String,
    bank_name: String,
    account_number: String,
    routing_code: String,
    alias_id: Option<String>,
    payout_method: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteBankDetailRepository {
    pool: SqlitePool,
}

impl SqliteBankDetailRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_bank_detail(row: BankDetailRow) -> Result<BankDetail> {
        Ok(BankDetail {
            seller_id: Uuid::parse_str(&row.seller_id).map_err(|e| AppError::Database(e.to_string()))?,
            account_holder_name: row.account_holder_name,
            bank_name: row.bank_name,
            account_number: row.account_number,
            routing_code: row.routing_code,
            alias_id: row.alias_id,
            payout_method: PayoutMethod::parse(&row.payout_method).ok_or_else(|| {
                AppError::Database(format!("Invalid payout method: {}", row.payout_method))
            })?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl BankDetailRepository for SqliteBankDetailRepository {
    async fn upsert(&self, detail: UpsertBankDetail) -> Result<BankDetail> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO bank_details (
                seller_id, account_holder_name, bank_name, account_number,
                routing_code, alias_id, payout_method, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(seller_id) DO UPDATE SET
                account_holder_name = excluded.account_holder_name,
                bank_name = excluded.bank_name,
                account_number = excluded.account_number,
                routing_code = excluded.routing_code,
                alias_id = excluded.alias_id,
                payout_method = excluded.payout_method,
                updated_at = excluded.updated_at
            "#
        )
        .bind(detail.seller_id.to_string())
        .bind(&detail.account_holder_name)
        .bind(&detail.bank_name)
        .bind(&detail.account_number)
        .bind(&detail.routing_code)
        .bind(&detail.alias_id)
        .bind(detail.payout_method.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_seller(detail.seller_id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve saved bank details".to_string())
        })
    }

    async fn find_by_seller(&self, seller_id: Uuid) -> Result<Option<BankDetail>> {
        let row = sqlx::query_as::<_, BankDetailRow>(
            r#"
            SELECT seller_id, account_holder_name, bank_name, account_number,
                   routing_code, alias_id, payout_method, created_at, updated_at
            FROM bank_details
            WHERE seller_id = ?
            "#
        )
        .bind(seller_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_bank_detail).transpose()
    }
}
