use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{CreateStoreRequest, Store},
    error::{AppError, Result},
    repository::StoreRepository,
};

#[derive(FromRow)]
struct StoreRow {
    id: String,
    seller_id: String,
    name: String,
    owner_email: Option<String>,
    created_at: NaiveDateTime,
}

pub struct SqliteStoreRepository {
    pool: SqlitePool,
}

impl SqliteStoreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_store(row: StoreRow) -> Result<Store> {
        Ok(Store {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            seller_id: Uuid::parse_str(&row.seller_id).map_err(|e| AppError::Database(e.to_string()))?,
            name: row.name,
            owner_email: row.owner_email,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl StoreRepository for SqliteStoreRepository {
    async fn create(&self, store: CreateStoreRequest) -> Result<Store> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            "INSERT INTO stores (id, seller_id, name, owner_email, created_at) VALUES (?, ?, ?, ?, ?)"
        )
        .bind(id.to_string())
        .bind(store.seller_id.to_string())
        .bind(&store.name)
        .bind(&store.owner_email)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created store".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Store>> {
        let row = sqlx::query_as::<_, StoreRow>(
            "SELECT id, seller_id, name, owner_email, created_at FROM stores WHERE id = ?"
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_store(r)?)),
            None => Ok(None)
        }
    }
}
