use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{SqlitePool, FromRow};
use uuid::Uuid;

use crate::{
    config::EligibilityAnchor,
    domain::{EligibleOrder, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus},
    error::{AppError, Result},
    repository::OrderRepository,
};

// Database row struct that matches SQLite schema
#[derive(FromRow)]
struct OrderRow {
    id: String,
    store_id: String,
    buyer_name: String,
    buyer_email: Option<String>,
    buyer_phone: Option<String>,
    buyer_address: Option<String>,
    total_price_cents: i64,
    payment_method: String,
    payment_status: String,
    status: String,
    gateway_order_id: Option<String>,
    gateway_payment_id: Option<String>,
    gateway_signature: Option<String>,
    notes: Option<String>,
    paid_at: Option<NaiveDateTime>,
    delivered_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct OrderItemRow {
    id: String,
    order_id: String,
    product_id: String,
    product_name: String,
    product_image: Option<String>,
    quantity: i64,
    price_at_purchase_cents: i64,
}

#[derive(FromRow)]
struct EligibleOrderRow {
    id: String,
    store_id: String,
    seller_id: String,
    total_price_cents: i64,
}

const ORDER_COLUMNS: &str = r#"
    id, store_id, buyer_name, buyer_email, buyer_phone, buyer_address,
    total_price_cents, payment_method, payment_status, status,
    gateway_order_id, gateway_payment_id, gateway_signature, notes,
    paid_at, delivered_at, created_at, updated_at
"#;

pub struct SqliteOrderRepository {
    pool: SqlitePool,
}

impl SqliteOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_uuid(s: &str) -> Result<Uuid> {
        Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
    }

    fn row_to_order(row: OrderRow, items: Vec<OrderItem>) -> Result<Order> {
        Ok(Order {
            id: Self::parse_uuid(&row.id)?,
            store_id: Self::parse_uuid(&row.store_id)?,
            buyer_name: row.buyer_name,
            buyer_email: row.buyer_email,
            buyer_phone: row.buyer_phone,
            buyer_address: row.buyer_address,
            total_price_cents: row.total_price_cents,
            payment_method: PaymentMethod::parse(&row.payment_method).ok_or_else(|| {
                AppError::Database(format!("Invalid payment method: {}", row.payment_method))
            })?,
            payment_status: PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
                AppError::Database(format!("Invalid payment status: {}", row.payment_status))
            })?,
            status: OrderStatus::parse(&row.status)
                .ok_or_else(|| AppError::Database(format!("Invalid order status: {}", row.status)))?,
            gateway_order_id: row.gateway_order_id,
            gateway_payment_id: row.gateway_payment_id,
            gateway_signature: row.gateway_signature,
            notes: row.notes,
            paid_at: row.paid_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            delivered_at: row.delivered_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
            items,
        })
    }

    fn row_to_item(row: OrderItemRow) -> Result<OrderItem> {
        Ok(OrderItem {
            id: Self::parse_uuid(&row.id)?,
            order_id: Self::parse_uuid(&row.order_id)?,
            product_id: Self::parse_uuid(&row.product_id)?,
            product_name: row.product_name,
            product_image: row.product_image,
            quantity: row.quantity,
            price_at_purchase_cents: row.price_at_purchase_cents,
        })
    }

    async fn load_items(&self, order_id: &str) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT id, order_id, product_id, product_name, product_image,
                   quantity, price_at_purchase_cents
            FROM order_items
            WHERE order_id = ?
            ORDER BY rowid
            "#
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_item).collect()
    }

    async fn hydrate(&self, row: OrderRow) -> Result<Order> {
        let items = self.load_items(&row.id).await?;
        Self::row_to_order(row, items)
    }
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO orders (
                id, store_id, buyer_name, buyer_email, buyer_phone, buyer_address,
                total_price_cents, payment_method, payment_status, status,
                gateway_order_id, gateway_payment_id, gateway_signature, notes,
                paid_at, delivered_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(order.id.to_string())
        .bind(order.store_id.to_string())
        .bind(&order.buyer_name)
        .bind(&order.buyer_email)
        .bind(&order.buyer_phone)
        .bind(&order.buyer_address)
        .bind(order.total_price_cents)
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(&order.gateway_order_id)
        .bind(&order.gateway_payment_id)
        .bind(&order.gateway_signature)
        .bind(&order.notes)
        .bind(order.paid_at.map(|dt| dt.naive_utc()))
        .bind(order.delivered_at.map(|dt| dt.naive_utc()))
        .bind(order.created_at.naive_utc())
        .bind(order.updated_at.naive_utc())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(AppError::Conflict(
                "gateway payment is already recorded against an order".to_string(),
            )),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn insert_items(&self, order_id: Uuid, items: &[OrderItem]) -> Result<()> {
        let order_id_str = order_id.to_string();
        let mut tx = self.pool.begin().await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, product_name, product_image,
                    quantity, price_at_purchase_cents
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#
            )
            .bind(item.id.to_string())
            .bind(&order_id_str)
            .bind(item.product_id.to_string())
            .bind(&item.product_name)
            .bind(&item.product_image)
            .bind(item.quantity)
            .bind(item.price_at_purchase_cents)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_order(&self, id: Uuid) -> Result<()> {
        let id_str = id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM order_items WHERE order_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE id = ?",
            ORDER_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(self.hydrate(r).await?)),
            None => Ok(None)
        }
    }

    async fn find_by_gateway_payment_id(&self, gateway_payment_id: &str) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE gateway_payment_id = ?",
            ORDER_COLUMNS
        ))
        .bind(gateway_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(self.hydrate(r).await?)),
            None => Ok(None)
        }
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let now = at.naive_utc();
        let delivered_at = if to == OrderStatus::Delivered { Some(now) } else { None };

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = ?,
                delivered_at = COALESCE(?, delivered_at),
                updated_at = ?
            WHERE id = ? AND status = ?
            "#
        )
        .bind(to.as_str())
        .bind(delivered_at)
        .bind(now)
        .bind(id.to_string())
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn settle_cod_payment(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let now = at.naive_utc();
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_status = 'paid',
                paid_at = ?,
                updated_at = ?
            WHERE id = ? AND payment_method = 'cod' AND payment_status = 'pending'
            "#
        )
        .bind(now)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_eligible_for_payout(
        &self,
        cutoff: DateTime<Utc>,
        anchor: EligibilityAnchor,
    ) -> Result<Vec<EligibleOrder>> {
        let column = anchor.column();
        let sql = format!(
            r#"
            SELECT o.id, o.store_id, s.seller_id, o.total_price_cents
            FROM orders o
            JOIN stores s ON s.id = o.store_id
            WHERE o.status = 'delivered'
              AND o.{column} IS NOT NULL
              AND o.{column} <= ?
              AND NOT EXISTS (
                  SELECT 1 FROM payout_request_orders pro WHERE pro.order_id = o.id
              )
            ORDER BY s.seller_id, o.store_id, o.created_at
            "#,
            column = column
        );

        let rows = sqlx::query_as::<_, EligibleOrderRow>(&sql)
            .bind(cutoff.naive_utc())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                Ok(EligibleOrder {
                    order_id: Self::parse_uuid(&row.id)?,
                    store_id: Self::parse_uuid(&row.store_id)?,
                    seller_id: Self::parse_uuid(&row.seller_id)?,
                    total_price_cents: row.total_price_cents,
                })
            })
            .collect()
    }
}
