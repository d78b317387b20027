use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use domain::{Money, NewOrder, Order, OrderItem, OrderStatus};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    Result, StoreError,
    store::{OrderStore, validate_new_order},
};

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

/// Header columns of an order row, before its items are attached.
struct OrderHeader {
    id: OrderId,
    user_id: UserId,
    total_amount: Money,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

impl OrderHeader {
    fn with_items(self, items: Vec<OrderItem>) -> Order {
        Order::from_parts(
            self.id,
            self.user_id,
            items,
            self.total_amount,
            self.status,
            self.created_at,
        )
    }
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_header(row: &PgRow) -> Result<OrderHeader> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;

        Ok(OrderHeader {
            id: OrderId::new(row.try_get("order_id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
            status,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_item(row: &PgRow) -> Result<OrderItem> {
        let quantity: i32 = row.try_get("quantity")?;
        let quantity = u32::try_from(quantity)
            .map_err(|_| StoreError::InvalidData(format!("negative quantity {quantity}")))?;

        Ok(OrderItem::new(
            ProductId::new(row.try_get("product_id")?),
            quantity,
        ))
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create_order(&self, order: NewOrder) -> Result<OrderId> {
        validate_new_order(&order)?;

        let line_numbers: Vec<i32> = (1..).take(order.items.len()).collect();
        let product_ids: Vec<i64> = order.items.iter().map(|i| i.product_id.as_i64()).collect();
        let quantities = order
            .items
            .iter()
            .map(|i| {
                i32::try_from(i.quantity).map_err(|_| {
                    StoreError::InvalidData(format!("quantity {} out of range", i.quantity))
                })
            })
            .collect::<Result<Vec<i32>>>()?;

        // Dropping the transaction on any early return rolls it back
        let mut tx = self.pool.begin().await?;

        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO orders (user_id, total_amount_cents, status, created_at, payment_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (payment_id) DO NOTHING
            RETURNING order_id
            "#,
        )
        .bind(order.user_id.as_i64())
        .bind(order.total_amount.cents())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.payment_id.as_deref())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order_id) = inserted else {
            // Only a non-null payment id can conflict
            let payment_id = order.payment_id.unwrap_or_default();
            let existing: i64 =
                sqlx::query_scalar("SELECT order_id FROM orders WHERE payment_id = $1")
                    .bind(&payment_id)
                    .fetch_one(&mut *tx)
                    .await?;
            return Err(StoreError::DuplicatePayment {
                payment_id,
                order_id: OrderId::new(existing),
            });
        };

        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, line_number, product_id, quantity)
            SELECT $1::BIGINT, u.line_number, u.product_id, u.quantity
            FROM UNNEST($2::INT[], $3::BIGINT[], $4::INT[]) AS u(line_number, product_id, quantity)
            "#,
        )
        .bind(order_id)
        .bind(&line_numbers)
        .bind(&product_ids)
        .bind(&quantities)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        metrics::counter!("order_store_orders_written_total").increment(1);
        tracing::debug!(order_id, items = line_numbers.len(), "order committed");

        Ok(OrderId::new(order_id))
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT order_id, user_id, total_amount_cents, status, created_at
            FROM orders
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let header = Self::row_to_header(&row)?;

        let item_rows = sqlx::query(
            r#"
            SELECT product_id, quantity
            FROM order_items
            WHERE order_id = $1
            ORDER BY line_number ASC
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        let items = item_rows
            .iter()
            .map(Self::row_to_item)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(header.with_items(items)))
    }

    async fn list_orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let header_rows = sqlx::query(
            r#"
            SELECT order_id, user_id, total_amount_cents, status, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, order_id DESC
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        let headers = header_rows
            .iter()
            .map(Self::row_to_header)
            .collect::<Result<Vec<_>>>()?;
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<i64> = headers.iter().map(|h| h.id.as_i64()).collect();
        let item_rows = sqlx::query(
            r#"
            SELECT order_id, product_id, quantity
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id ASC, line_number ASC
            "#,
        )
        .bind(&order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items_by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in &item_rows {
            let order_id: i64 = row.try_get("order_id")?;
            items_by_order
                .entry(order_id)
                .or_default()
                .push(Self::row_to_item(row)?);
        }

        Ok(headers
            .into_iter()
            .map(|header| {
                let items = items_by_order
                    .remove(&header.id.as_i64())
                    .unwrap_or_default();
                header.with_items(items)
            })
            .collect())
    }
}
