//! `sqlx`-backed `OrderStore`, one `orders` row per order.
//!
//! Each method opens its own transaction and commits on success, rolling
//! back on any error, the same shape as `original_source`'s
//! `DatabaseImpl.transact` (minus the panic-recovery branch: a Rust panic
//! unwinding through an un-committed [`sqlx::Transaction`] already rolls
//! back on drop).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::GridError;
use crate::model::{NewOrder, Order, OrderSide, OrderStatus};

use super::{OrderStore, OrderUpdate};

/// The row shape returned by every query below; `sqlx::FromRow` maps it
/// straight off column names.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    order_id: Option<String>,
    bot: String,
    exchange: String,
    pair: String,
    price: Decimal,
    amount: Decimal,
    side: String,
    multiplier: i32,
    order_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = GridError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            userref: row.id,
            exchange_order_id: row.order_id,
            bot: row.bot,
            exchange: row.exchange,
            pair: row.pair,
            price: row.price,
            amount: row.amount,
            side: row.side.parse::<OrderSide>()?,
            multiplier: row.multiplier,
            status: OrderStatus::from(row.order_status),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ORDER_COLUMNS: &str =
    "id, order_id, bot, exchange, pair, price, amount, side, multiplier, order_status, created_at, updated_at";

/// A `PgPool`-backed [`OrderStore`].
#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Wrap an already-open pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `dsn`, the way `EngineConfig::db_dsn` is read.
    pub async fn connect(dsn: &str) -> Result<Self, GridError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(dsn)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order, GridError> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "INSERT INTO orders (bot, exchange, pair, price, amount, side, multiplier, order_status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending') RETURNING {ORDER_COLUMNS}"
        );
        let result = sqlx::query_as::<_, OrderRow>(&query)
            .bind(&order.bot)
            .bind(&order.exchange)
            .bind(&order.pair)
            .bind(order.rounded_price())
            .bind(order.amount)
            .bind(order.side.as_str())
            .bind(order.multiplier)
            .fetch_one(&mut *tx)
            .await;

        match result {
            Ok(row) => {
                tx.commit().await?;
                row.try_into()
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    log::warn!("error during rollback: {rollback_err}");
                }
                Err(err.into())
            }
        }
    }

    async fn get_order(&self, userref: i64) -> Result<Order, GridError> {
        let mut tx = self.pool.begin().await?;

        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let result = sqlx::query_as::<_, OrderRow>(&query)
            .bind(userref)
            .fetch_optional(&mut *tx)
            .await;

        tx.commit().await?;
        match result? {
            Some(row) => row.try_into(),
            None => Err(GridError::OrderNotFound(userref)),
        }
    }

    async fn get_orders_by_bot(&self, bot: &str) -> Result<Vec<Order>, GridError> {
        let mut tx = self.pool.begin().await?;

        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE bot = $1");
        let rows = sqlx::query_as::<_, OrderRow>(&query)
            .bind(bot)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn get_open_orders(&self, bot: &str) -> Result<Vec<Order>, GridError> {
        let mut tx = self.pool.begin().await?;

        let query =
            format!("SELECT {ORDER_COLUMNS} FROM orders WHERE bot = $1 AND order_status = 'new'");
        let rows = sqlx::query_as::<_, OrderRow>(&query)
            .bind(bot)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_order(&self, userref: i64, update: OrderUpdate) -> Result<(), GridError> {
        let mut tx = self.pool.begin().await?;

        let mut builder = sqlx::QueryBuilder::new("UPDATE orders SET ");
        let mut separated = builder.separated(", ");
        if let Some(ref order_id) = update.exchange_order_id {
            separated.push("order_id = ");
            separated.push_bind_unseparated(order_id.clone());
        }
        if let Some(ref status) = update.status {
            separated.push("order_status = ");
            separated.push_bind_unseparated(status.as_str().to_owned());
        }
        separated.push("updated_at = now()");
        builder.push(" WHERE id = ");
        builder.push_bind(userref);

        let result = builder.build().execute(&mut *tx).await;

        match result {
            Ok(_) => {
                tx.commit().await?;
                Ok(())
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    log::warn!("error during rollback: {rollback_err}");
                }
                Err(err.into())
            }
        }
    }
}
