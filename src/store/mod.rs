//! The order store: the engine's only view of durable order state.
//!
//! Grounded on `original_source/kraken_grid/dao/order.go` for the operation
//! set (`CreateOrder`/`GetOrder`/`GetOrdersByBot`/`GetOpenOrders`/
//! `UpdateOrder`) and on `original_source/postgres/database.go` for the
//! transactional wrapping each operation gets.

pub mod postgres;

use async_trait::async_trait;

use crate::error::GridError;
use crate::model::{NewOrder, Order, OrderStatus};

/// Fields an update may change. `None` leaves a field untouched, mirroring
/// the Go source's dynamic `map[string]any` field set but keeping each field
/// typed.
#[derive(Debug, Clone, Default)]
pub struct OrderUpdate {
    pub exchange_order_id: Option<String>,
    pub status: Option<OrderStatus>,
}

impl OrderUpdate {
    /// An update that only sets the exchange-assigned order id, e.g. once
    /// `add_order` is acknowledged.
    #[must_use]
    pub fn exchange_order_id(id: impl Into<String>) -> Self {
        Self {
            exchange_order_id: Some(id.into()),
            status: None,
        }
    }

    /// An update that only transitions `order_status`.
    #[must_use]
    pub fn status(status: OrderStatus) -> Self {
        Self {
            exchange_order_id: None,
            status: Some(status),
        }
    }
}

/// The order store's contract, independent of the concrete database behind
/// it. The grid controller depends on this trait, not on `PostgresOrderStore`
/// directly, so tests can substitute a `mockall` fake.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order row, assigning it a `userref`. Inserted with
    /// `status = pending`; the caller transitions it to `new` once
    /// `add_order` is acknowledged.
    async fn create_order(&self, order: NewOrder) -> Result<Order, GridError>;

    /// Fetch a single order by its engine-assigned `userref`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OrderNotFound`] if no row matches.
    async fn get_order(&self, userref: i64) -> Result<Order, GridError>;

    /// All orders ever placed for `bot`, regardless of status.
    async fn get_orders_by_bot(&self, bot: &str) -> Result<Vec<Order>, GridError>;

    /// Orders for `bot` currently occupying a rung (`status = new`).
    async fn get_open_orders(&self, bot: &str) -> Result<Vec<Order>, GridError>;

    /// Apply a partial update to the row identified by `userref`.
    async fn update_order(&self, userref: i64, update: OrderUpdate) -> Result<(), GridError>;
}
