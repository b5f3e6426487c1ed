//! The `Order` row and its small value types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::GridError;

/// Which side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    /// Resting below the base price.
    Buy,
    /// Resting above the base price.
    Sell,
}

impl OrderSide {
    /// The wire/DB representation, e.g. for `add_order`'s `side` field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }

    /// The mirror side placed when an order on this side fills.
    #[must_use]
    pub fn opposite(self) -> OrderSide {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            other => Err(GridError::Validation(format!(
                "Invalid order side: {other}"
            ))),
        }
    }
}

/// The lifecycle status of an order row.
///
/// `exec_type` on the wire is an open string vocabulary (the exchange may add
/// statuses the engine has never seen); `Other` preserves whatever arrives
/// rather than failing to decode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    /// Inserted locally, `add_order` not yet acknowledged.
    Pending,
    /// Acknowledged and resting on the book.
    New,
    /// Fully filled; terminal for ladder-occupancy purposes.
    Filled,
    /// Cancelled; terminal for ladder-occupancy purposes.
    Cancelled,
    /// Any other `exec_type` the exchange reports.
    Other(String),
}

impl OrderStatus {
    /// Whether this status occupies a `(bot, multiplier, side)` rung, i.e.
    /// counts toward the ladder-occupancy invariant in §3.
    #[must_use]
    pub fn occupies_rung(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::New)
    }

    /// The DB/wire string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::New => "new",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for OrderStatus {
    fn from(value: &str) -> Self {
        match value {
            "pending" => OrderStatus::Pending,
            "new" => OrderStatus::New,
            "filled" => OrderStatus::Filled,
            "cancelled" => OrderStatus::Cancelled,
            other => OrderStatus::Other(other.to_owned()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        OrderStatus::from(value.as_str())
    }
}

/// One resting (or historical) order row, as persisted in the order store.
#[derive(Debug, Clone)]
pub struct Order {
    /// Engine-assigned primary key, sent to the exchange as `order_userref`.
    pub userref: i64,
    /// Assigned by the exchange once `add_order` is acknowledged.
    pub exchange_order_id: Option<String>,
    /// Pair label the bot trades, e.g. `"BTC/USD"`.
    pub bot: String,
    /// Exchange identifier, e.g. `"kraken"`.
    pub exchange: String,
    /// `base_coin/quote_coin`.
    pub pair: String,
    /// Limit price, rounded to 6 decimal places at placement time.
    pub price: Decimal,
    /// Order quantity; fixed per rung (`LadderConfig::amount`).
    pub amount: Decimal,
    pub side: OrderSide,
    /// Rung identifier; scales the rung's distance from the base price.
    pub multiplier: i32,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields needed to place a new order, before the store has assigned a
/// `userref` or the exchange has acknowledged it.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub bot: String,
    pub exchange: String,
    pub pair: String,
    pub price: Decimal,
    pub amount: Decimal,
    pub side: OrderSide,
    pub multiplier: i32,
}

impl NewOrder {
    /// Round `price` to 6 decimal places, per §4.2's placement rule.
    #[must_use]
    pub fn rounded_price(&self) -> Decimal {
        self.price.round_dp(6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_side_round_trips_through_its_wire_string() {
        assert_eq!("buy".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!("sell".parse::<OrderSide>().unwrap(), OrderSide::Sell);
        assert_eq!(OrderSide::Buy.as_str(), "buy");
    }

    #[test]
    fn order_side_rejects_unknown_string() {
        let err = "hold".parse::<OrderSide>().unwrap_err();
        assert_eq!(err.to_string(), "validation failed: Invalid order side: hold");
    }

    #[test]
    fn order_side_opposite_flips() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test]
    fn order_status_preserves_unknown_exec_types() {
        let status = OrderStatus::from("partially_filled");
        assert_eq!(status, OrderStatus::Other("partially_filled".to_owned()));
        assert!(!status.occupies_rung());
    }

    #[test]
    fn order_status_occupies_rung_only_while_pending_or_new() {
        assert!(OrderStatus::Pending.occupies_rung());
        assert!(OrderStatus::New.occupies_rung());
        assert!(!OrderStatus::Filled.occupies_rung());
        assert!(!OrderStatus::Cancelled.occupies_rung());
    }

    #[test]
    fn new_order_rounds_price_to_six_places() {
        let order = NewOrder {
            bot: "BTC/USD".to_owned(),
            exchange: "kraken".to_owned(),
            pair: "BTC/USD".to_owned(),
            price: dec!(0.0205123456),
            amount: dec!(1),
            side: OrderSide::Buy,
            multiplier: 1,
        };
        assert_eq!(order.rounded_price(), dec!(0.020512));
    }
}
