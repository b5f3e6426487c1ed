//! Data shapes shared by the order store and the grid controller.

pub mod order;

pub use order::{NewOrder, Order, OrderSide, OrderStatus};
