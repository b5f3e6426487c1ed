//! The pure, in-memory ladder model: rung spacing and the rebase cursor walk.
//!
//! Grounded on `original_source/kraken_grid/bot/order.go`'s `rebaseOrders`
//! (the cumulative buy/sell cursor walk) and `bot/websocket.go`'s
//! `handleTickerChannel` (the `multipliers[len-2]` threshold). Reimplemented
//! here as side-effect-free functions so the cursor math and the threshold
//! rule are unit-testable without a running engine.

use rust_decimal::Decimal;

use crate::error::GridError;
use crate::model::OrderSide;

/// Immutable, per-instance ladder configuration (spec §3's `LadderConfig`).
#[derive(Debug, Clone)]
pub struct LadderConfig {
    pub base_coin: String,
    pub quote_coin: String,
    /// Unit price distance per unit-multiplier rung. Must be `> 0`.
    pub step: Decimal,
    /// Fixed order quantity placed at every rung. Must be `> 0`.
    pub amount: Decimal,
    /// Sorted, unique, positive rung identifiers. `len() >= 2` is required.
    pub multipliers: Vec<i32>,
    /// Seconds a deviation must persist before `rebase_orders` fires.
    pub interval_s: u64,
}

impl LadderConfig {
    /// Validate and construct a `LadderConfig`, sorting `multipliers`
    /// ascending as the source environment-variable parser does.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Lifecycle`] if `step`/`amount` are not positive,
    /// if any multiplier is not positive, if multipliers are not unique, or
    /// if fewer than two multipliers are given (the threshold computation in
    /// [`rebase_threshold`] is undefined below that).
    pub fn new(
        base_coin: impl Into<String>,
        quote_coin: impl Into<String>,
        step: Decimal,
        amount: Decimal,
        mut multipliers: Vec<i32>,
        interval_s: u64,
    ) -> Result<Self, GridError> {
        if step <= Decimal::ZERO {
            return Err(GridError::Lifecycle("step must be > 0".to_owned()));
        }
        if amount <= Decimal::ZERO {
            return Err(GridError::Lifecycle("amount must be > 0".to_owned()));
        }
        if multipliers.iter().any(|m| *m <= 0) {
            return Err(GridError::Lifecycle(
                "all multipliers must be positive".to_owned(),
            ));
        }
        multipliers.sort_unstable();
        multipliers.dedup();
        if multipliers.len() < 2 {
            return Err(GridError::Lifecycle(
                "at least 2 multipliers are required".to_owned(),
            ));
        }

        Ok(Self {
            base_coin: base_coin.into(),
            quote_coin: quote_coin.into(),
            step,
            amount,
            multipliers,
            interval_s,
        })
    }

    /// `"{base_coin}/{quote_coin}"`, the bot's pair label.
    #[must_use]
    pub fn pair(&self) -> String {
        format!("{}/{}", self.base_coin, self.quote_coin)
    }
}

/// `threshold = step * multipliers[len-2]`, the deviation past which the
/// rebase timer arms. `cfg.multipliers.len() >= 2` is enforced at
/// construction, so this never returns `None` for a validated config; it
/// stays fallible so callers built from untrusted config don't have to
/// `unwrap`.
#[must_use]
pub fn rebase_threshold(cfg: &LadderConfig) -> Option<Decimal> {
    if cfg.multipliers.len() < 2 {
        return None;
    }
    let second_largest = cfg.multipliers[cfg.multipliers.len() - 2];
    Some(cfg.step * Decimal::from(second_largest))
}

/// One rung to be placed during a rebase: a side, its identifying
/// multiplier, and the absolute price to place it at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rung {
    pub side: OrderSide,
    pub multiplier: i32,
    pub price: Decimal,
}

/// Walk `cfg.multipliers` in ascending order, accumulating a buy cursor
/// downward and a sell cursor upward from `base_price`, per spec §4.2's
/// rebase algorithm. Rung `k`'s distance from `base_price` is
/// `step * sum(multipliers[..=k])`.
#[must_use]
pub fn rebase_rungs(cfg: &LadderConfig, base_price: Decimal) -> Vec<Rung> {
    let mut buy_cursor = base_price;
    let mut sell_cursor = base_price;
    let mut rungs = Vec::with_capacity(cfg.multipliers.len() * 2);

    for &multiplier in &cfg.multipliers {
        let offset = cfg.step * Decimal::from(multiplier);
        buy_cursor -= offset;
        sell_cursor += offset;

        rungs.push(Rung {
            side: OrderSide::Buy,
            multiplier,
            price: buy_cursor,
        });
        rungs.push(Rung {
            side: OrderSide::Sell,
            multiplier,
            price: sell_cursor,
        });
    }

    rungs
}

/// The mirror price placed when an order fills: `price + step*multiplier`
/// for a buy (mirrored to a sell above it), `price - step*multiplier` for a
/// sell (mirrored to a buy below it).
#[must_use]
pub fn mirror_price(step: Decimal, side: OrderSide, price: Decimal, multiplier: i32) -> Decimal {
    let offset = step * Decimal::from(multiplier);
    match side {
        OrderSide::Buy => price + offset,
        OrderSide::Sell => price - offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cfg(multipliers: Vec<i32>) -> LadderConfig {
        LadderConfig::new("BTC", "USD", dec!(0.00005), dec!(1), multipliers, 600).unwrap()
    }

    #[test]
    fn rejects_single_multiplier() {
        let err = LadderConfig::new("BTC", "USD", dec!(0.00005), dec!(1), vec![1], 600);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_non_positive_step() {
        let err = LadderConfig::new("BTC", "USD", dec!(0), dec!(1), vec![1, 2], 600);
        assert!(err.is_err());
    }

    #[test]
    fn sorts_and_dedups_multipliers() {
        let c = LadderConfig::new("BTC", "USD", dec!(0.00005), dec!(1), vec![8, 1, 1], 600)
            .unwrap();
        assert_eq!(c.multipliers, vec![1, 8]);
    }

    #[test]
    fn threshold_uses_second_largest_multiplier() {
        let c = cfg(vec![1, 1, 8]);
        assert_eq!(rebase_threshold(&c), Some(dec!(0.00005) * dec!(1)));
    }

    #[test]
    fn rebase_rungs_walk_cumulative_offsets() {
        let c = cfg(vec![1, 1, 8]);
        let rungs = rebase_rungs(&c, dec!(0.0205));

        let buys: Vec<Decimal> = rungs
            .iter()
            .filter(|r| r.side == OrderSide::Buy)
            .map(|r| r.price)
            .collect();
        let sells: Vec<Decimal> = rungs
            .iter()
            .filter(|r| r.side == OrderSide::Sell)
            .map(|r| r.price)
            .collect();

        assert_eq!(buys, vec![dec!(0.0205) - dec!(0.00005), dec!(0.0205) - dec!(0.0001), dec!(0.0205) - dec!(0.00045)]);
        assert_eq!(sells, vec![dec!(0.0205) + dec!(0.00005), dec!(0.0205) + dec!(0.0001), dec!(0.0205) + dec!(0.00045)]);
    }

    #[test]
    fn mirror_price_flips_buy_to_higher_sell() {
        let price = mirror_price(dec!(0.00005), OrderSide::Buy, dec!(0.01999), 1);
        assert_eq!(price, dec!(0.02004));
    }

    #[test]
    fn mirror_price_flips_sell_to_lower_buy() {
        let price = mirror_price(dec!(0.00005), OrderSide::Sell, dec!(0.02004), 1);
        assert_eq!(price, dec!(0.01999));
    }
}
