//! Environment-driven configuration.
//!
//! Grounded on the teacher's `utils/config.rs` plain-struct `Config`
//! (no CLI/config-file framework) and on the variable list in
//! `original_source`'s `kraken_grid/server` package, minus the `GRPC_ADDR`
//! transport concern this crate leaves to its caller.

use std::env;
use std::str::FromStr;

use rust_decimal::Decimal;
use url::Url;

use crate::error::GridError;
use crate::ladder::LadderConfig;

/// Everything needed to construct one running engine instance: the ladder's
/// immutable shape plus the effectful collaborators (DB, exchange
/// credentials, transport URLs).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub base_coin: String,
    pub quote_coin: String,
    pub step: Decimal,
    pub amount: Decimal,
    /// Optional starting price; if unset, the first ticker frame seeds it.
    pub base_price: Option<Decimal>,
    pub interval_s: u64,
    pub multipliers: Vec<i32>,
    pub db_dsn: String,
    pub exchange_key: String,
    pub exchange_secret: String,
    pub rest_url: Url,
    pub ws_public_url: Url,
    pub ws_private_url: Url,
}

impl EngineConfig {
    /// Load from the process environment, using the same variable names the
    /// bot this crate descends from read: `BASE_COIN`, `QUOTE_COIN`,
    /// `GRID_STEP`, `GRID_AMOUNT`, `BASE_PRICE` (optional), `GRID_INTERVAL`,
    /// `MULTIPLIERS`, `DB_DSN`, `KEY`, `SECRET`, `REST_URL`,
    /// `WS_PUBLIC_URL`, `WS_PRIVATE_URL`.
    ///
    /// `GRPC_ADDR` and `DB_DRIVER` are intentionally not read here: the
    /// former belongs to the out-of-scope transport binary, the latter has
    /// no meaning once the store is fixed to Postgres via `sqlx`.
    pub fn from_env() -> Result<Self, GridError> {
        Ok(Self {
            base_coin: required("BASE_COIN")?,
            quote_coin: required("QUOTE_COIN")?,
            step: parse_required("GRID_STEP")?,
            amount: parse_required("GRID_AMOUNT")?,
            base_price: parse_optional("BASE_PRICE")?,
            interval_s: parse_required("GRID_INTERVAL")?,
            multipliers: parse_multipliers("MULTIPLIERS")?,
            db_dsn: required("DB_DSN")?,
            exchange_key: required("KEY")?,
            exchange_secret: required("SECRET")?,
            rest_url: parse_required("REST_URL")?,
            ws_public_url: parse_required("WS_PUBLIC_URL")?,
            ws_private_url: parse_required("WS_PRIVATE_URL")?,
        })
    }

    /// Derive the pure [`LadderConfig`] this engine instance places rungs
    /// with, validating the cross-field invariants (`step`/`amount` > 0,
    /// `multipliers` sorted unique with `len >= 2`) in one place.
    pub fn ladder_config(&self) -> Result<LadderConfig, GridError> {
        LadderConfig::new(
            self.base_coin.clone(),
            self.quote_coin.clone(),
            self.step,
            self.amount,
            self.multipliers.clone(),
            self.interval_s,
        )
    }
}

fn required(name: &str) -> Result<String, GridError> {
    env::var(name).map_err(|_| GridError::Lifecycle(format!("missing required env var {name}")))
}

fn parse_required<T>(name: &str) -> Result<T, GridError>
where
    T: FromStr,
{
    let raw = required(name)?;
    raw.parse()
        .map_err(|_| GridError::Lifecycle(format!("invalid value for env var {name}: {raw}")))
}

fn parse_optional<T>(name: &str) -> Result<Option<T>, GridError>
where
    T: FromStr,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| GridError::Lifecycle(format!("invalid value for env var {name}: {raw}"))),
        Err(_) => Ok(None),
    }
}

fn parse_multipliers(name: &str) -> Result<Vec<i32>, GridError> {
    let raw = required(name)?;
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|part| {
            part.parse::<i32>()
                .map_err(|_| GridError::Lifecycle(format!("invalid multiplier in {name}: {part}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_multipliers_splits_and_trims() {
        env::set_var("TEST_MULTIPLIERS", "1, 1 ,8");
        assert_eq!(
            parse_multipliers("TEST_MULTIPLIERS").unwrap(),
            vec![1, 1, 8]
        );
        env::remove_var("TEST_MULTIPLIERS");
    }

    #[test]
    fn required_missing_var_is_lifecycle_error() {
        env::remove_var("TEST_MISSING_VAR_XYZ");
        assert!(required("TEST_MISSING_VAR_XYZ").is_err());
    }

    #[test]
    fn parse_optional_absent_var_is_none() {
        env::remove_var("TEST_OPTIONAL_ABSENT");
        let value: Option<Decimal> = parse_optional("TEST_OPTIONAL_ABSENT").unwrap();
        assert_eq!(value, None);
    }
}
