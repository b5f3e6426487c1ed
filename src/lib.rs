#![allow(
    clippy::module_name_repetitions,
    clippy::cast_sign_loss,
    rustdoc::broken_intra_doc_links
)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unused_must_use)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, allow(unused_attributes))]
#![cfg_attr(loom, allow(dead_code, unreachable_pub))]

//! A concurrent grid-trading engine against a spot exchange: ladder
//! maintenance, rebase on price drift, and order-store correlation via
//! `userref`.
//!
//! To start a bot, construct an [`config::EngineConfig`] from the
//! environment, an order store ([`store::postgres::PostgresOrderStore`]) and
//! an exchange adapter ([`exchange::KrakenAdapter`]), and hand them to
//! [`grid::GridController::new`].

pub mod config;
pub mod error;
pub mod exchange;
pub mod grid;
pub mod ladder;
pub mod model;
pub mod prelude;
pub mod store;
pub mod timer;
pub mod utils;

pub use config::EngineConfig;
pub use error::GridError;
pub use exchange::{ExchangeAdapter, KrakenAdapter};
pub use grid::{GridController, Status};
pub use ladder::LadderConfig;
pub use store::OrderStore;
