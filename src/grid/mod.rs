//! The grid controller: the engine's state machine and concurrency root.
//!
//! Grounded on `original_source/kraken_grid/bot/bot.go`'s `GridBot`
//! (`status` atomic, `stopChan`, `listenStop`, `mainloop`) for the
//! lifecycle shape, and on the teacher's `controller.rs` for the
//! `Arc<Mutex<UnboundedSender<_>>>` channel-endpoint and `JoinHandle`
//! bookkeeping idioms — without the typestate builder, since this engine
//! has exactly one fixed set of collaborators rather than an
//! auth/websocket permutation to encode at the type level.

mod dispatch;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::GridError;
use crate::exchange::ExchangeAdapter;
use crate::ladder::LadderConfig;
use crate::model::{NewOrder, OrderSide};
use crate::prelude::MessageSender;
use crate::store::OrderStore;

/// The engine's lifecycle status, as reported by `Status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Stopped,
    Running,
    Error(String),
}

fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn f64_to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

/// The moving base price, stored lock-free as the bit pattern of an `f64`
/// (the safe replacement for the original's `unsafe.Pointer` cast over
/// `atomic.Uint64`).
#[derive(Debug)]
struct BasePrice(AtomicU64);

impl BasePrice {
    fn new(initial: Decimal) -> Self {
        Self(AtomicU64::new(decimal_to_f64(initial).to_bits()))
    }

    fn load(&self) -> Decimal {
        f64_to_decimal(f64::from_bits(self.0.load(Ordering::Acquire)))
    }

    fn store(&self, value: Decimal) {
        self.0.store(decimal_to_f64(value).to_bits(), Ordering::Release);
    }
}

/// The runtime handles that exist only while the engine is `Running`.
struct RuntimeHandles {
    token: String,
    private_outbound: MessageSender,
    dispatcher: JoinHandle<()>,
}

/// The grid controller: one instance per running (bot, exchange, pair).
///
/// Generic over its collaborators so tests can substitute `mockall` fakes
/// for [`OrderStore`] and [`ExchangeAdapter`].
pub struct GridController<S, E> {
    store: Arc<S>,
    exchange: Arc<E>,
    ladder: LadderConfig,
    pair: String,
    base_price: BasePrice,
    status: Mutex<Status>,
    runtime: Mutex<Option<RuntimeHandles>>,
}

impl<S, E> GridController<S, E>
where
    S: OrderStore + 'static,
    E: ExchangeAdapter + 'static,
{
    /// Construct a controller for one `(store, exchange, ladder)` triple.
    /// `initial_base_price` seeds the base price; if the ladder config's
    /// environment did not supply one, the first ticker frame should seed
    /// it instead via [`GridController::set_base_price`].
    #[must_use]
    pub fn new(
        store: Arc<S>,
        exchange: Arc<E>,
        ladder: LadderConfig,
        initial_base_price: Decimal,
    ) -> Self {
        let pair = ladder.pair();
        Self {
            store,
            exchange,
            ladder,
            pair,
            base_price: BasePrice::new(initial_base_price),
            status: Mutex::new(Status::Stopped),
            runtime: Mutex::new(None),
        }
    }

    /// The pair label this controller trades, e.g. `"BTC/USD"`.
    #[must_use]
    pub fn pair(&self) -> &str {
        &self.pair
    }

    /// Current base price.
    #[must_use]
    pub fn base_price(&self) -> Decimal {
        self.base_price.load()
    }

    /// `Status` RPC: the engine's current lifecycle state.
    pub async fn status(&self) -> Status {
        self.status.lock().await.clone()
    }

    /// `SetBasePrice` RPC: overwrite the base price directly, bypassing the
    /// rebase timer. Does not itself trigger a rebase.
    pub fn set_base_price(&self, price: Decimal) {
        self.base_price.store(price);
    }

    /// `Run` RPC: issue a websocket token, open the private session,
    /// subscribe to executions, and start the Dispatcher task.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Lifecycle`] if the engine is already running.
    /// Propagates any token/connect/subscribe failure, leaving the engine
    /// `Stopped`.
    pub async fn run(self: &Arc<Self>) -> Result<(), GridError> {
        {
            let mut status = self.status.lock().await;
            if *status == Status::Running {
                return Err(GridError::Lifecycle(
                    "grid controller is already running".to_owned(),
                ));
            }
            *status = Status::Running;
        }

        if let Err(err) = self.start_session().await {
            let mut status = self.status.lock().await;
            *status = Status::Error(err.to_string());
            return Err(err);
        }

        Ok(())
    }

    async fn start_session(self: &Arc<Self>) -> Result<(), GridError> {
        let (frame_tx, frame_rx) = futures_channel::mpsc::unbounded();
        let frame_tx = Arc::new(Mutex::new(frame_tx));

        let token = self.exchange.get_token().await?;
        let private_outbound = self.exchange.connect_private(Arc::clone(&frame_tx)).await?;
        self.exchange
            .subscribe_executions(&private_outbound, &token)
            .await?;

        log::info!("grid controller started for {}", self.pair);

        let dispatcher = {
            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.dispatch_loop(frame_rx).await;
            })
        };

        *self.runtime.lock().await = Some(RuntimeHandles {
            token,
            private_outbound,
            dispatcher,
        });

        Ok(())
    }

    /// `Stop` RPC: transition to `Stopped` and tear down the running
    /// session, mirroring `GridBot.listenStop`'s close-and-stop sequence.
    pub async fn stop(&self, reason: impl Into<String>) {
        let reason = reason.into();
        log::error!("stopping grid controller for {}: {reason}", self.pair);

        {
            let mut status = self.status.lock().await;
            *status = Status::Stopped;
        }

        if let Some(handles) = self.runtime.lock().await.take() {
            handles.dispatcher.abort();
            drop(handles.private_outbound);
        }
    }

    /// Demote the engine to `Error(reason)` and tear down the running
    /// session, the fatal-fault counterpart to `stop`: a protocol or
    /// persistence failure leaves the engine reporting why it died rather
    /// than quietly `Stopped`.
    pub(super) async fn fail(&self, reason: impl Into<String>) {
        let reason = reason.into();
        log::error!("grid controller for {} entering error state: {reason}", self.pair);

        {
            let mut status = self.status.lock().await;
            *status = Status::Error(reason);
        }

        if let Some(handles) = self.runtime.lock().await.take() {
            handles.dispatcher.abort();
            drop(handles.private_outbound);
        }
    }

    /// `PlaceOrder` RPC: persist a new order row and place it with the
    /// exchange. Used both for externally requested placements and
    /// internally for rebase/fill-mirror placements.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Validation`] if `amount`/`price` are not
    /// positive. Propagates store or exchange-send failures.
    pub async fn place_order(
        &self,
        side: OrderSide,
        price: Decimal,
        multiplier: i32,
    ) -> Result<(), GridError> {
        if price <= Decimal::ZERO {
            return Err(GridError::Validation(
                "Invalid price: must be positive".to_owned(),
            ));
        }
        if multiplier <= 0 {
            return Err(GridError::Validation(
                "Invalid multiplier: must be positive".to_owned(),
            ));
        }

        let new_order = NewOrder {
            bot: self.pair.clone(),
            exchange: "kraken".to_owned(),
            pair: self.pair.clone(),
            price,
            amount: self.ladder.amount,
            side,
            multiplier,
        };

        let order = self.store.create_order(new_order).await?;

        let runtime = self.runtime.lock().await;
        let Some(ref handles) = *runtime else {
            return Err(GridError::Lifecycle(
                "cannot place an order while stopped".to_owned(),
            ));
        };

        self.exchange
            .add_order(
                &handles.private_outbound,
                &self.pair,
                &handles.token,
                side,
                self.ladder.amount,
                order.price,
                order.userref,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::exchange::MockExchangeAdapter;
    use crate::model::{Order, OrderStatus};
    use crate::store::MockOrderStore;

    use super::*;

    fn sample_order(userref: i64, side: OrderSide, price: Decimal, multiplier: i32) -> Order {
        Order {
            userref,
            exchange_order_id: None,
            bot: "BTC/USD".to_owned(),
            exchange: "kraken".to_owned(),
            pair: "BTC/USD".to_owned(),
            price,
            amount: dec!(1),
            side,
            multiplier,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ladder() -> LadderConfig {
        LadderConfig::new("BTC", "USD", dec!(0.00005), dec!(1), vec![1, 8], 600).unwrap()
    }

    fn running_exchange() -> MockExchangeAdapter {
        let mut exchange = MockExchangeAdapter::new();
        exchange
            .expect_get_token()
            .returning(|| Ok("token".to_owned()));
        exchange.expect_connect_private().returning(|_frames| {
            let (tx, _rx) = futures_channel::mpsc::unbounded();
            Ok(Arc::new(Mutex::new(tx)))
        });
        exchange
            .expect_subscribe_executions()
            .returning(|_, _| Ok(()));
        exchange
    }

    #[tokio::test]
    async fn new_controller_starts_stopped() {
        let controller = GridController::new(
            Arc::new(MockOrderStore::new()),
            Arc::new(MockExchangeAdapter::new()),
            ladder(),
            dec!(0.02),
        );
        assert_eq!(controller.status().await, Status::Stopped);
    }

    #[tokio::test]
    async fn run_starts_session_and_rejects_double_run() {
        let controller = Arc::new(GridController::new(
            Arc::new(MockOrderStore::new()),
            Arc::new(running_exchange()),
            ladder(),
            dec!(0.02),
        ));

        controller.run().await.unwrap();
        assert_eq!(controller.status().await, Status::Running);

        let err = controller.run().await.unwrap_err();
        assert!(matches!(err, GridError::Lifecycle(_)));
    }

    #[tokio::test]
    async fn run_failure_reverts_to_error_status() {
        let mut exchange = MockExchangeAdapter::new();
        exchange
            .expect_get_token()
            .returning(|| Err(GridError::Auth("rejected".to_owned())));

        let controller = Arc::new(GridController::new(
            Arc::new(MockOrderStore::new()),
            Arc::new(exchange),
            ladder(),
            dec!(0.02),
        ));

        let err = controller.run().await.unwrap_err();
        assert!(matches!(err, GridError::Auth(_)));
        assert!(matches!(controller.status().await, Status::Error(_)));
    }

    #[tokio::test]
    async fn place_order_rejects_non_positive_price() {
        let controller = GridController::new(
            Arc::new(MockOrderStore::new()),
            Arc::new(MockExchangeAdapter::new()),
            ladder(),
            dec!(0.02),
        );

        let err = controller
            .place_order(OrderSide::Buy, dec!(0), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, GridError::Validation(_)));
    }

    #[tokio::test]
    async fn place_order_rejects_non_positive_multiplier() {
        let controller = GridController::new(
            Arc::new(MockOrderStore::new()),
            Arc::new(MockExchangeAdapter::new()),
            ladder(),
            dec!(0.02),
        );

        let err = controller
            .place_order(OrderSide::Buy, dec!(0.019), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, GridError::Validation(_)));
    }

    #[tokio::test]
    async fn place_order_while_stopped_is_lifecycle_error() {
        let mut store = MockOrderStore::new();
        store.expect_create_order().returning(|new_order| {
            Ok(sample_order(
                1,
                new_order.side,
                new_order.price,
                new_order.multiplier,
            ))
        });

        let controller = GridController::new(
            Arc::new(store),
            Arc::new(MockExchangeAdapter::new()),
            ladder(),
            dec!(0.02),
        );

        let err = controller
            .place_order(OrderSide::Buy, dec!(0.019), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, GridError::Lifecycle(_)));
    }

    #[tokio::test]
    async fn stop_clears_runtime_and_sets_stopped() {
        let controller = Arc::new(GridController::new(
            Arc::new(MockOrderStore::new()),
            Arc::new(running_exchange()),
            ladder(),
            dec!(0.02),
        ));

        controller.run().await.unwrap();
        controller.stop("test teardown").await;
        assert_eq!(controller.status().await, Status::Stopped);
        assert!(controller.runtime.lock().await.is_none());
    }
}
