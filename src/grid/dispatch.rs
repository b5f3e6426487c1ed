//! The Dispatcher task: consumes decoded frames and drives the ladder.
//!
//! Grounded on `original_source/kraken_grid/bot/websocket.go`'s
//! `handleTickerChannel` (rebase-on-deviation) and
//! `handleExecutionsChannel`/`handleOrderFilled` (order-store correlation
//! and fill-mirroring).

use std::sync::Arc;
use std::time::Duration;

use futures_channel::mpsc::UnboundedReceiver;
use futures_util::StreamExt;
use rust_decimal::Decimal;

use crate::error::GridError;
use crate::exchange::protocol::{ExecutionUpdate, InboundFrame};
use crate::exchange::ExchangeAdapter;
use crate::ladder::{mirror_price, rebase_rungs, rebase_threshold};
use crate::model::OrderStatus;
use crate::store::{OrderStore, OrderUpdate};
use crate::timer::RebaseTimer;

use super::GridController;

impl<S, E> GridController<S, E>
where
    S: OrderStore + 'static,
    E: ExchangeAdapter + 'static,
{
    pub(super) async fn dispatch_loop(
        self: Arc<Self>,
        mut frames: UnboundedReceiver<InboundFrame>,
    ) {
        let mut timer = RebaseTimer::new(Duration::from_secs(self.ladder.interval_s));
        let threshold = rebase_threshold(&self.ladder).unwrap_or(Decimal::ZERO);

        while let Some(frame) = frames.next().await {
            if let Err(err) = self.handle_frame(frame, &mut timer, threshold).await {
                if err.is_fatal() {
                    self.fail(err.to_string()).await;
                    return;
                }
                log::warn!("non-fatal dispatch error for {}: {err}", self.pair);
            }
        }

        log::info!("dispatch loop for {} ended", self.pair);
    }

    async fn handle_frame(
        &self,
        frame: InboundFrame,
        timer: &mut RebaseTimer,
        threshold: Decimal,
    ) -> Result<(), GridError> {
        match frame {
            InboundFrame::Ticker(update) => self.handle_ticker(update.last, timer, threshold).await,
            InboundFrame::Executions(executions) => self.handle_executions(executions).await,
            InboundFrame::MethodResponse {
                method,
                success,
                error,
            } => {
                if success {
                    log::info!("method {method} acknowledged");
                } else {
                    log::warn!("method {method} was not successful: {error:?}");
                }
                Ok(())
            }
            InboundFrame::Heartbeat | InboundFrame::Status | InboundFrame::Ignored => Ok(()),
            InboundFrame::Disconnected => {
                self.stop("exchange websocket disconnected after exhausting reconnect attempts")
                    .await;
                Ok(())
            }
            InboundFrame::Fault(reason) => {
                self.fail(reason).await;
                Ok(())
            }
        }
    }

    async fn handle_ticker(
        &self,
        last: Decimal,
        timer: &mut RebaseTimer,
        threshold: Decimal,
    ) -> Result<(), GridError> {
        let base = self.base_price();
        let deviation = (last - base).abs();

        log::info!("ticker update: current={last} base={base}");

        if deviation > threshold {
            log::info!("price exceeded threshold: current={last} base={base}");
            timer.start();
            if timer.is_expired() {
                timer.reset();
                self.set_base_price(last);
                self.rebase_orders(last).await?;
            }
        } else {
            timer.reset();
        }

        Ok(())
    }

    async fn rebase_orders(&self, base_price: Decimal) -> Result<(), GridError> {
        let open_orders = self.store.get_open_orders(&self.pair).await?;
        let order_ids: Vec<String> = open_orders
            .into_iter()
            .filter_map(|order| order.exchange_order_id)
            .collect();

        if !order_ids.is_empty() {
            let (outbound, token) = {
                let runtime = self.runtime.lock().await;
                let handles = runtime.as_ref().ok_or_else(|| {
                    GridError::Lifecycle("cannot rebase while stopped".to_owned())
                })?;
                (handles.private_outbound.clone(), handles.token.clone())
            };
            self.exchange
                .cancel_orders(&outbound, &token, order_ids)
                .await?;
        }

        for rung in rebase_rungs(&self.ladder, base_price) {
            self.place_order(rung.side, rung.price, rung.multiplier)
                .await?;
        }

        Ok(())
    }

    async fn handle_executions(&self, executions: Vec<ExecutionUpdate>) -> Result<(), GridError> {
        for execution in executions {
            let order = self.store.get_order(execution.order_userref).await?;
            let status = OrderStatus::from(execution.exec_type.as_str());

            self.store
                .update_order(
                    order.userref,
                    OrderUpdate {
                        exchange_order_id: Some(execution.order_id.clone()),
                        status: Some(status.clone()),
                    },
                )
                .await?;

            log::info!(
                "order update: order_id={} userref={} status={status} side={} price={} pair={} multiplier={}",
                execution.order_id,
                order.userref,
                order.side,
                order.price,
                order.pair,
                order.multiplier
            );

            if status == OrderStatus::Filled {
                let mirrored = mirror_price(self.ladder.step, order.side, order.price, order.multiplier);
                self.place_order(order.side.opposite(), mirrored, order.multiplier)
                    .await?;
            }
        }

        Ok(())
    }
}
