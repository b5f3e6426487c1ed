//! The exchange adapter: REST token issuance plus the public/private
//! websocket sessions, behind a trait so the grid controller can be tested
//! against a fake.
//!
//! Grounded on `original_source/kraken/kraken.go`'s `Kraken` interface
//! (`GetWebsocketToken`/`SubscribeTickers`/`SubscribeExecutions`/
//! `AddOrderWithWebsocket`/`CancelOrderWithWebsocket`), reshaped around this
//! crate's [`Socket`] transport instead of the Go `websocket.Socket`.

pub mod auth;
pub mod protocol;
pub mod rest;
pub mod socket;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio_tungstenite::tungstenite::Message;

use crate::config::EngineConfig;
use crate::error::GridError;
use crate::model::OrderSide;
use crate::prelude::{FrameSender, MessageSender};

use self::protocol::OutboundRequest;
use self::socket::Socket;

/// The exchange-facing capability the grid controller depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Issue a fresh websocket auth token via the private REST API.
    async fn get_token(&self) -> Result<String, GridError>;

    /// Open the public (ticker) websocket session, wiring decoded frames
    /// into `frames`. Returns the outbound sender for that session.
    async fn connect_public(&self, frames: FrameSender) -> Result<MessageSender, GridError>;

    /// Open the private (executions/orders) websocket session, wiring
    /// decoded frames into `frames`. Returns the outbound sender for that
    /// session.
    async fn connect_private(&self, frames: FrameSender) -> Result<MessageSender, GridError>;

    /// Subscribe the public session to ticker updates for `pair`.
    async fn subscribe_ticker(&self, outbound: &MessageSender, pair: &str) -> Result<(), GridError>;

    /// Subscribe the private session to this account's executions.
    async fn subscribe_executions(
        &self,
        outbound: &MessageSender,
        token: &str,
    ) -> Result<(), GridError>;

    /// Place a limit order over the private session.
    #[allow(clippy::too_many_arguments)]
    async fn add_order(
        &self,
        outbound: &MessageSender,
        pair: &str,
        token: &str,
        side: OrderSide,
        order_qty: Decimal,
        price: Decimal,
        userref: i64,
    ) -> Result<(), GridError>;

    /// Cancel a batch of resting orders over the private session.
    async fn cancel_orders(
        &self,
        outbound: &MessageSender,
        token: &str,
        order_ids: Vec<String>,
    ) -> Result<(), GridError>;
}

/// The concrete Kraken v2 implementation of [`ExchangeAdapter`].
#[derive(Debug, Clone)]
pub struct KrakenAdapter {
    client: reqwest::Client,
    config: EngineConfig,
}

impl KrakenAdapter {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

/// Serialize and send an outbound request over `outbound`.
async fn send<P: serde::Serialize>(
    outbound: &MessageSender,
    request: OutboundRequest<P>,
) -> Result<(), GridError> {
    let text = serde_json::to_string(&request)?;
    let sender = outbound.lock().await;
    sender
        .unbounded_send(Message::Text(text))
        .map_err(|err| GridError::ExchangeSend(err.to_string()))
}

#[async_trait]
impl ExchangeAdapter for KrakenAdapter {
    async fn get_token(&self) -> Result<String, GridError> {
        rest::get_websocket_token(&self.client, &self.config).await
    }

    async fn connect_public(&self, frames: FrameSender) -> Result<MessageSender, GridError> {
        let socket = Socket::connect(self.config.ws_public_url.clone(), frames).await?;
        Ok(socket.outbound)
    }

    async fn connect_private(&self, frames: FrameSender) -> Result<MessageSender, GridError> {
        let socket = Socket::connect(self.config.ws_private_url.clone(), frames).await?;
        Ok(socket.outbound)
    }

    async fn subscribe_ticker(
        &self,
        outbound: &MessageSender,
        pair: &str,
    ) -> Result<(), GridError> {
        send(outbound, OutboundRequest::subscribe_ticker(pair)).await
    }

    async fn subscribe_executions(
        &self,
        outbound: &MessageSender,
        token: &str,
    ) -> Result<(), GridError> {
        send(outbound, OutboundRequest::subscribe_executions(token)).await
    }

    async fn add_order(
        &self,
        outbound: &MessageSender,
        pair: &str,
        token: &str,
        side: OrderSide,
        order_qty: Decimal,
        price: Decimal,
        userref: i64,
    ) -> Result<(), GridError> {
        send(
            outbound,
            OutboundRequest::add_order(pair, token, side.as_str(), order_qty, price, userref),
        )
        .await
    }

    async fn cancel_orders(
        &self,
        outbound: &MessageSender,
        token: &str,
        order_ids: Vec<String>,
    ) -> Result<(), GridError> {
        if order_ids.is_empty() {
            return Ok(());
        }
        send(outbound, OutboundRequest::cancel_order(token, order_ids)).await
    }
}
