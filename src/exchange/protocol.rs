//! Wire shapes for the Kraken v2 websocket protocol: decoded inbound
//! frames and the outbound request envelopes.
//!
//! Grounded on `original_source/kraken_grid/bot/websocket.go`'s
//! `handleMapMessage`/`handleTickerChannel`/`handleExecutionsChannel` for
//! the inbound shapes, and `original_source/kraken/kraken.go`'s
//! `WebsocketRequest` for the outbound envelope.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GridError;

/// A decoded `ticker` channel update; only the field the ladder model needs.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerUpdate {
    pub last: Decimal,
}

/// A decoded `executions` channel entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionUpdate {
    pub order_id: String,
    pub order_userref: i64,
    pub exec_type: String,
}

/// One decoded inbound frame. The Reader task produces these; the
/// Dispatcher task consumes them.
#[derive(Debug, Clone)]
pub enum InboundFrame {
    Ticker(TickerUpdate),
    Executions(Vec<ExecutionUpdate>),
    MethodResponse {
        method: String,
        success: bool,
        error: Option<String>,
    },
    Heartbeat,
    Status,
    /// A well-formed frame this adapter has no handler for.
    Ignored,
    /// The socket exhausted its reconnect attempts; the connection is dead.
    Disconnected,
    /// A frame could not be decoded, or had an unexpected shape. Fatal per
    /// the protocol fault policy, unlike `Disconnected`, which is a
    /// transport-level loss rather than a protocol violation.
    Fault(String),
}

/// Decode one websocket text payload into its frame(s). Kraken sometimes
/// batches several JSON objects in one array; each decodes independently.
pub fn decode_frames(text: &str) -> Result<Vec<InboundFrame>, GridError> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Array(items) => items.iter().map(decode_one).collect(),
        other => Ok(vec![decode_one(&other)?]),
    }
}

fn decode_one(value: &Value) -> Result<InboundFrame, GridError> {
    let obj = value
        .as_object()
        .ok_or_else(|| GridError::Decode("frame is not a JSON object".to_owned()))?;

    if let Some(method) = obj.get("method").and_then(Value::as_str) {
        let success = obj.get("success").and_then(Value::as_bool).unwrap_or(false);
        let error = obj
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_owned);
        return Ok(InboundFrame::MethodResponse {
            method: method.to_owned(),
            success,
            error,
        });
    }

    if let Some(channel) = obj.get("channel").and_then(Value::as_str) {
        return match channel {
            "ticker" => {
                let first = obj
                    .get("data")
                    .and_then(Value::as_array)
                    .and_then(|data| data.first())
                    .ok_or_else(|| GridError::MissingField("data".to_owned()))?;
                let ticker: TickerUpdate = serde_json::from_value(first.clone())?;
                Ok(InboundFrame::Ticker(ticker))
            }
            "executions" => {
                let data = obj
                    .get("data")
                    .and_then(Value::as_array)
                    .ok_or_else(|| GridError::MissingField("data".to_owned()))?;
                let executions = data
                    .iter()
                    .cloned()
                    .map(serde_json::from_value)
                    .collect::<Result<Vec<ExecutionUpdate>, _>>()?;
                Ok(InboundFrame::Executions(executions))
            }
            "heartbeat" => Ok(InboundFrame::Heartbeat),
            "status" => Ok(InboundFrame::Status),
            other => {
                log::info!("ignoring unhandled channel {other}");
                Ok(InboundFrame::Ignored)
            }
        };
    }

    Ok(InboundFrame::Ignored)
}

/// `{"method": ..., "params": ...}`, the outbound envelope every request
/// shares.
#[derive(Debug, Serialize)]
pub struct OutboundRequest<P> {
    pub method: &'static str,
    pub params: P,
}

#[derive(Debug, Serialize)]
pub struct SubscribeTickerParams {
    pub channel: &'static str,
    pub symbol: Vec<String>,
}

impl OutboundRequest<SubscribeTickerParams> {
    #[must_use]
    pub fn subscribe_ticker(pair: &str) -> Self {
        Self {
            method: "subscribe",
            params: SubscribeTickerParams {
                channel: "ticker",
                symbol: vec![pair.to_owned()],
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscribeExecutionsParams {
    pub channel: &'static str,
    pub token: String,
    pub snap_orders: bool,
    pub snap_trades: bool,
    pub order_status: bool,
    pub ratecounter: bool,
}

impl OutboundRequest<SubscribeExecutionsParams> {
    #[must_use]
    pub fn subscribe_executions(token: &str) -> Self {
        Self {
            method: "subscribe",
            params: SubscribeExecutionsParams {
                channel: "executions",
                token: token.to_owned(),
                snap_orders: true,
                snap_trades: false,
                order_status: false,
                ratecounter: true,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AddOrderParams {
    pub order_type: &'static str,
    pub side: &'static str,
    pub limit_price: Decimal,
    pub order_qty: Decimal,
    pub symbol: String,
    pub token: String,
    pub order_userref: i64,
    pub post_only: bool,
}

impl OutboundRequest<AddOrderParams> {
    #[must_use]
    pub fn add_order(
        pair: &str,
        token: &str,
        side: &str,
        order_qty: Decimal,
        price: Decimal,
        userref: i64,
    ) -> Self {
        Self {
            method: "add_order",
            params: AddOrderParams {
                order_type: "limit",
                side,
                limit_price: price,
                order_qty,
                symbol: pair.to_owned(),
                token: token.to_owned(),
                order_userref: userref,
                post_only: true,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancelOrderParams {
    pub token: String,
    pub order_id: Vec<String>,
}

impl OutboundRequest<CancelOrderParams> {
    #[must_use]
    pub fn cancel_order(token: &str, order_ids: Vec<String>) -> Self {
        Self {
            method: "cancel_order",
            params: CancelOrderParams {
                token: token.to_owned(),
                order_id: order_ids,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ticker_frame() {
        let text = r#"{"channel":"ticker","type":"update","data":[{"symbol":"BTC/USD","last":50000.5}]}"#;
        let frames = decode_frames(text).unwrap();
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            InboundFrame::Ticker(t) => assert_eq!(t.last, Decimal::new(500005, 1)),
            other => panic!("expected Ticker, got {other:?}"),
        }
    }

    #[test]
    fn decodes_executions_frame() {
        let text = r#"{"channel":"executions","data":[{"order_id":"O1","order_userref":7,"exec_type":"filled"}]}"#;
        let frames = decode_frames(text).unwrap();
        match &frames[0] {
            InboundFrame::Executions(execs) => {
                assert_eq!(execs.len(), 1);
                assert_eq!(execs[0].order_userref, 7);
                assert_eq!(execs[0].exec_type, "filled");
            }
            other => panic!("expected Executions, got {other:?}"),
        }
    }

    #[test]
    fn decodes_method_response() {
        let text = r#"{"method":"add_order","success":true,"result":{}}"#;
        let frames = decode_frames(text).unwrap();
        match &frames[0] {
            InboundFrame::MethodResponse {
                method, success, ..
            } => {
                assert_eq!(method, "add_order");
                assert!(*success);
            }
            other => panic!("expected MethodResponse, got {other:?}"),
        }
    }

    #[test]
    fn decodes_batched_array() {
        let text = r#"[{"channel":"heartbeat"},{"channel":"status"}]"#;
        let frames = decode_frames(text).unwrap();
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], InboundFrame::Heartbeat));
        assert!(matches!(frames[1], InboundFrame::Status));
    }

    #[test]
    fn unknown_channel_is_ignored_not_an_error() {
        let text = r#"{"channel":"book"}"#;
        let frames = decode_frames(text).unwrap();
        assert!(matches!(frames[0], InboundFrame::Ignored));
    }
}
