//! Small helpers shared across the exchange adapter.

use std::str;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_channel::mpsc::UnboundedSender;
use tokio_tungstenite::tungstenite::Message;

use crate::error::GridError;
use crate::exchange::protocol::{decode_frames, InboundFrame};

/// Milliseconds since the UNIX epoch, used as the private-REST nonce.
#[must_use]
pub fn get_epoch_ms() -> u64 {
    let since_the_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the UNIX epoch");

    since_the_epoch.as_secs() * 1000 + u64::from(since_the_epoch.subsec_nanos()) / 1_000_000
}

/// Convert one inbound websocket `Message` into zero or more decoded
/// frames, answering a ping with a pong on `tx` as it goes (the Reader
/// task's websocket never expects a ping/pong reply from the Dispatcher).
pub fn message_to_frames(
    tx: &UnboundedSender<Message>,
    msg: &Message,
) -> Result<Vec<InboundFrame>, GridError> {
    match msg {
        Message::Text(text) => decode_frames(text),
        Message::Binary(bytes) => {
            let text =
                str::from_utf8(bytes).map_err(|err| GridError::Decode(err.to_string()))?;
            decode_frames(text)
        }
        Message::Ping(payload) => {
            tx.unbounded_send(Message::Pong(payload.clone()))
                .map_err(|err| GridError::ExchangeSend(err.to_string()))?;
            Ok(vec![])
        }
        other => {
            log::warn!("unsupported websocket message received: {other:?}");
            Ok(vec![])
        }
    }
}
