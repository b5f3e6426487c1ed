//! Crate prelude.

use std::sync::Arc;

use futures_channel::mpsc::UnboundedSender;
use hmac::Hmac;
pub use hmac::Mac;
use sha2::{Sha256, Sha512};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

pub use crate::error::GridError;
use crate::exchange::protocol::InboundFrame;

/// Hashing type for the nonce digest used by the private REST signature.
pub type HmacSha256 = Hmac<Sha256>;

/// Hashing type for the private REST digital signature itself.
pub type HmacSha512 = Hmac<Sha512>;

/// Outbound websocket message sender, shared between the RPC-facing
/// `PlaceOrder`/`SetBasePrice` callers and the Dispatcher.
pub type MessageSender = Arc<Mutex<UnboundedSender<Message>>>;

/// Decoded-frame sender, from the Reader task to the Dispatcher task.
pub type FrameSender = Arc<Mutex<UnboundedSender<InboundFrame>>>;

/// Convenience result alias for fallible engine operations.
pub type Result<T> = std::result::Result<T, GridError>;
