//! Crate error type.

use anyhow::Error as AnyError;

/// Classify an [`AnyError`] produced somewhere in a task boundary into a
/// [`GridError`], the same way the crate this one is descended from
/// classified websocket-processing errors in `processing_error`.
#[must_use]
pub fn classify(err: AnyError) -> GridError {
    if let Some(err) = err.downcast_ref::<serde_json::Error>() {
        return GridError::Decode(err.to_string());
    }

    if let Some(err) = err.downcast_ref::<sqlx::Error>() {
        return GridError::Store(err.to_string());
    }

    if let Ok(err) = err.downcast::<GridError>() {
        return err;
    }

    GridError::Unhandled
}

/// The grid engine's error currency.
#[derive(thiserror::Error, Debug)]
pub enum GridError {
    /// A websocket frame could not be decoded into a known shape.
    #[error("failed to decode exchange frame: {0}")]
    Decode(String),
    /// A required field was missing from a decoded frame or request.
    #[error("missing `{0}` from frame")]
    MissingField(String),
    /// REST/websocket authentication failed.
    #[error("exchange authentication failed: {0}")]
    Auth(String),
    /// The order store could not complete an operation.
    #[error("order store error: {0}")]
    Store(String),
    /// An order row referenced by `userref` does not exist.
    #[error("no order found for userref {0}")]
    OrderNotFound(i64),
    /// Sending a frame to the exchange over the websocket failed.
    #[error("failed to send to exchange: {0}")]
    ExchangeSend(String),
    /// RPC-level input validation failed; never fatal to the engine.
    #[error("validation failed: {0}")]
    Validation(String),
    /// A lifecycle precondition was violated (e.g. `Run` while already running).
    #[error("lifecycle error: {0}")]
    Lifecycle(String),
    /// The websocket connection could not be (re)established.
    #[error("websocket connection error: {0}")]
    Websocket(String),
    /// Unclassified error, kept only for downcast fallthrough.
    #[error("unhandled error")]
    Unhandled,
}

impl GridError {
    /// Whether this fault demotes the engine to `Status::Error` and stops
    /// it, per the fault-classification table: protocol and persistence
    /// failures are fatal, RPC-level validation and lifecycle faults are
    /// not (they return synchronously to the caller instead).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GridError::Decode(_)
                | GridError::Store(_)
                | GridError::OrderNotFound(_)
                | GridError::ExchangeSend(_)
        )
    }
}

impl From<serde_json::Error> for GridError {
    fn from(value: serde_json::Error) -> Self {
        GridError::Decode(value.to_string())
    }
}

impl From<sqlx::Error> for GridError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => GridError::OrderNotFound(-1),
            other => GridError::Store(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for GridError {
    fn from(value: reqwest::Error) -> Self {
        GridError::Auth(value.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for GridError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        GridError::Websocket(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_and_persistence_faults_are_fatal() {
        assert!(GridError::Decode("bad json".to_owned()).is_fatal());
        assert!(GridError::Store("connection reset".to_owned()).is_fatal());
        assert!(GridError::OrderNotFound(7).is_fatal());
        assert!(GridError::ExchangeSend("channel closed".to_owned()).is_fatal());
    }

    #[test]
    fn validation_and_lifecycle_faults_are_not_fatal() {
        assert!(!GridError::Validation("bad side".to_owned()).is_fatal());
        assert!(!GridError::Lifecycle("already running".to_owned()).is_fatal());
        assert!(!GridError::Auth("rejected".to_owned()).is_fatal());
        assert!(!GridError::MissingField("result.token".to_owned()).is_fatal());
    }
}
