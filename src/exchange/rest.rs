//! The one REST call this engine makes: issuing a websocket auth token.
//!
//! Grounded on `original_source/kraken/kraken.go`'s `queryPrivate` /
//! `GetWebsocketToken`.

use serde::Deserialize;

use crate::config::EngineConfig;
use crate::error::GridError;
use crate::utils::get_epoch_ms;

use super::auth::sign_request;

const TOKEN_PATH: &str = "/0/private/GetWebSocketsToken";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    error: Vec<String>,
    result: Option<TokenResult>,
}

#[derive(Debug, Deserialize)]
struct TokenResult {
    token: String,
}

/// Request a fresh websocket auth token from the exchange's private REST
/// API, signing the request with the configured key/secret.
pub async fn get_websocket_token(
    client: &reqwest::Client,
    config: &EngineConfig,
) -> Result<String, GridError> {
    let nonce = get_epoch_ms();
    let body = format!("nonce={nonce}");
    let signature = sign_request(TOKEN_PATH, nonce, &body, &config.exchange_secret)?;

    let url = config
        .rest_url
        .join(TOKEN_PATH.trim_start_matches('/'))
        .map_err(|err| GridError::Auth(format!("invalid rest_url: {err}")))?;

    let response = client
        .post(url)
        .header("API-Key", &config.exchange_key)
        .header("API-Sign", signature)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await?
        .json::<TokenResponse>()
        .await?;

    if !response.error.is_empty() {
        return Err(GridError::Auth(response.error.join(", ")));
    }

    response
        .result
        .map(|result| result.token)
        .ok_or_else(|| GridError::MissingField("result.token".to_owned()))
}
