//! Private REST request signing.
//!
//! Grounded on `original_source/kraken/kraken.go`'s `createSignature`:
//! `HMAC-SHA512(urlPath || SHA256(nonce || body), secret)`, base64-encoded,
//! with `secret` itself base64-decoded from the configured API secret.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::error::GridError;
use crate::prelude::{HmacSha512, Mac};

/// Produce the `API-Sign` header value for a private REST call.
///
/// `secret_b64` is the exchange-issued API secret as configured (itself
/// base64), `url_path` is the request path (e.g.
/// `/0/private/GetWebSocketsToken`), and `body` is the url-encoded POST
/// body, which must already contain `nonce`.
pub fn sign_request(
    url_path: &str,
    nonce: u64,
    body: &str,
    secret_b64: &str,
) -> Result<String, GridError> {
    let secret = BASE64
        .decode(secret_b64)
        .map_err(|err| GridError::Auth(format!("invalid API secret encoding: {err}")))?;

    let mut hasher = Sha256::new();
    hasher.update(nonce.to_string().as_bytes());
    hasher.update(body.as_bytes());
    let digest = hasher.finalize();

    let mut mac = HmacSha512::new_from_slice(&secret)
        .map_err(|err| GridError::Auth(format!("invalid HMAC key: {err}")))?;
    mac.update(url_path.as_bytes());
    mac.update(&digest);

    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signs_deterministically_for_same_inputs() {
        let secret = BASE64.encode(b"super-secret-key-material");
        let a = sign_request("/0/private/GetWebSocketsToken", 1, "nonce=1", &secret).unwrap();
        let b = sign_request("/0/private/GetWebSocketsToken", 1, "nonce=1", &secret).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn differs_when_nonce_differs() {
        let secret = BASE64.encode(b"super-secret-key-material");
        let a = sign_request("/0/private/GetWebSocketsToken", 1, "nonce=1", &secret).unwrap();
        let b = sign_request("/0/private/GetWebSocketsToken", 2, "nonce=2", &secret).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_non_base64_secret() {
        let err = sign_request("/path", 1, "nonce=1", "not-valid-base64!!");
        assert!(err.is_err());
    }
}
