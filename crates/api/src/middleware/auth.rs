//! Authentication middleware.
//!
//! The API is server-to-server: callers present the service API key in the
//! `Authorization` header as `Token <key>`. The key is hashed and compared
//! against the configured digest in constant time.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;
use shared::crypto::{constant_time_eq, sha256_hex};

const TOKEN_PREFIX: &str = "Token ";

/// Middleware that requires the service API key.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let presented = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(TOKEN_PREFIX));

    match presented {
        Some(key) if key_matches(key, &state.config.security.api_key_hash) => {
            next.run(req).await
        }
        _ => ApiError::Unauthorized("Supplied token is invalid".into()).into_response(),
    }
}

fn key_matches(presented: &str, expected_hash: &str) -> bool {
    constant_time_eq(&sha256_hex(presented), expected_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_matches_correct_key() {
        let hash = sha256_hex("service-key");
        assert!(key_matches("service-key", &hash));
    }

    #[test]
    fn test_key_matches_rejects_wrong_key() {
        let hash = sha256_hex("service-key");
        assert!(!key_matches("other-key", &hash));
        assert!(!key_matches("", &hash));
    }
}
