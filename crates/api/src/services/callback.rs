//! Enrolment callback delivery.
//!
//! POSTs the enrolment result to the retailer's callback URL, signing the
//! body with HMAC-SHA256 so the retailer can verify origin. Non-2xx
//! responses are retryable failures; the task runner owns the backoff.

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Serialize;
use sha2::Sha256;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::services::TaskError;

/// Callback request timeout in seconds.
const CALLBACK_TIMEOUT_SECS: u64 = 5;

/// Signature header attached to callback requests.
const SIGNATURE_HEADER: &str = "X-Loyalty-Signature";

type HmacSha256 = Hmac<Sha256>;

/// Payload POSTed to the retailer.
#[derive(Debug, Serialize)]
pub struct EnrolmentCallbackPayload {
    pub account_holder_uuid: Uuid,
    pub account_number: String,
    pub third_party_identifier: Option<String>,
}

/// Service for delivering enrolment callbacks.
#[derive(Clone)]
pub struct EnrolmentCallbackService {
    client: Client,
}

impl EnrolmentCallbackService {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(CALLBACK_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Deliver one callback. Signs the JSON body when a secret is
    /// configured for the retailer.
    pub async fn send(
        &self,
        url: &str,
        secret: Option<&str>,
        payload: &EnrolmentCallbackPayload,
    ) -> Result<(), TaskError> {
        let body = serde_json::to_string(payload)
            .map_err(|err| TaskError::Permanent(format!("payload serialization: {err}")))?;

        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.clone());

        if let Some(secret) = secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(secret, &body));
        }

        let response = request
            .send()
            .await
            .map_err(|err| TaskError::Retryable(format!("callback request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(TaskError::Retryable(format!(
                "callback returned {}",
                response.status()
            )));
        }

        info!(url, "Enrolment callback delivered");
        Ok(())
    }
}

impl Default for EnrolmentCallbackService {
    fn default() -> Self {
        Self::new()
    }
}

/// HMAC-SHA256 hex signature over the raw body.
fn sign_payload(secret: &str, body: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_payload_is_deterministic() {
        let first = sign_payload("secret", r#"{"a":1}"#);
        let second = sign_payload("secret", r#"{"a":1}"#);
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_sign_payload_varies_with_secret_and_body() {
        let base = sign_payload("secret", "body");
        assert_ne!(base, sign_payload("other", "body"));
        assert_ne!(base, sign_payload("secret", "other-body"));
    }
}
