//! Transactional email delivery.
//!
//! Sends through the configured provider endpoint. When email is disabled
//! (development, test retailers without templates) sends are logged and
//! dropped rather than failed, so the surrounding task still succeeds.

use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::info;

use crate::config::EmailConfig;
use crate::services::TaskError;

/// Email request timeout in seconds.
const EMAIL_TIMEOUT_SECS: u64 = 10;

/// Service for sending transactional email.
#[derive(Clone)]
pub struct EmailService {
    client: Client,
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(EMAIL_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Send the enrolment welcome email.
    pub async fn send_welcome(
        &self,
        to_address: &str,
        loyalty_name: &str,
        account_number: &str,
    ) -> Result<(), TaskError> {
        if !self.config.enabled {
            info!(to = to_address, "Email disabled, dropping welcome email");
            return Ok(());
        }

        let body = json!({
            "from": self.config.from_address,
            "to": to_address,
            "template": "welcome-email",
            "variables": {
                "loyalty_name": loyalty_name,
                "account_number": account_number,
            },
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| TaskError::Retryable(format!("email request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(TaskError::Retryable(format!(
                "email provider returned {}",
                response.status()
            )));
        }

        info!(to = to_address, "Welcome email sent");
        Ok(())
    }
}
