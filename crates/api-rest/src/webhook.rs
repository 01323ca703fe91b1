//! Delivery of clinic packages to the configured webhook.
//!
//! The relay holds no patient data at rest: once a submission is normalized
//! and packaged it is handed to the clinic's endpoint and forgotten. Only a
//! 200 response counts as ingested; any other outcome is reported to the
//! caller so the patient still gets an acknowledgement while operators see
//! the delivery failure in the logs.

use api_types::ClinicPackage;
use std::time::Duration;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("failed to build http client: {0}")]
    Client(reqwest::Error),
    #[error("failed to reach clinic endpoint: {0}")]
    Request(reqwest::Error),
    #[error("clinic endpoint returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Posts clinic packages as JSON to one webhook URL.
#[derive(Clone)]
pub struct WebhookSender {
    http: reqwest::Client,
    url: String,
}

impl WebhookSender {
    pub fn new(url: impl Into<String>) -> Result<Self, WebhookError> {
        let http = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .map_err(WebhookError::Client)?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Deliver one package. Succeeds only on an exact 200 response.
    pub async fn deliver(&self, package: &ClinicPackage) -> Result<(), WebhookError> {
        let response = self
            .http
            .post(&self.url)
            .json(package)
            .send()
            .await
            .map_err(WebhookError::Request)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(WebhookError::Status(status));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
