//! # Intake SMS
//!
//! Delivery of secure intake links over SMS through an HTTP gateway.
//!
//! Messages never contain protected health information: at most a first
//! name, the clinic name and the tokenized form URL. Phone numbers are
//! normalized to E.164 before dispatch and only ever logged masked.

pub mod client;

pub use client::{format_phone_number, is_opt_out, SmsClient, SmsDelivery, SmsProbe};

/// Errors raised while configuring or sending SMS.
#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("invalid phone number: {0}")]
    InvalidPhone(String),
    #[error("sms provider error: {0}")]
    Provider(String),
    #[error("sms configuration error: {0}")]
    Config(String),
}

impl SmsError {
    /// Stable machine-readable code for API error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            SmsError::InvalidPhone(_) => "INVALID_PHONE",
            SmsError::Provider(_) => "PROVIDER_ERROR",
            SmsError::Config(_) => "CONFIG_ERROR",
        }
    }
}

/// Gateway connection settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    api_endpoint: String,
    api_key: String,
    from_number: String,
}

impl SmsConfig {
    pub fn new(
        api_endpoint: impl Into<String>,
        api_key: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Result<Self, SmsError> {
        let api_endpoint = api_endpoint.into();
        let api_key = api_key.into();
        let from_number = from_number.into();

        if api_endpoint.trim().is_empty() {
            return Err(SmsError::Config("sms api endpoint is required".into()));
        }
        if api_key.trim().is_empty() {
            return Err(SmsError::Config("sms api key is required".into()));
        }
        if from_number.trim().is_empty() {
            return Err(SmsError::Config("sms from number is required".into()));
        }

        Ok(Self {
            api_endpoint,
            api_key,
            from_number,
        })
    }

    pub fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    pub fn from_number(&self) -> &str {
        &self.from_number
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }
}

// ============================================================================
// Tests
// ============================================================================
