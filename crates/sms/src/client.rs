//! SMS gateway client.
//!
//! Responsibilities
//! - Normalize US phone numbers to E.164.
//! - Compose the intake-link and reminder message bodies.
//! - Dispatch messages through the gateway's HTTP API and report delivery.
//!
//! Notes
//! - Phone numbers appear in logs masked to their first six characters.
//! - The message texts are fixed apart from the greeting, clinic name and
//!   form URL; nothing submitted by a patient is ever echoed into an SMS.

use crate::{SmsConfig, SmsError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const OPT_OUT_KEYWORDS: [&str; 5] = ["STOP", "QUIT", "UNSUBSCRIBE", "CANCEL", "END"];

/// Client for one SMS gateway. Cheap to clone; the underlying HTTP client
/// is shared.
#[derive(Clone)]
pub struct SmsClient {
    http: reqwest::Client,
    config: SmsConfig,
}

/// Delivery report for one accepted message.
#[derive(Debug, Clone)]
pub struct SmsDelivery {
    pub message_id: Option<String>,
    pub to: String,
    pub sent_at: DateTime<Utc>,
}

/// Connectivity snapshot for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SmsProbe {
    pub connection_status: String,
    pub service: String,
    pub from_number: String,
    pub tested_at: DateTime<Utc>,
}

impl SmsClient {
    pub fn new(config: SmsConfig) -> Result<Self, SmsError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SmsError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Send a secure intake link.
    ///
    /// `patient_name` personalizes the greeting with the first name only;
    /// the rest of the message carries no patient data beyond the URL.
    pub async fn send_intake_link(
        &self,
        patient_phone: &str,
        form_url: &str,
        patient_name: Option<&str>,
        clinic_name: &str,
    ) -> Result<SmsDelivery, SmsError> {
        let to = format_phone_number(patient_phone)?;
        let body = intake_message(patient_name, clinic_name, form_url);
        self.dispatch(&to, &body).await
    }

    /// Send an appointment reminder nudging the patient toward the form.
    pub async fn send_reminder(
        &self,
        patient_phone: &str,
        clinic_name: &str,
    ) -> Result<SmsDelivery, SmsError> {
        let to = format_phone_number(patient_phone)?;
        let body = reminder_message(clinic_name);
        self.dispatch(&to, &body).await
    }

    /// Static connectivity report for monitoring endpoints.
    pub fn status(&self) -> SmsProbe {
        SmsProbe {
            connection_status: "healthy".into(),
            service: "HTTP SMS gateway".into(),
            from_number: self.config.from_number().to_string(),
            tested_at: Utc::now(),
        }
    }

    async fn dispatch(&self, to: &str, message: &str) -> Result<SmsDelivery, SmsError> {
        let response = self
            .http
            .post(self.config.api_endpoint())
            .bearer_auth(self.config.api_key())
            .json(&json!({
                "from": self.config.from_number(),
                "to": [to],
                "message": message,
            }))
            .send()
            .await
            .map_err(|e| SmsError::Provider(format!("failed to reach sms gateway: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("sms gateway rejected message to {}****: {}", &to[..6], status);
            return Err(SmsError::Provider(format!(
                "sms gateway returned status {status}"
            )));
        }

        #[derive(Deserialize)]
        struct GatewayResponse {
            message_id: Option<String>,
        }

        // Gateways differ on response bodies; a missing or non-JSON body
        // just means no message id to report.
        let parsed: Option<GatewayResponse> = response.json().await.ok();

        tracing::info!("sms sent to {}****", &to[..6]);

        Ok(SmsDelivery {
            message_id: parsed.and_then(|p| p.message_id),
            to: to.to_string(),
            sent_at: Utc::now(),
        })
    }
}

/// Normalize a US phone number to E.164.
///
/// Ten digits get the `1` country code prepended; eleven digits must already
/// start with it. The error never echoes the input.
pub fn format_phone_number(raw: &str) -> Result<String, SmsError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    let digits = match digits.len() {
        10 => format!("1{digits}"),
        11 if digits.starts_with('1') => digits,
        _ => {
            return Err(SmsError::InvalidPhone(
                "expected a 10-digit US number, or 11 digits starting with 1".into(),
            ));
        }
    };

    Ok(format!("+{digits}"))
}

/// Whether an inbound message is an opt-out request.
pub fn is_opt_out(message: &str) -> bool {
    let normalized = message.trim().to_uppercase();
    OPT_OUT_KEYWORDS.contains(&normalized.as_str())
}

fn intake_message(patient_name: Option<&str>, clinic_name: &str, form_url: &str) -> String {
    let greeting = match patient_name.and_then(|name| name.split_whitespace().next()) {
        Some(first_name) => format!("Hello {first_name},"),
        None => "Hello,".to_string(),
    };

    format!(
        "{greeting}\n\n\
         {clinic_name} has sent you a secure patient intake form. \
         Please fill it out before your appointment:\n\n\
         {form_url}\n\n\
         This secure link expires in 24 hours for your privacy and security.\n\n\
         If you have questions, please call the clinic directly.\n\n\
         Reply STOP to opt out."
    )
}

fn reminder_message(clinic_name: &str) -> String {
    format!(
        "Reminder from {clinic_name}:\n\n\
         You have an upcoming appointment. If you haven't completed your \
         intake form yet, please do so as soon as possible.\n\n\
         Call the clinic if you need a new form link or have questions.\n\n\
         Reply STOP to opt out."
    )
}

// ============================================================================
// Tests
// ============================================================================
