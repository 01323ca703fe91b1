//! Request and response types shared across the intake relay's HTTP surface.
//!
//! Everything here is a plain serde DTO with an OpenAPI schema. Handlers in
//! `api-rest` construct these; nothing in this crate validates or computes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Endpoint map returned by the service information route.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceEndpoints {
    pub intake_form: String,
    pub pediatric_form: String,
    pub admin_generate: String,
    pub admin_generate_pediatric: String,
    pub health_check: String,
}

/// Service information served at the root path.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfoRes {
    pub service: String,
    pub description: String,
    pub version: String,
    pub endpoints: ServiceEndpoints,
    pub features: Vec<String>,
}

/// Per-subsystem status strings reported by the health check.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthComponents {
    pub token_codec: String,
    pub form_validator: String,
    pub normalizer: String,
    pub webhook: String,
    pub sms: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub status: String,
    pub version: String,
    #[schema(value_type = String)]
    pub timestamp: DateTime<Utc>,
    pub components: HealthComponents,
}

/// Payload for rendering an intake form: verified claims plus the form
/// definition and the path the filled form must be posted back to.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IntakeFormRes {
    pub patient_id: String,
    pub clinic_id: String,
    pub form_type: String,
    pub submit_path: String,
    #[schema(value_type = Object)]
    pub form: Value,
}

/// Acknowledgement shown to the patient after a submission is accepted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitAckRes {
    pub success: bool,
    pub message: String,
}

/// Generic error envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FieldErrorRes {
    pub field: String,
    pub message: String,
}

/// Validation failure with per-field messages for the form renderer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidationFailedRes {
    pub error: String,
    pub field_errors: Vec<FieldErrorRes>,
}

/// `patient_id` is checked by the handler so its absence yields the
/// documented error envelope rather than a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateLinkReq {
    pub patient_id: Option<String>,
    pub clinic_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateLinkRes {
    pub success: bool,
    pub form_url: String,
    pub patient_id: String,
    pub clinic_id: String,
    pub expires_in_hours: u32,
    #[schema(value_type = String)]
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_type: Option<String>,
    pub instructions: String,
}

/// Like [`GenerateLinkReq`], the required fields are handler-checked.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendSmsReq {
    pub patient_phone: Option<String>,
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub clinic_id: Option<String>,
    pub clinic_name: Option<String>,
    /// `standard` or `pediatric`; anything else falls back to standard.
    pub form_type: Option<String>,
}

/// Delivery report for one sent message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SmsDeliveryRes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub to: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendSmsRes {
    pub success: bool,
    pub message: String,
    pub patient_id: String,
    pub sms_status: SmsDeliveryRes,
    pub form_url: String,
    #[schema(value_type = String)]
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SmsFailureRes {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub patient_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SmsStatusRes {
    pub sms_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub connection_status: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub checked_at: Option<DateTime<Utc>>,
}

/// Metadata attached to every package delivered to the clinic.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmissionMetadata {
    pub clinic_id: String,
    pub patient_id: String,
    #[schema(value_type = String)]
    pub submitted_at: DateTime<Utc>,
    pub form_version: String,
    /// Truncated digest of `patient_information`, for audit correlation.
    pub data_hash: String,
}

/// The clinic-ready package posted to the configured webhook.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClinicPackage {
    #[schema(value_type = Object)]
    pub patient_information: Value,
    pub submission_metadata: SubmissionMetadata,
}

// ============================================================================
// Tests
// ============================================================================
