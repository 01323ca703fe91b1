//! HTTP surface of the intake relay.
//!
//! Responsibilities
//! - Token-gated form routes: serve a form definition for a valid token,
//!   accept the filled form back, normalize it and hand it to the clinic
//!   webhook.
//! - Admin routes: link generation and SMS dispatch, plus service info,
//!   health and SMS status for monitoring.
//! - OpenAPI documentation and the Swagger UI mount.
//!
//! Notes
//! - Every token failure returns the same 403 envelope; callers never learn
//!   whether a link was malformed, tampered with or expired.
//! - Log lines carry the opaque patient id and truncated tokens only, never
//!   submitted field values.

use std::sync::Arc;

use axum::{
    extract::{Path, RawForm, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_types::{
    ClinicPackage, ErrorRes, FieldErrorRes, GenerateLinkReq, GenerateLinkRes, HealthComponents,
    HealthRes, IntakeFormRes, SendSmsReq, SendSmsRes, ServiceEndpoints, ServiceInfoRes,
    SmsDeliveryRes, SmsFailureRes, SmsStatusRes, SubmissionMetadata, SubmitAckRes,
    ValidationFailedRes,
};
use intake_core::{
    forms::{self, FieldError, FormDefinition},
    normalize,
    schema::SectionMap,
    token::{fingerprint, Claims, TokenCodec, TOKEN_MAX_AGE_HOURS},
    IntakeResult,
};
use intake_sms::{SmsClient, SmsError};

use crate::webhook::WebhookSender;

pub const SERVICE_VERSION: &str = "2.0.0";

/// Everything fixed about one form flavour: its definition, section map,
/// version tags and patient-facing acknowledgement texts.
pub struct IntakeProfile {
    pub form: FormDefinition,
    pub map: SectionMap,
    pub form_type: &'static str,
    pub form_version: &'static str,
    pub submit_prefix: &'static str,
    pub submitted_message: &'static str,
    pub received_message: &'static str,
}

impl IntakeProfile {
    pub fn standard() -> IntakeResult<Self> {
        Ok(Self {
            form: forms::standard_intake_form(),
            map: SectionMap::standard_intake()?,
            form_type: "standard",
            form_version: "2.0",
            submit_prefix: "/submit",
            submitted_message:
                "Thank you! Your information has been submitted successfully to the clinic.",
            received_message:
                "Your form has been received. The clinic will contact you shortly.",
        })
    }

    pub fn pediatric() -> IntakeResult<Self> {
        Ok(Self {
            form: forms::pediatric_intake_form(),
            map: SectionMap::pediatric_intake()?,
            form_type: "pediatric_comprehensive",
            form_version: "2.0_pediatric",
            submit_prefix: "/pediatric-submit",
            submitted_message:
                "Thank you! Your pediatric intake information has been submitted successfully to the clinic.",
            received_message:
                "Your pediatric intake form has been received. The clinic will contact you shortly.",
        })
    }
}

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct RelayState {
    pub codec: Arc<TokenCodec>,
    pub public_base_url: String,
    pub webhook: Option<WebhookSender>,
    pub sms: Option<SmsClient>,
    pub standard: Arc<IntakeProfile>,
    pub pediatric: Arc<IntakeProfile>,
}

/// Failures on the patient-facing form routes, mapped to their JSON
/// envelopes. Token failures are deliberately indistinguishable.
enum IntakeFailure {
    InvalidToken,
    Validation(Vec<FieldError>),
    Processing,
}

impl IntoResponse for IntakeFailure {
    fn into_response(self) -> Response {
        match self {
            IntakeFailure::InvalidToken => (
                StatusCode::FORBIDDEN,
                Json(ErrorRes {
                    error: "Invalid or expired form link".into(),
                }),
            )
                .into_response(),
            IntakeFailure::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationFailedRes {
                    error: "Form validation failed".into(),
                    field_errors: errors
                        .into_iter()
                        .map(|e| FieldErrorRes {
                            field: e.field,
                            message: e.message,
                        })
                        .collect(),
                }),
            )
                .into_response(),
            IntakeFailure::Processing => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorRes {
                    error: "There was an error processing your form. Please try again.".into(),
                }),
            )
                .into_response(),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        service_info,
        health,
        intake_form,
        pediatric_intake_form,
        submit_standard,
        submit_pediatric,
        generate_link,
        generate_pediatric_link,
        send_intake_link,
        sms_status,
    ),
    components(schemas(
        ServiceInfoRes,
        ServiceEndpoints,
        HealthRes,
        HealthComponents,
        IntakeFormRes,
        SubmitAckRes,
        ErrorRes,
        FieldErrorRes,
        ValidationFailedRes,
        GenerateLinkReq,
        GenerateLinkRes,
        SendSmsReq,
        SendSmsRes,
        SmsDeliveryRes,
        SmsFailureRes,
        SmsStatusRes,
        ClinicPackage,
        SubmissionMetadata,
    ))
)]
struct ApiDoc;

/// Assemble the relay's router: public form routes, admin routes, docs and
/// a permissive CORS layer.
pub fn build_router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/intake/:token", get(intake_form))
        .route("/pediatric-intake/:token", get(pediatric_intake_form))
        .route("/submit/:token", post(submit_standard))
        .route("/pediatric-submit/:token", post(submit_pediatric))
        .route("/admin/generate-link", post(generate_link))
        .route("/admin/generate-pediatric-link", post(generate_pediatric_link))
        .route("/admin/send-intake-link", post(send_intake_link))
        .route("/admin/sms-status", get(sms_status))
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfoRes)
    )
)]
/// Service information endpoint
///
/// Names the service, its endpoints and feature set. Useful as a smoke test
/// that the relay is routable at all.
#[axum::debug_handler]
async fn service_info() -> Json<ServiceInfoRes> {
    Json(ServiceInfoRes {
        service: "Patient Intake API v2.0".into(),
        description: "HIPAA-compliant patient intake system with secure token-based access"
            .into(),
        version: SERVICE_VERSION.into(),
        endpoints: ServiceEndpoints {
            intake_form: "/intake/{token}".into(),
            pediatric_form: "/pediatric-intake/{token}".into(),
            admin_generate: "/admin/generate-link".into(),
            admin_generate_pediatric: "/admin/generate-pediatric-link".into(),
            health_check: "/health".into(),
        },
        features: vec![
            "Secure token-based form access".into(),
            "HIPAA-compliant data handling".into(),
            "Comprehensive pediatric intake".into(),
            "Comprehensive form validation".into(),
            "Clinic webhook integration".into(),
            "SMS link delivery".into(),
        ],
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint
///
/// Reports per-subsystem status. The optional subsystems (webhook, SMS)
/// show `not_configured` rather than failing the check.
#[axum::debug_handler]
async fn health(State(state): State<RelayState>) -> Json<HealthRes> {
    fn configured(present: bool) -> String {
        if present {
            "operational".into()
        } else {
            "not_configured".into()
        }
    }

    Json(HealthRes {
        status: "healthy".into(),
        version: SERVICE_VERSION.into(),
        timestamp: Utc::now(),
        components: HealthComponents {
            token_codec: "operational".into(),
            form_validator: "operational".into(),
            normalizer: "operational".into(),
            webhook: configured(state.webhook.is_some()),
            sms: configured(state.sms.is_some()),
        },
    })
}

#[utoipa::path(
    get,
    path = "/intake/{token}",
    responses(
        (status = 200, description = "Form definition with verified claims", body = IntakeFormRes),
        (status = 403, description = "Invalid or expired token", body = ErrorRes)
    )
)]
/// Serve the standard intake form behind a signed token
#[axum::debug_handler]
async fn intake_form(
    State(state): State<RelayState>,
    Path(token): Path<String>,
) -> Result<Json<IntakeFormRes>, IntakeFailure> {
    let profile = state.standard.clone();
    render_form(&state, &profile, &token)
}

#[utoipa::path(
    get,
    path = "/pediatric-intake/{token}",
    responses(
        (status = 200, description = "Form definition with verified claims", body = IntakeFormRes),
        (status = 403, description = "Invalid or expired token", body = ErrorRes)
    )
)]
/// Serve the comprehensive pediatric intake form behind a signed token
#[axum::debug_handler]
async fn pediatric_intake_form(
    State(state): State<RelayState>,
    Path(token): Path<String>,
) -> Result<Json<IntakeFormRes>, IntakeFailure> {
    let profile = state.pediatric.clone();
    render_form(&state, &profile, &token)
}

#[utoipa::path(
    post,
    path = "/submit/{token}",
    request_body(
        content = String,
        content_type = "application/x-www-form-urlencoded",
        description = "Filled form fields"
    ),
    responses(
        (status = 200, description = "Submission accepted", body = SubmitAckRes),
        (status = 403, description = "Invalid or expired token", body = ErrorRes),
        (status = 422, description = "Validation failed", body = ValidationFailedRes),
        (status = 500, description = "Processing error", body = ErrorRes)
    )
)]
/// Accept a filled standard intake form
#[axum::debug_handler]
async fn submit_standard(
    State(state): State<RelayState>,
    Path(token): Path<String>,
    RawForm(body): RawForm,
) -> Result<Json<SubmitAckRes>, IntakeFailure> {
    let profile = state.standard.clone();
    process_submission(&state, &profile, &token, &body).await
}

#[utoipa::path(
    post,
    path = "/pediatric-submit/{token}",
    request_body(
        content = String,
        content_type = "application/x-www-form-urlencoded",
        description = "Filled form fields"
    ),
    responses(
        (status = 200, description = "Submission accepted", body = SubmitAckRes),
        (status = 403, description = "Invalid or expired token", body = ErrorRes),
        (status = 422, description = "Validation failed", body = ValidationFailedRes),
        (status = 500, description = "Processing error", body = ErrorRes)
    )
)]
/// Accept a filled pediatric intake form
#[axum::debug_handler]
async fn submit_pediatric(
    State(state): State<RelayState>,
    Path(token): Path<String>,
    RawForm(body): RawForm,
) -> Result<Json<SubmitAckRes>, IntakeFailure> {
    let profile = state.pediatric.clone();
    process_submission(&state, &profile, &token, &body).await
}

#[utoipa::path(
    post,
    path = "/admin/generate-link",
    request_body = GenerateLinkReq,
    responses(
        (status = 200, description = "Link generated", body = GenerateLinkRes),
        (status = 400, description = "Missing patient_id", body = ErrorRes),
        (status = 500, description = "Generation failed", body = ErrorRes)
    )
)]
/// Generate a secure standard intake link for SMS distribution
#[axum::debug_handler]
async fn generate_link(
    State(state): State<RelayState>,
    Json(req): Json<GenerateLinkReq>,
) -> Result<Json<GenerateLinkRes>, (StatusCode, Json<ErrorRes>)> {
    let patient_id = required_field(req.patient_id.as_deref()).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorRes {
                error: "patient_id is required".into(),
            }),
        )
    })?;
    let clinic_id = required_field(req.clinic_id.as_deref()).unwrap_or("default");

    match state
        .codec
        .form_url(&state.public_base_url, patient_id, Some(clinic_id))
    {
        Ok(form_url) => {
            tracing::info!("Generated intake link for patient: {}", patient_id);
            Ok(Json(GenerateLinkRes {
                success: true,
                form_url,
                patient_id: patient_id.to_string(),
                clinic_id: clinic_id.to_string(),
                expires_in_hours: TOKEN_MAX_AGE_HOURS as u32,
                generated_at: Utc::now(),
                form_type: None,
                instructions: "Send this URL via SMS to the patient. Link expires in 24 hours."
                    .into(),
            }))
        }
        Err(e) => {
            tracing::error!("Link generation error: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorRes {
                    error: "Failed to generate link".into(),
                }),
            ))
        }
    }
}

#[utoipa::path(
    post,
    path = "/admin/generate-pediatric-link",
    request_body = GenerateLinkReq,
    responses(
        (status = 200, description = "Link generated", body = GenerateLinkRes),
        (status = 400, description = "Missing patient_id", body = ErrorRes),
        (status = 500, description = "Generation failed", body = ErrorRes)
    )
)]
/// Generate a secure pediatric intake link
#[axum::debug_handler]
async fn generate_pediatric_link(
    State(state): State<RelayState>,
    Json(req): Json<GenerateLinkReq>,
) -> Result<Json<GenerateLinkRes>, (StatusCode, Json<ErrorRes>)> {
    let patient_id = required_field(req.patient_id.as_deref()).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorRes {
                error: "patient_id is required".into(),
            }),
        )
    })?;
    let clinic_id = required_field(req.clinic_id.as_deref()).unwrap_or("pediatric");

    match state.codec.mint(patient_id, Some(clinic_id)) {
        Ok(token) => {
            let form_url = format!(
                "{}/pediatric-intake/{token}",
                state.public_base_url.trim_end_matches('/')
            );

            tracing::info!("Generated pediatric intake link for patient: {}", patient_id);
            Ok(Json(GenerateLinkRes {
                success: true,
                form_url,
                patient_id: patient_id.to_string(),
                clinic_id: clinic_id.to_string(),
                expires_in_hours: TOKEN_MAX_AGE_HOURS as u32,
                generated_at: Utc::now(),
                form_type: Some(state.pediatric.form_type.to_string()),
                instructions:
                    "Send this URL via SMS to the parent/guardian. Link expires in 24 hours."
                        .into(),
            }))
        }
        Err(e) => {
            tracing::error!("Pediatric link generation error: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorRes {
                    error: "Failed to generate pediatric link".into(),
                }),
            ))
        }
    }
}

#[utoipa::path(
    post,
    path = "/admin/send-intake-link",
    request_body = SendSmsReq,
    responses(
        (status = 200, description = "Link sent", body = SendSmsRes),
        (status = 400, description = "Missing or invalid fields", body = SmsFailureRes),
        (status = 502, description = "SMS gateway failure", body = SmsFailureRes),
        (status = 503, description = "SMS not configured", body = ErrorRes)
    )
)]
/// Mint an intake link and deliver it to the patient via SMS
#[axum::debug_handler]
async fn send_intake_link(
    State(state): State<RelayState>,
    Json(req): Json<SendSmsReq>,
) -> Result<Json<SendSmsRes>, Response> {
    let Some(sms) = state.sms.clone() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorRes {
                error: "SMS service is not available".into(),
            }),
        )
            .into_response());
    };

    let (Some(patient_phone), Some(patient_id)) = (
        required_field(req.patient_phone.as_deref()),
        required_field(req.patient_id.as_deref()),
    ) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorRes {
                error: "patient_phone and patient_id are required".into(),
            }),
        )
            .into_response());
    };

    let clinic_id = required_field(req.clinic_id.as_deref()).unwrap_or("default");
    let clinic_name = required_field(req.clinic_name.as_deref()).unwrap_or("Healthcare Clinic");
    let patient_name = required_field(req.patient_name.as_deref());
    let form_type = req.form_type.as_deref().unwrap_or("standard");

    let token = match state.codec.mint(patient_id, Some(clinic_id)) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Link generation error: {}", e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorRes {
                    error: "Failed to send SMS".into(),
                }),
            )
                .into_response());
        }
    };

    let base_url = state.public_base_url.trim_end_matches('/');
    let form_url = if form_type == "pediatric" {
        format!("{base_url}/pediatric-intake/{token}")
    } else {
        format!("{base_url}/intake/{token}")
    };

    match sms
        .send_intake_link(patient_phone, &form_url, patient_name, clinic_name)
        .await
    {
        Ok(delivery) => Ok(Json(SendSmsRes {
            success: true,
            message: "Intake link sent successfully via SMS".into(),
            patient_id: patient_id.to_string(),
            sms_status: SmsDeliveryRes {
                message_id: delivery.message_id,
                to: delivery.to,
                status: "delivered".into(),
            },
            form_url,
            sent_at: delivery.sent_at,
        })),
        Err(e) => {
            tracing::error!("SMS delivery failed for patient {}: {}", patient_id, e);
            let status = match &e {
                SmsError::InvalidPhone(_) => StatusCode::BAD_REQUEST,
                SmsError::Provider(_) => StatusCode::BAD_GATEWAY,
                SmsError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((
                status,
                Json(SmsFailureRes {
                    success: false,
                    error: e.to_string(),
                    error_code: e.code().to_string(),
                    patient_id: patient_id.to_string(),
                }),
            )
                .into_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/admin/sms-status",
    responses(
        (status = 200, description = "SMS service status", body = SmsStatusRes)
    )
)]
/// Report whether SMS delivery is configured and reachable
#[axum::debug_handler]
async fn sms_status(State(state): State<RelayState>) -> Json<SmsStatusRes> {
    match &state.sms {
        None => Json(SmsStatusRes {
            sms_enabled: false,
            status: Some("SMS service not configured".into()),
            connection_status: None,
            checked_at: None,
        }),
        Some(sms) => Json(SmsStatusRes {
            sms_enabled: true,
            status: None,
            connection_status: serde_json::to_value(sms.status()).ok(),
            checked_at: Some(Utc::now()),
        }),
    }
}

/// Verify the token and return the profile's form definition with the
/// claims a renderer needs.
fn render_form(
    state: &RelayState,
    profile: &IntakeProfile,
    token: &str,
) -> Result<Json<IntakeFormRes>, IntakeFailure> {
    let Some(claims) = state.codec.verify(token) else {
        tracing::warn!("Invalid token access attempt: {}...", token_preview(token));
        return Err(IntakeFailure::InvalidToken);
    };

    tracing::info!("Form accessed for patient ID: {}", claims.subject_id);

    let form = serde_json::to_value(&profile.form).map_err(|e| {
        tracing::error!("Failed to serialize form definition: {}", e);
        IntakeFailure::Processing
    })?;

    Ok(Json(IntakeFormRes {
        patient_id: claims.subject_id,
        clinic_id: claims.scope_id,
        form_type: profile.form_type.to_string(),
        submit_path: format!("{}/{token}", profile.submit_prefix),
        form,
    }))
}

/// Validate, normalize and deliver one submission.
///
/// Webhook delivery failure is not surfaced to the patient: the submission
/// already validated, so they get the fallback acknowledgement while the
/// failure lands in the logs for operators.
async fn process_submission(
    state: &RelayState,
    profile: &IntakeProfile,
    token: &str,
    body: &[u8],
) -> Result<Json<SubmitAckRes>, IntakeFailure> {
    let Some(claims) = state.codec.verify(token) else {
        tracing::warn!("Invalid token on submit: {}...", token_preview(token));
        return Err(IntakeFailure::InvalidToken);
    };

    let raw = form_to_value(body);

    let field_errors = profile.form.validate(&raw);
    if !field_errors.is_empty() {
        tracing::warn!(
            "Form validation failed for patient {}: {} field error(s)",
            claims.subject_id,
            field_errors.len()
        );
        return Err(IntakeFailure::Validation(field_errors));
    }

    let package = package_submission(&claims, profile, &raw)?;

    if let Some(webhook) = &state.webhook {
        match webhook.deliver(&package).await {
            Ok(()) => {
                tracing::info!(
                    "Successfully processed submission for patient: {}",
                    claims.subject_id
                );
                return Ok(Json(SubmitAckRes {
                    success: true,
                    message: profile.submitted_message.to_string(),
                }));
            }
            Err(e) => {
                tracing::error!("Clinic webhook delivery failed: {}", e);
            }
        }
    }

    Ok(Json(SubmitAckRes {
        success: true,
        message: profile.received_message.to_string(),
    }))
}

/// Normalize a validated submission and wrap it in the clinic envelope.
///
/// The metadata's `data_hash` is the fingerprint of the `patient_information`
/// value exactly as it will serialize onto the wire.
fn package_submission(
    claims: &Claims,
    profile: &IntakeProfile,
    raw: &Value,
) -> Result<ClinicPackage, IntakeFailure> {
    let document = normalize::normalize(raw, &profile.map).map_err(|e| {
        tracing::error!("Form processing error: {}", e);
        IntakeFailure::Processing
    })?;

    let patient_information = serde_json::to_value(&document).map_err(|e| {
        tracing::error!("Form processing error: {}", e);
        IntakeFailure::Processing
    })?;

    let data_hash = fingerprint(&patient_information).map_err(|e| {
        tracing::error!("Form processing error: {}", e);
        IntakeFailure::Processing
    })?;

    Ok(ClinicPackage {
        patient_information,
        submission_metadata: SubmissionMetadata {
            clinic_id: claims.scope_id.clone(),
            patient_id: claims.subject_id.clone(),
            submitted_at: Utc::now(),
            form_version: profile.form_version.to_string(),
            data_hash,
        },
    })
}

/// Parse a urlencoded form body into a JSON object. A key submitted more
/// than once (checkbox groups) becomes an array in submission order.
pub fn form_to_value(body: &[u8]) -> Value {
    let mut object = serde_json::Map::new();

    for (key, value) in url::form_urlencoded::parse(body) {
        let key = key.into_owned();
        let value = Value::String(value.into_owned());

        match object.get_mut(&key) {
            None => {
                object.insert(key, value);
            }
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }

    Value::Object(object)
}

fn required_field(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn token_preview(token: &str) -> String {
    token.chars().take(20).collect()
}

// ============================================================================
// Tests
// ============================================================================
