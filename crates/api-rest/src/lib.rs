//! # API REST
//!
//! REST API implementation for the patient intake relay.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - Webhook delivery of normalized submissions to the clinic
//! - REST-specific concerns (JSON serialization, CORS)
//!
//! Domain logic (tokens, validation, normalization) lives in `intake-core`;
//! this crate only adapts it to HTTP.

#![warn(rust_2018_idioms)]

pub mod routes;
pub mod webhook;

pub use routes::{build_router, IntakeProfile, RelayState};
pub use webhook::WebhookSender;
