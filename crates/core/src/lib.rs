//! # Intake Core
//!
//! Core business logic for the patient intake relay.
//!
//! This crate contains pure data operations with no transport concerns:
//! - Signed link tokens: minting, verification and audit fingerprints
//! - Form definitions and server-side validation
//! - Section maps and the submission normalizer that turns flat form
//!   fields into the sectioned clinic document
//!
//! **No API concerns**: HTTP handlers, webhook delivery and SMS belong in
//! `api-rest` and `intake-sms`. Everything here is synchronous and cheap to
//! share across request handlers.

pub mod error;
pub mod forms;
pub mod normalize;
pub mod schema;
pub mod token;

pub use error::{IntakeError, IntakeResult};
pub use forms::{FieldError, FormDefinition};
pub use normalize::{normalize, sanitize_field, IntakeDocument};
pub use schema::SectionMap;
pub use token::{fingerprint, Claims, TokenCodec};
