//! Submission normalizer: flat form fields in, sectioned document out.
//!
//! Responsibilities
//! - Sanitize every submitted value (control characters out, whitespace
//!   trimmed, empty values treated as absent).
//! - Route surviving values through a [`SectionMap`] into nested sections.
//! - Attach processing metadata: timestamp, format version, populated field
//!   count and a completeness score over the map's scored sections.
//!
//! Absent fields are omitted entirely. A section with no surviving fields
//! never appears in the output, so downstream consumers can rely on
//! `document[section][field]` either existing with a real value or not
//! existing at all.

use crate::error::{IntakeError, IntakeResult};
use crate::schema::SectionMap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Version tag stamped into every normalized document.
pub const FORMAT_VERSION: &str = "2.0";

/// Metadata attached to every normalized document.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingInfo {
    pub processed_at: DateTime<Utc>,
    pub format_version: String,
    /// Fields that survived sanitization, across all sections.
    pub total_fields: usize,
    /// Percent of the map's scored fields that are populated, two decimals.
    pub completeness_score: f64,
}

/// A normalized intake submission.
///
/// Serializes with each section as a top-level key plus `processing_info`.
/// Sections are kept sorted so the same content always serializes to the
/// same bytes, which keeps audit fingerprints stable.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeDocument {
    #[serde(flatten)]
    sections: BTreeMap<String, BTreeMap<String, Value>>,
    pub processing_info: ProcessingInfo,
}

impl IntakeDocument {
    pub fn section(&self, name: &str) -> Option<&BTreeMap<String, Value>> {
        self.sections.get(name)
    }

    pub fn field(&self, section: &str, key: &str) -> Option<&Value> {
        self.sections.get(section)?.get(key)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}

/// A scored field the submission left empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField {
    pub section: String,
    pub field: String,
}

/// Normalize a raw submission object into a sectioned document.
///
/// `raw` must be a JSON object of submitted field names to values. Fields
/// the map does not know are ignored; known fields whose values sanitize to
/// nothing are dropped.
pub fn normalize(raw: &Value, map: &SectionMap) -> IntakeResult<IntakeDocument> {
    let raw = raw.as_object().ok_or_else(|| {
        IntakeError::Normalization("submission payload must be a JSON object".into())
    })?;

    let mut sections: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
    let mut total_fields = 0usize;
    let mut scored_populated = 0usize;

    for rule in map.rules() {
        let Some(value) = raw.get(rule.source_key()) else {
            continue;
        };
        let Some(value) = normalize_value(value) else {
            continue;
        };

        total_fields += 1;
        if map.is_scored(rule.section()) {
            scored_populated += 1;
        }

        sections
            .entry(rule.section().to_string())
            .or_default()
            .insert(rule.output_key().to_string(), value);
    }

    let scored_defined = map.scored_field_count();
    let completeness_score = if scored_defined == 0 {
        0.0
    } else {
        let percent = scored_populated as f64 / scored_defined as f64 * 100.0;
        (percent * 100.0).round() / 100.0
    };

    tracing::debug!(
        "normalized submission into {} sections ({} fields, {:.2}% complete)",
        sections.len(),
        total_fields,
        completeness_score
    );

    Ok(IntakeDocument {
        sections,
        processing_info: ProcessingInfo {
            processed_at: Utc::now(),
            format_version: FORMAT_VERSION.to_string(),
            total_fields,
            completeness_score,
        },
    })
}

/// Scored fields of `map` that `document` does not carry.
pub fn missing_required_fields(document: &IntakeDocument, map: &SectionMap) -> Vec<MissingField> {
    map.rules()
        .iter()
        .filter(|rule| map.is_scored(rule.section()))
        .filter(|rule| document.field(rule.section(), rule.output_key()).is_none())
        .map(|rule| MissingField {
            section: rule.section().to_string(),
            field: rule.output_key().to_string(),
        })
        .collect()
}

/// Sanitize one submitted value, treating multi-value fields specially.
///
/// An array (checkbox groups, repeated form keys) is sanitized element-wise;
/// a single survivor collapses to a scalar, none at all means absent.
fn normalize_value(value: &Value) -> Option<Value> {
    match value {
        Value::Array(items) => {
            let mut kept: Vec<Value> = items.iter().filter_map(sanitize_field).collect();
            match kept.len() {
                0 => None,
                1 => kept.pop(),
                _ => Some(Value::Array(kept)),
            }
        }
        other => sanitize_field(other),
    }
}

/// Sanitize a single value.
///
/// Strings lose control characters (anything below U+0020) first, then
/// surrounding whitespace; stripping before trimming keeps the operation
/// idempotent. Null, empty strings, empty arrays and empty objects are
/// absent. Numbers and booleans pass through unchanged, including `0` and
/// `false`.
pub fn sanitize_field(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let cleaned: String = s.chars().filter(|c| *c as u32 >= 0x20).collect();
            let trimmed = cleaned.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(Value::String(trimmed.to_string()))
            }
        }
        Value::Array(items) if items.is_empty() => None,
        Value::Object(fields) if fields.is_empty() => None,
        other => Some(other.clone()),
    }
}

// ============================================================================
// Tests
// ============================================================================
