//! Form definitions and server-side validation.
//!
//! Responsibilities
//! - Describe each intake form as data: field names, labels, input kinds,
//!   requiredness and length limits. The definition serializes straight into
//!   the JSON handed to form renderers.
//! - Validate a raw submission against a definition before it reaches the
//!   normalizer, returning per-field messages a renderer can place next to
//!   the offending inputs.
//!
//! Validation never mutates the submission. Requiredness is judged on the
//! trimmed value, so `"0"` and `"false"` count as present; only genuinely
//! empty input fails a required check.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

/// One selectable option of a select, radio or checkbox-group field.
#[derive(Debug, Clone, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

/// Input kind of a form field, with per-kind validation data.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    TextArea,
    Tel,
    Email,
    Date,
    Select { choices: Vec<Choice> },
    Radio { choices: Vec<Choice> },
    MultiCheckbox { choices: Vec<Choice> },
    Checkbox,
    Integer { min: i64, max: i64 },
    Decimal,
}

/// A single form field: identity, presentation and validation rules.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
}

impl FieldSpec {
    pub fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            required: false,
            max_len: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn max_len(mut self, max: usize) -> Self {
        self.max_len = Some(max);
        self
    }

    fn check(&self, raw: &Value, errors: &mut Vec<FieldError>) {
        let mut fail = |message: String| {
            errors.push(FieldError {
                field: self.name.clone(),
                message,
            });
        };

        let values = values_for(raw, &self.name);

        // Checkboxes only distinguish checked from unchecked. Browsers omit
        // unchecked boxes entirely; some clients send explicit falsy values.
        if let FieldKind::Checkbox = self.kind {
            let checked = values
                .iter()
                .map(|v| v.trim())
                .any(|v| !v.is_empty() && v != "false" && v != "0");
            if self.required && !checked {
                fail("This field is required.".to_string());
            }
            return;
        }

        let present: Vec<&str> = values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();

        if present.is_empty() {
            if self.required {
                fail("This field is required.".to_string());
            }
            return;
        }

        for value in present {
            match &self.kind {
                FieldKind::Text | FieldKind::TextArea | FieldKind::Tel => {}
                FieldKind::Email => {
                    if !is_valid_email(value) {
                        fail("Invalid email address.".to_string());
                    }
                }
                FieldKind::Date => {
                    if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
                        fail("Not a valid date value.".to_string());
                    }
                }
                FieldKind::Integer { min, max } => match value.parse::<i64>() {
                    Ok(n) if n < *min || n > *max => {
                        fail(format!("Number must be between {min} and {max}."));
                    }
                    Ok(_) => {}
                    Err(_) => fail("Not a valid integer value.".to_string()),
                },
                FieldKind::Decimal => {
                    if value.parse::<f64>().is_err() {
                        fail("Not a valid decimal value.".to_string());
                    }
                }
                FieldKind::Select { choices }
                | FieldKind::Radio { choices }
                | FieldKind::MultiCheckbox { choices } => {
                    if !choices.iter().any(|c| c.value == value) {
                        fail("Not a valid choice.".to_string());
                    }
                }
                FieldKind::Checkbox => {}
            }

            if let Some(max) = self.max_len {
                if value.chars().count() > max {
                    fail(format!("Field cannot be longer than {max} characters."));
                }
            }
        }
    }
}

/// A validation failure attributed to one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// A complete form: stable name, display title and ordered fields.
#[derive(Debug, Clone, Serialize)]
pub struct FormDefinition {
    pub name: String,
    pub title: String,
    pub fields: Vec<FieldSpec>,
}

impl FormDefinition {
    pub fn new(name: &str, title: &str, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate a raw submission object against every field.
    ///
    /// Returns one entry per failed rule, in field declaration order. An
    /// empty result means the submission may proceed to normalization.
    pub fn validate(&self, raw: &Value) -> Vec<FieldError> {
        let mut errors = Vec::new();
        for field in &self.fields {
            field.check(raw, &mut errors);
        }
        errors
    }
}

/// Submitted values for one field name, as strings.
///
/// Missing keys and nulls yield nothing. Arrays (checkbox groups, repeated
/// keys) contribute each non-null element. Non-string scalars are rendered
/// through their JSON form so numeric submissions validate like their typed
/// text would.
fn values_for(raw: &Value, name: &str) -> Vec<String> {
    match raw.get(name) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(other) => vec![other.to_string()],
    }
}

/// Minimal structural email check: one `@`, non-empty local part, dotted
/// domain, no whitespace, no leading or trailing dots on either side.
fn is_valid_email(value: &str) -> bool {
    if value.contains(char::is_whitespace) || value.matches('@').count() != 1 {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !local.starts_with('.')
        && !local.ends_with('.')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn choice_list(pairs: &[(&str, &str)]) -> Vec<Choice> {
    pairs
        .iter()
        .map(|(value, label)| Choice {
            value: value.to_string(),
            label: label.to_string(),
        })
        .collect()
}

fn yes_no() -> Vec<Choice> {
    choice_list(&[("yes", "Yes"), ("no", "No")])
}

fn yes_no_unknown() -> Vec<Choice> {
    choice_list(&[("yes", "Yes"), ("no", "No"), ("unknown", "Unknown")])
}

/// The fifty US states as `(code, name)` select choices.
pub fn us_state_choices() -> Vec<Choice> {
    choice_list(&[
        ("AL", "Alabama"),
        ("AK", "Alaska"),
        ("AZ", "Arizona"),
        ("AR", "Arkansas"),
        ("CA", "California"),
        ("CO", "Colorado"),
        ("CT", "Connecticut"),
        ("DE", "Delaware"),
        ("FL", "Florida"),
        ("GA", "Georgia"),
        ("HI", "Hawaii"),
        ("ID", "Idaho"),
        ("IL", "Illinois"),
        ("IN", "Indiana"),
        ("IA", "Iowa"),
        ("KS", "Kansas"),
        ("KY", "Kentucky"),
        ("LA", "Louisiana"),
        ("ME", "Maine"),
        ("MD", "Maryland"),
        ("MA", "Massachusetts"),
        ("MI", "Michigan"),
        ("MN", "Minnesota"),
        ("MS", "Mississippi"),
        ("MO", "Missouri"),
        ("MT", "Montana"),
        ("NE", "Nebraska"),
        ("NV", "Nevada"),
        ("NH", "New Hampshire"),
        ("NJ", "New Jersey"),
        ("NM", "New Mexico"),
        ("NY", "New York"),
        ("NC", "North Carolina"),
        ("ND", "North Dakota"),
        ("OH", "Ohio"),
        ("OK", "Oklahoma"),
        ("OR", "Oregon"),
        ("PA", "Pennsylvania"),
        ("RI", "Rhode Island"),
        ("SC", "South Carolina"),
        ("SD", "South Dakota"),
        ("TN", "Tennessee"),
        ("TX", "Texas"),
        ("UT", "Utah"),
        ("VT", "Vermont"),
        ("VA", "Virginia"),
        ("WA", "Washington"),
        ("WV", "West Virginia"),
        ("WI", "Wisconsin"),
        ("WY", "Wyoming"),
    ])
}

/// Standard adult intake form.
pub fn standard_intake_form() -> FormDefinition {
    let fields = vec![
        FieldSpec::new("first_name", "First Name", FieldKind::Text)
            .required()
            .max_len(50),
        FieldSpec::new("last_name", "Last Name", FieldKind::Text)
            .required()
            .max_len(50),
        FieldSpec::new("date_of_birth", "Date of Birth", FieldKind::Date).required(),
        FieldSpec::new("phone", "Phone Number", FieldKind::Tel).required(),
        FieldSpec::new("email", "Email", FieldKind::Email).max_len(100),
        FieldSpec::new("street_address", "Street Address", FieldKind::Text)
            .required()
            .max_len(100),
        FieldSpec::new("city", "City", FieldKind::Text).required().max_len(50),
        FieldSpec::new(
            "state",
            "State",
            FieldKind::Select {
                choices: us_state_choices(),
            },
        )
        .required(),
        FieldSpec::new("zip_code", "ZIP Code", FieldKind::Text)
            .required()
            .max_len(10),
        FieldSpec::new("emergency_contact_name", "Emergency Contact Name", FieldKind::Text)
            .required()
            .max_len(100),
        FieldSpec::new(
            "emergency_contact_phone",
            "Emergency Contact Phone",
            FieldKind::Tel,
        )
        .required(),
        FieldSpec::new("emergency_contact_relationship", "Relationship", FieldKind::Text)
            .required()
            .max_len(50),
        FieldSpec::new("insurance_provider", "Insurance Provider", FieldKind::Text).max_len(100),
        FieldSpec::new("insurance_id", "Insurance ID", FieldKind::Text).max_len(50),
        FieldSpec::new("primary_physician", "Primary Care Physician", FieldKind::Text)
            .max_len(100),
        FieldSpec::new("reason_for_visit", "Reason for Visit", FieldKind::TextArea)
            .required()
            .max_len(500),
        FieldSpec::new("current_medications", "Current Medications", FieldKind::TextArea)
            .max_len(1000),
        FieldSpec::new("allergies", "Known Allergies", FieldKind::TextArea).max_len(500),
        FieldSpec::new("medical_history", "Relevant Medical History", FieldKind::TextArea)
            .max_len(1000),
    ];

    FormDefinition::new("patient_intake", "Patient Intake Form", fields)
}

/// Comprehensive pediatric intake form, including the duplicated page-two
/// patient details and the guardian consent block.
pub fn pediatric_intake_form() -> FormDefinition {
    let sex_choices = choice_list(&[("", "Select..."), ("male", "Male"), ("female", "Female")]);
    let gender_choices = choice_list(&[
        ("", "Select..."),
        ("male", "Male"),
        ("female", "Female"),
        ("other", "Other"),
    ]);

    let fields = vec![
        // Patient history
        FieldSpec::new("patient_name", "Patient Full Name", FieldKind::Text)
            .required()
            .max_len(100),
        FieldSpec::new("patient_age", "Age", FieldKind::Integer { min: 0, max: 18 }).required(),
        FieldSpec::new(
            "patient_sex",
            "Sex",
            FieldKind::Select {
                choices: sex_choices.clone(),
            },
        )
        .required(),
        FieldSpec::new("patient_dob", "Date of Birth", FieldKind::Date).required(),
        // Birth history
        FieldSpec::new(
            "delivery_type",
            "Delivery Type",
            FieldKind::Select {
                choices: choice_list(&[
                    ("", "Select..."),
                    ("vaginal", "Vaginal"),
                    ("csection", "C-Section"),
                ]),
            },
        )
        .required(),
        FieldSpec::new(
            "birth_timing",
            "Birth Timing",
            FieldKind::Select {
                choices: choice_list(&[
                    ("", "Select..."),
                    ("full_term", "Full Term"),
                    ("early", "Early"),
                    ("late", "Late"),
                ]),
            },
        )
        .required(),
        FieldSpec::new("birth_weeks", "How Many Weeks", FieldKind::Integer { min: 20, max: 45 }),
        FieldSpec::new("birth_weight", "Birth Weight (lbs)", FieldKind::Decimal),
        FieldSpec::new(
            "hearing_test_passed",
            "Baby passed hearing test?",
            FieldKind::Radio {
                choices: yes_no_unknown(),
            },
        )
        .required(),
        FieldSpec::new(
            "hep_b_vaccine",
            "Did baby get Hep B vaccine at birth?",
            FieldKind::Radio {
                choices: yes_no_unknown(),
            },
        )
        .required(),
        FieldSpec::new(
            "pregnancy_complications",
            "Any complications with pregnancy or delivery?",
            FieldKind::TextArea,
        )
        .max_len(1000),
        // Child and family medical history
        FieldSpec::new(
            "child_medical_history",
            "Check if following problems exist:",
            FieldKind::MultiCheckbox {
                choices: choice_list(&[
                    ("ulcers", "Ulcers"),
                    ("vaccines_behind", "Vaccines behind"),
                    ("stomach_liver_problems", "Stomach or liver problems"),
                    ("febrile_seizure", "Febrile seizure or epilepsy"),
                    ("asthma_pneumonia", "Asthma/Pneumonia"),
                    ("urine_kidney_problems", "Urine/Kidney problems"),
                    ("heart_problems", "Heart problems"),
                    ("thyroid_problems", "Thyroid problems"),
                    ("psychiatric_problems", "Psychiatric problems"),
                ]),
            },
        ),
        FieldSpec::new(
            "family_medical_history",
            "Family Medical History - Check if following problems exist:",
            FieldKind::MultiCheckbox {
                choices: choice_list(&[
                    ("diabetes", "Diabetes"),
                    ("asthma", "Asthma"),
                    ("stomach_liver_problems", "Stomach or liver problems"),
                    ("teenage_sudden_death", "Teenage sudden death"),
                    ("early_heart_disease", "Early age heart disease"),
                    ("seizure", "Seizure"),
                    ("hearing_loss", "Hearing loss"),
                    ("blindness", "Blindness"),
                    ("tb", "TB"),
                    ("tumors_cancer", "Tumors or cancer"),
                ]),
            },
        ),
        // Social history
        FieldSpec::new(
            "household_members",
            "How many people live in the house?",
            FieldKind::Integer { min: 1, max: 20 },
        )
        .required(),
        FieldSpec::new("any_pets", "Any pets?", FieldKind::Radio { choices: yes_no() })
            .required(),
        FieldSpec::new("anyone_smokes", "Anyone smokes?", FieldKind::Radio { choices: yes_no() })
            .required(),
        FieldSpec::new(
            "lead_exposure",
            "Any exposure to lead?",
            FieldKind::Radio {
                choices: yes_no_unknown(),
            },
        )
        .required(),
        FieldSpec::new(
            "voice_message_consent",
            "Do you authorize the clinic to leave a voice message regarding test results?",
            FieldKind::Radio { choices: yes_no() },
        )
        .required(),
        // Guardian signature (page one)
        FieldSpec::new("guardian_signature_name", "Print Name", FieldKind::Text)
            .required()
            .max_len(100),
        FieldSpec::new("guardian_relationship", "Relationship to Child", FieldKind::Text)
            .required()
            .max_len(50),
        FieldSpec::new("signature_date", "Date", FieldKind::Date).required(),
        // Page two patient details
        FieldSpec::new("patient_last_name", "Last Name", FieldKind::Text)
            .required()
            .max_len(50),
        FieldSpec::new("patient_first_name", "First Name", FieldKind::Text)
            .required()
            .max_len(50),
        FieldSpec::new("patient_dob_page2", "Date of Birth", FieldKind::Date).required(),
        FieldSpec::new("patient_age_page2", "Age", FieldKind::Integer { min: 0, max: 18 })
            .required(),
        FieldSpec::new(
            "patient_gender",
            "Gender",
            FieldKind::Select {
                choices: gender_choices,
            },
        )
        .required(),
        // Address
        FieldSpec::new("patient_address", "Address", FieldKind::Text)
            .required()
            .max_len(100),
        FieldSpec::new("patient_city", "City", FieldKind::Text).required().max_len(50),
        FieldSpec::new(
            "patient_state",
            "State",
            FieldKind::Select {
                choices: us_state_choices(),
            },
        )
        .required(),
        FieldSpec::new("patient_zip", "ZIP Code", FieldKind::Text)
            .required()
            .max_len(10),
        // Parent and guardian information
        FieldSpec::new("mother_name", "Mother's Name", FieldKind::Text).max_len(100),
        FieldSpec::new("mother_phone", "Mother's Phone Number", FieldKind::Tel),
        FieldSpec::new("mother_address", "Mother's Address", FieldKind::Text).max_len(100),
        FieldSpec::new("mother_cell", "Mother's Cell", FieldKind::Tel),
        FieldSpec::new("father_name", "Father's Name", FieldKind::Text).max_len(100),
        FieldSpec::new("father_phone", "Father's Phone Number", FieldKind::Tel),
        FieldSpec::new("father_address", "Father's Address", FieldKind::Text).max_len(100),
        FieldSpec::new("father_cell", "Father's Cell", FieldKind::Tel),
        FieldSpec::new("emergency_contact_name", "Emergency Contact Name", FieldKind::Text)
            .required()
            .max_len(100),
        FieldSpec::new(
            "emergency_contact_phone",
            "Emergency Contact Phone",
            FieldKind::Tel,
        )
        .required(),
        FieldSpec::new(
            "siblings_info",
            "Name of all siblings in our facility and DOB",
            FieldKind::TextArea,
        )
        .max_len(500),
        // Insurance and pharmacy
        FieldSpec::new("insurance_name", "Health Insurance Name", FieldKind::Text).max_len(100),
        FieldSpec::new("insurance_id", "Insurance ID#", FieldKind::Text).max_len(50),
        FieldSpec::new("insurance_group", "Group#", FieldKind::Text).max_len(50),
        FieldSpec::new("pharmacy_name", "Pharmacy Name", FieldKind::Text).max_len(100),
        FieldSpec::new("pharmacy_phone", "Pharmacy Phone Number", FieldKind::Tel),
        // Consent and final signature
        FieldSpec::new(
            "treatment_consent",
            "I give my permission as a parent/legal guardian of the patient named above for the clinic to treat my child.",
            FieldKind::Checkbox,
        )
        .required(),
        FieldSpec::new("parent_guardian_name_final", "Parent/Guardian Name", FieldKind::Text)
            .required()
            .max_len(100),
        FieldSpec::new("final_signature_date", "Date", FieldKind::Date).required(),
    ];

    FormDefinition::new(
        "pediatric_intake",
        "Comprehensive Pediatric Intake Form",
        fields,
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_standard_submission() -> Value {
        json!({
            "first_name": "Jane",
            "last_name": "Doe",
            "date_of_birth": "2001-04-12",
            "phone": "555-0100",
            "email": "jane.doe@example.com",
            "street_address": "1 Main St",
            "city": "Springfield",
            "state": "IL",
            "zip_code": "62704",
            "emergency_contact_name": "Sam Doe",
            "emergency_contact_phone": "555-0101",
            "emergency_contact_relationship": "spouse",
            "reason_for_visit": "annual physical",
        })
    }

    #[test]
    fn standard_form_shape() {
        let form = standard_intake_form();
        assert_eq!(form.fields.len(), 19);
        assert!(form.field("first_name").expect("field present").required);
        assert!(!form.field("email").expect("field present").required);
        assert_eq!(form.field("reason_for_visit").expect("field present").max_len, Some(500));
    }

    #[test]
    fn pediatric_form_shape() {
        let form = pediatric_intake_form();
        assert_eq!(form.fields.len(), 49);
        assert!(form.field("treatment_consent").expect("field present").required);
        assert!(!form.field("mother_name").expect("field present").required);
    }

    #[test]
    fn complete_submission_passes() {
        let errors = standard_intake_form().validate(&complete_standard_submission());
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn missing_required_field_is_reported() {
        let mut raw = complete_standard_submission();
        raw["reason_for_visit"] = json!("   ");
        let errors = standard_intake_form().validate(&raw);

        assert_eq!(
            errors,
            vec![FieldError {
                field: "reason_for_visit".into(),
                message: "This field is required.".into(),
            }]
        );
    }

    #[test]
    fn errors_come_back_in_field_order() {
        let raw = json!({"reason_for_visit": "checkup"});
        let errors = standard_intake_form().validate(&raw);

        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields[0], "first_name");
        assert!(fields.contains(&"state"));
        assert!(!fields.contains(&"reason_for_visit"));
        assert!(!fields.contains(&"email"));
    }

    #[test]
    fn optional_email_may_be_empty_but_not_malformed() {
        let mut raw = complete_standard_submission();
        raw["email"] = json!("");
        assert_eq!(standard_intake_form().validate(&raw), vec![]);

        raw["email"] = json!("not-an-email");
        let errors = standard_intake_form().validate(&raw);
        assert_eq!(errors[0].message, "Invalid email address.");
    }

    #[test]
    fn email_structure_is_checked() {
        for bad in ["a@b", "@example.com", "a b@example.com", "a@@example.com", "a@.com"] {
            assert!(!is_valid_email(bad), "accepted {bad:?}");
        }
        for good in ["a@b.co", "jane.doe@clinic.example.org"] {
            assert!(is_valid_email(good), "rejected {good:?}");
        }
    }

    #[test]
    fn malformed_date_is_reported() {
        let mut raw = complete_standard_submission();
        raw["date_of_birth"] = json!("04/12/2001");
        let errors = standard_intake_form().validate(&raw);
        assert_eq!(errors[0].message, "Not a valid date value.");
    }

    #[test]
    fn overlong_value_is_reported() {
        let mut raw = complete_standard_submission();
        raw["first_name"] = json!("J".repeat(51));
        let errors = standard_intake_form().validate(&raw);
        assert_eq!(errors[0].message, "Field cannot be longer than 50 characters.");
    }

    #[test]
    fn unknown_select_choice_is_reported() {
        let mut raw = complete_standard_submission();
        raw["state"] = json!("ZZ");
        let errors = standard_intake_form().validate(&raw);
        assert_eq!(errors[0].message, "Not a valid choice.");
    }

    #[test]
    fn integer_range_is_enforced() {
        let form = pediatric_intake_form();
        let age = form.field("patient_age").expect("field present");

        let mut errors = Vec::new();
        age.check(&json!({"patient_age": "25"}), &mut errors);
        assert_eq!(errors[0].message, "Number must be between 0 and 18.");

        errors.clear();
        age.check(&json!({"patient_age": "four"}), &mut errors);
        assert_eq!(errors[0].message, "Not a valid integer value.");
    }

    #[test]
    fn newborn_age_zero_is_present_and_valid() {
        let form = pediatric_intake_form();
        let age = form.field("patient_age").expect("field present");

        let mut errors = Vec::new();
        age.check(&json!({"patient_age": "0"}), &mut errors);
        assert_eq!(errors, vec![]);

        errors.clear();
        age.check(&json!({"patient_age": 0}), &mut errors);
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn decimal_field_accepts_fractions() {
        let form = pediatric_intake_form();
        let weight = form.field("birth_weight").expect("field present");

        let mut errors = Vec::new();
        weight.check(&json!({"birth_weight": "7.25"}), &mut errors);
        assert_eq!(errors, vec![]);

        errors.clear();
        weight.check(&json!({"birth_weight": "heavy"}), &mut errors);
        assert_eq!(errors[0].message, "Not a valid decimal value.");
    }

    #[test]
    fn checkbox_group_accepts_known_values_only() {
        let form = pediatric_intake_form();
        let history = form.field("child_medical_history").expect("field present");

        let mut errors = Vec::new();
        history.check(
            &json!({"child_medical_history": ["asthma_pneumonia", "heart_problems"]}),
            &mut errors,
        );
        assert_eq!(errors, vec![]);

        errors.clear();
        history.check(&json!({"child_medical_history": ["made_up"]}), &mut errors);
        assert_eq!(errors[0].message, "Not a valid choice.");
    }

    #[test]
    fn unchecked_consent_fails_checked_passes() {
        let form = pediatric_intake_form();
        let consent = form.field("treatment_consent").expect("field present");

        let mut errors = Vec::new();
        consent.check(&json!({}), &mut errors);
        assert_eq!(errors[0].message, "This field is required.");

        errors.clear();
        consent.check(&json!({"treatment_consent": "y"}), &mut errors);
        assert_eq!(errors, vec![]);

        errors.clear();
        consent.check(&json!({"treatment_consent": "false"}), &mut errors);
        assert_eq!(errors[0].message, "This field is required.");
    }

    #[test]
    fn definition_serializes_for_renderers() {
        let form = standard_intake_form();
        let value = serde_json::to_value(&form).expect("form serializes");

        assert_eq!(value["name"], json!("patient_intake"));
        let first = &value["fields"][0];
        assert_eq!(first["name"], json!("first_name"));
        assert_eq!(first["kind"], json!("text"));
        assert_eq!(first["required"], json!(true));
        assert_eq!(first["max_len"], json!(50));

        let state = value["fields"]
            .as_array()
            .expect("fields array")
            .iter()
            .find(|f| f["name"] == json!("state"))
            .expect("state field present");
        assert_eq!(state["kind"], json!("select"));
        assert_eq!(state["choices"].as_array().expect("choices array").len(), 50);
        // Optional limits are omitted rather than null.
        assert!(state.get("max_len").is_none());
    }

    #[test]
    fn us_states_are_complete() {
        assert_eq!(us_state_choices().len(), 50);
    }
}
