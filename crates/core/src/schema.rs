//! Section maps: how flat form fields land in the clinic document.
//!
//! Responsibilities
//! - Declare, per form flavour, which submitted field feeds which section
//!   and output key of the structured document.
//! - Mark the sections that count toward the completeness score.
//! - Provide the two built-in maps (standard adult intake and the
//!   comprehensive pediatric intake).
//!
//! A [`SectionMap`] is pure data validated at construction. The normalizer
//! walks it; nothing here touches submission values.

use crate::error::{IntakeError, IntakeResult};
use std::collections::HashSet;

/// One field routing: a submitted key lands under `section.output_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    section: String,
    source_key: String,
    output_key: String,
}

impl FieldRule {
    /// Route `source_key` from the submission into `section` as `output_key`.
    pub fn new(section: &str, source_key: &str, output_key: &str) -> Self {
        Self {
            section: section.to_string(),
            source_key: source_key.to_string(),
            output_key: output_key.to_string(),
        }
    }

    /// Route a field whose submitted name is kept as the output key.
    pub fn direct(section: &str, key: &str) -> Self {
        Self::new(section, key, key)
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    pub fn output_key(&self) -> &str {
        &self.output_key
    }
}

/// Ordered field routings plus the sections that count toward completeness.
#[derive(Debug, Clone)]
pub struct SectionMap {
    rules: Vec<FieldRule>,
    scored_sections: Vec<String>,
}

impl SectionMap {
    /// Build a map from explicit rules.
    ///
    /// Rejects empty rule sets, blank names, duplicate `(section, output_key)`
    /// targets, duplicate scored sections, and scored sections that no rule
    /// feeds. A map that passes here cannot produce a document with two rules
    /// fighting over one output slot.
    pub fn new(rules: Vec<FieldRule>, scored_sections: Vec<String>) -> IntakeResult<Self> {
        if rules.is_empty() {
            return Err(IntakeError::SectionMap("no field rules defined".into()));
        }

        let mut targets = HashSet::new();
        for rule in &rules {
            if rule.section.is_empty() || rule.source_key.is_empty() || rule.output_key.is_empty()
            {
                return Err(IntakeError::SectionMap(
                    "field rules cannot have empty names".into(),
                ));
            }
            if !targets.insert((rule.section.as_str(), rule.output_key.as_str())) {
                return Err(IntakeError::SectionMap(format!(
                    "duplicate output field {}.{}",
                    rule.section, rule.output_key
                )));
            }
        }

        let sections: HashSet<&str> = rules.iter().map(|r| r.section.as_str()).collect();
        let mut seen_scored = HashSet::new();
        for scored in &scored_sections {
            if !seen_scored.insert(scored.as_str()) {
                return Err(IntakeError::SectionMap(format!(
                    "section {scored} scored twice"
                )));
            }
            if !sections.contains(scored.as_str()) {
                return Err(IntakeError::SectionMap(format!(
                    "scored section {scored} has no field rules"
                )));
            }
        }

        Ok(Self {
            rules,
            scored_sections,
        })
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    /// Whether fields in `section` count toward the completeness score.
    pub fn is_scored(&self, section: &str) -> bool {
        self.scored_sections.iter().any(|s| s == section)
    }

    /// Number of defined fields across all scored sections. This is the
    /// completeness denominator, fixed by the map rather than by whatever
    /// the patient happened to submit.
    pub fn scored_field_count(&self) -> usize {
        self.rules
            .iter()
            .filter(|r| self.is_scored(&r.section))
            .count()
    }

    /// Standard adult intake: seven sections, five of them scored.
    pub fn standard_intake() -> IntakeResult<Self> {
        let rules = vec![
            FieldRule::direct("personal_information", "first_name"),
            FieldRule::direct("personal_information", "last_name"),
            FieldRule::direct("personal_information", "date_of_birth"),
            FieldRule::direct("contact_information", "phone"),
            FieldRule::direct("contact_information", "email"),
            FieldRule::direct("address", "street_address"),
            FieldRule::direct("address", "city"),
            FieldRule::direct("address", "state"),
            FieldRule::direct("address", "zip_code"),
            FieldRule::new("emergency_contact", "emergency_contact_name", "name"),
            FieldRule::new("emergency_contact", "emergency_contact_phone", "phone"),
            FieldRule::new(
                "emergency_contact",
                "emergency_contact_relationship",
                "relationship",
            ),
            FieldRule::direct("insurance_information", "insurance_provider"),
            FieldRule::direct("insurance_information", "insurance_id"),
            FieldRule::direct("insurance_information", "primary_physician"),
            FieldRule::direct("medical_information", "current_medications"),
            FieldRule::direct("medical_information", "allergies"),
            FieldRule::direct("medical_information", "medical_history"),
            FieldRule::direct("visit_information", "reason_for_visit"),
        ];

        let scored = vec![
            "personal_information".to_string(),
            "contact_information".to_string(),
            "address".to_string(),
            "emergency_contact".to_string(),
            "visit_information".to_string(),
        ];

        Self::new(rules, scored)
    }

    /// Comprehensive pediatric intake: twelve sections covering birth,
    /// medical, social and family history plus guardian consent.
    pub fn pediatric_intake() -> IntakeResult<Self> {
        let rules = vec![
            FieldRule::new("patient_history", "patient_name", "name"),
            FieldRule::new("patient_history", "patient_age", "age"),
            FieldRule::new("patient_history", "patient_sex", "sex"),
            FieldRule::new("patient_history", "patient_dob", "dob"),
            FieldRule::new("patient_history", "patient_last_name", "last_name"),
            FieldRule::new("patient_history", "patient_first_name", "first_name"),
            FieldRule::new("patient_history", "patient_dob_page2", "dob_page2"),
            FieldRule::new("patient_history", "patient_age_page2", "age_page2"),
            FieldRule::new("patient_history", "patient_gender", "gender"),
            FieldRule::direct("birth_history", "delivery_type"),
            FieldRule::direct("birth_history", "birth_timing"),
            FieldRule::direct("birth_history", "birth_weeks"),
            FieldRule::direct("birth_history", "birth_weight"),
            FieldRule::new("birth_history", "hearing_test_passed", "hearing_test"),
            FieldRule::direct("birth_history", "hep_b_vaccine"),
            FieldRule::new("birth_history", "pregnancy_complications", "complications"),
            FieldRule::new("medical_history", "child_medical_history", "child_conditions"),
            FieldRule::new("medical_history", "family_medical_history", "family_conditions"),
            FieldRule::direct("social_history", "household_members"),
            FieldRule::new("social_history", "any_pets", "pets"),
            FieldRule::new("social_history", "anyone_smokes", "smoking"),
            FieldRule::direct("social_history", "lead_exposure"),
            FieldRule::direct("social_history", "voice_message_consent"),
            FieldRule::new("mother", "mother_name", "name"),
            FieldRule::new("mother", "mother_phone", "phone"),
            FieldRule::new("mother", "mother_address", "address"),
            FieldRule::new("mother", "mother_cell", "cell"),
            FieldRule::new("father", "father_name", "name"),
            FieldRule::new("father", "father_phone", "phone"),
            FieldRule::new("father", "father_address", "address"),
            FieldRule::new("father", "father_cell", "cell"),
            FieldRule::new("emergency_contact", "emergency_contact_name", "name"),
            FieldRule::new("emergency_contact", "emergency_contact_phone", "phone"),
            FieldRule::new("siblings", "siblings_info", "info"),
            FieldRule::new("insurance", "insurance_name", "name"),
            FieldRule::new("insurance", "insurance_id", "id"),
            FieldRule::new("insurance", "insurance_group", "group"),
            FieldRule::direct("insurance", "pharmacy_name"),
            FieldRule::direct("insurance", "pharmacy_phone"),
            FieldRule::direct("consent", "treatment_consent"),
            FieldRule::new("consent", "parent_guardian_name_final", "parent_guardian_name"),
            FieldRule::new("consent", "final_signature_date", "signature_date"),
            FieldRule::new("guardian_signature", "guardian_signature_name", "name"),
            FieldRule::new("guardian_signature", "guardian_relationship", "relationship"),
            FieldRule::new("guardian_signature", "signature_date", "date"),
            FieldRule::new("address", "patient_address", "address"),
            FieldRule::new("address", "patient_city", "city"),
            FieldRule::new("address", "patient_state", "state"),
            FieldRule::new("address", "patient_zip", "zip"),
        ];

        let scored = vec![
            "patient_history".to_string(),
            "birth_history".to_string(),
            "social_history".to_string(),
            "address".to_string(),
            "emergency_contact".to_string(),
            "consent".to_string(),
        ];

        Self::new(rules, scored)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_map_builds_with_expected_shape() {
        let map = SectionMap::standard_intake().expect("standard map builds");
        assert_eq!(map.rules().len(), 19);
        assert_eq!(map.scored_field_count(), 13);
        assert!(map.is_scored("personal_information"));
        assert!(map.is_scored("visit_information"));
        assert!(!map.is_scored("insurance_information"));
        assert!(!map.is_scored("medical_information"));
    }

    #[test]
    fn pediatric_map_builds_with_expected_shape() {
        let map = SectionMap::pediatric_intake().expect("pediatric map builds");
        assert_eq!(map.scored_field_count(), 30);
        assert!(map.is_scored("birth_history"));
        assert!(map.is_scored("consent"));
        assert!(!map.is_scored("mother"));
        assert!(!map.is_scored("siblings"));
    }

    #[test]
    fn renamed_rule_keeps_both_names() {
        let map = SectionMap::standard_intake().expect("standard map builds");
        let rule = map
            .rules()
            .iter()
            .find(|r| r.source_key() == "emergency_contact_name")
            .expect("rule present");
        assert_eq!(rule.section(), "emergency_contact");
        assert_eq!(rule.output_key(), "name");
    }

    #[test]
    fn rejects_empty_rule_set() {
        let err = SectionMap::new(vec![], vec![]).expect_err("expected rejection");
        assert!(matches!(err, IntakeError::SectionMap(_)));
    }

    #[test]
    fn rejects_duplicate_output_target() {
        let rules = vec![
            FieldRule::new("visit", "reason", "reason"),
            FieldRule::new("visit", "reason_other", "reason"),
        ];
        let err = SectionMap::new(rules, vec![]).expect_err("expected rejection");
        assert!(err.to_string().contains("duplicate output field"));
    }

    #[test]
    fn rejects_scored_section_without_rules() {
        let rules = vec![FieldRule::direct("visit", "reason")];
        let err = SectionMap::new(rules, vec!["contact".into()]).expect_err("expected rejection");
        assert!(err.to_string().contains("no field rules"));
    }

    #[test]
    fn rejects_section_scored_twice() {
        let rules = vec![FieldRule::direct("visit", "reason")];
        let err = SectionMap::new(rules, vec!["visit".into(), "visit".into()])
            .expect_err("expected rejection");
        assert!(err.to_string().contains("scored twice"));
    }
}
