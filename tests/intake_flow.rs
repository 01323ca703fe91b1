//! End-to-end flows through the assembled relay router, from minting a
//! link to the acknowledgement the patient sees after submitting the
//! filled form.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use api_rest::{build_router, IntakeProfile, RelayState};
use intake_core::TokenCodec;

fn relay_state() -> RelayState {
    RelayState {
        codec: Arc::new(TokenCodec::new("integration-test-secret").expect("codec builds")),
        public_base_url: "http://relay.test".into(),
        webhook: None,
        sms: None,
        standard: Arc::new(IntakeProfile::standard().expect("profile builds")),
        pediatric: Arc::new(IntakeProfile::pediatric().expect("profile builds")),
    }
}

async fn body_json(response: Response<axum::body::Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is json")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn post_form(uri: &str, pairs: &[(&str, &str)]) -> Request<Body> {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(serializer.finish()))
        .expect("request builds")
}

fn token_from(form_url: &str) -> &str {
    form_url.rsplit('/').next().expect("token segment")
}

fn complete_pediatric_pairs() -> Vec<(&'static str, &'static str)> {
    vec![
        ("patient_name", "Alex Rivera"),
        ("patient_age", "6"),
        ("patient_sex", "male"),
        ("patient_dob", "2020-02-08"),
        ("delivery_type", "vaginal"),
        ("birth_timing", "full_term"),
        ("birth_weeks", "39"),
        ("birth_weight", "7.4"),
        ("hearing_test_passed", "yes"),
        ("hep_b_vaccine", "unknown"),
        ("child_medical_history", "asthma_pneumonia"),
        ("child_medical_history", "heart_problems"),
        ("family_medical_history", "diabetes"),
        ("household_members", "4"),
        ("any_pets", "no"),
        ("anyone_smokes", "no"),
        ("lead_exposure", "unknown"),
        ("voice_message_consent", "yes"),
        ("guardian_signature_name", "Maria Rivera"),
        ("guardian_relationship", "mother"),
        ("signature_date", "2026-08-22"),
        ("patient_last_name", "Rivera"),
        ("patient_first_name", "Alex"),
        ("patient_dob_page2", "2020-02-08"),
        ("patient_age_page2", "6"),
        ("patient_gender", "male"),
        ("patient_address", "9 Elm St"),
        ("patient_city", "Austin"),
        ("patient_state", "TX"),
        ("patient_zip", "78701"),
        ("mother_name", "Maria Rivera"),
        ("mother_phone", "555-0110"),
        ("emergency_contact_name", "Luis Rivera"),
        ("emergency_contact_phone", "555-0111"),
        ("treatment_consent", "y"),
        ("parent_guardian_name_final", "Maria Rivera"),
        ("final_signature_date", "2026-08-22"),
    ]
}

#[tokio::test]
async fn standard_link_is_minted_opened_and_submitted() {
    let router = build_router(relay_state());

    // Admin mints the link.
    let response = router
        .clone()
        .oneshot(post_json(
            "/admin/generate-link",
            json!({"patient_id": "appt-1024", "clinic_id": "northside"}),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let generated = body_json(response).await;
    let form_url = generated["form_url"].as_str().expect("form url");
    assert!(form_url.starts_with("http://relay.test/intake/"));
    let token = token_from(form_url).to_string();

    // Patient opens the form.
    let response = router
        .clone()
        .oneshot(get(&format!("/intake/{token}")))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let form = body_json(response).await;
    assert_eq!(form["patient_id"], json!("appt-1024"));
    assert_eq!(form["clinic_id"], json!("northside"));
    let submit_path = form["submit_path"].as_str().expect("submit path").to_string();

    // Patient submits a complete form.
    let response = router
        .clone()
        .oneshot(post_form(
            &submit_path,
            &[
                ("first_name", "Jane"),
                ("last_name", "Doe"),
                ("date_of_birth", "2001-04-12"),
                ("phone", "555-0100"),
                ("email", "jane.doe@example.com"),
                ("street_address", "1 Main St"),
                ("city", "Springfield"),
                ("state", "IL"),
                ("zip_code", "62704"),
                ("emergency_contact_name", "Sam Doe"),
                ("emergency_contact_phone", "555-0101"),
                ("emergency_contact_relationship", "spouse"),
                ("reason_for_visit", "annual physical"),
            ],
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let ack = body_json(response).await;
    assert_eq!(ack["success"], json!(true));
    assert_eq!(
        ack["message"],
        json!("Your form has been received. The clinic will contact you shortly.")
    );
}

#[tokio::test]
async fn pediatric_link_is_minted_opened_and_submitted() {
    let router = build_router(relay_state());

    let response = router
        .clone()
        .oneshot(post_json(
            "/admin/generate-pediatric-link",
            json!({"patient_id": "appt-2048"}),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let generated = body_json(response).await;
    assert_eq!(generated["form_type"], json!("pediatric_comprehensive"));
    let form_url = generated["form_url"].as_str().expect("form url");
    assert!(form_url.starts_with("http://relay.test/pediatric-intake/"));
    let token = token_from(form_url).to_string();

    let response = router
        .clone()
        .oneshot(get(&format!("/pediatric-intake/{token}")))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let form = body_json(response).await;
    assert_eq!(form["clinic_id"], json!("pediatric"));
    assert_eq!(
        form["form"]["fields"].as_array().expect("fields array").len(),
        49
    );

    let response = router
        .clone()
        .oneshot(post_form(
            &format!("/pediatric-submit/{token}"),
            &complete_pediatric_pairs(),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let ack = body_json(response).await;
    assert_eq!(ack["success"], json!(true));
    assert_eq!(
        ack["message"],
        json!("Your pediatric intake form has been received. The clinic will contact you shortly.")
    );
}

#[tokio::test]
async fn pediatric_submission_without_consent_is_rejected() {
    let state = relay_state();
    let codec = state.codec.clone();
    let router = build_router(state);
    let token = codec
        .mint("appt-9000", Some("pediatric"))
        .expect("mint succeeds");

    let mut pairs = complete_pediatric_pairs();
    pairs.retain(|(key, _)| *key != "treatment_consent");

    let response = router
        .oneshot(post_form(&format!("/pediatric-submit/{token}"), &pairs))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["error"], json!("Form validation failed"));
    let errors = body["field_errors"].as_array().expect("field errors");
    assert!(errors
        .iter()
        .any(|e| e["field"] == json!("treatment_consent")));
}
