//! Signed intake-link tokens.
//!
//! This module mints and verifies the URL-safe tokens that gate every
//! patient-facing form. A token is three base64url segments joined by `.`:
//! the claims JSON, the mint time (unix seconds, big-endian), and an
//! HMAC-SHA256 over the first two segments. The timestamp segment is covered
//! by the MAC, so expiry is enforced from server-signed data rather than from
//! anything the client presents.
//!
//! Verification collapses every failure mode (malformed, tampered, expired,
//! future-dated) to `None`. Callers cannot distinguish why a link was
//! refused, and neither can whoever is probing the endpoint.

use crate::error::{IntakeError, IntakeResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Tokens older than this are refused.
pub const TOKEN_MAX_AGE_HOURS: i64 = 24;

/// Scope recorded when the caller does not name one.
pub const DEFAULT_SCOPE: &str = "default";

/// Length of the audit fingerprint in hex characters.
const FINGERPRINT_LEN: usize = 16;

const NONCE_BYTES: usize = 8;

/// Claims carried inside a signed intake token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Opaque non-PHI patient identifier (e.g. an appointment reference).
    pub subject_id: String,

    /// Clinic scope the link was issued for.
    pub scope_id: String,

    /// Mint time. Re-checked against the signed timestamp segment on verify.
    pub issued_at: DateTime<Utc>,

    /// Random per-token value so identical mints never collide.
    pub nonce: String,
}

/// Mints and verifies signed intake tokens with a symmetric secret.
///
/// The codec is stateless apart from the keyed MAC it is built with; it is
/// safe to share across request handlers behind an `Arc`.
#[derive(Clone)]
pub struct TokenCodec {
    mac: HmacSha256,
}

impl TokenCodec {
    /// Build a codec from the shared signing secret.
    pub fn new(secret: impl AsRef<[u8]>) -> IntakeResult<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(IntakeError::InvalidInput(
                "signing secret cannot be empty".into(),
            ));
        }

        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|_| IntakeError::InvalidInput("signing secret rejected".into()))?;

        Ok(Self { mac })
    }

    /// Mint a token for `subject_id`, scoped to `scope_id` or the default
    /// scope when none is given.
    ///
    /// `subject_id` must be non-empty and must not itself carry protected
    /// health information; that is the caller's responsibility.
    pub fn mint(&self, subject_id: &str, scope_id: Option<&str>) -> IntakeResult<String> {
        self.mint_at(subject_id, scope_id, Utc::now())
    }

    fn mint_at(
        &self,
        subject_id: &str,
        scope_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> IntakeResult<String> {
        let subject_id = subject_id.trim();
        if subject_id.is_empty() {
            return Err(IntakeError::InvalidInput(
                "subject_id cannot be empty".into(),
            ));
        }

        let scope_id = scope_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SCOPE);

        let claims = Claims {
            subject_id: subject_id.to_string(),
            scope_id: scope_id.to_string(),
            issued_at: now,
            nonce: new_nonce(),
        };

        let stamp_secs = u64::try_from(now.timestamp()).map_err(|_| {
            IntakeError::InvalidInput("mint time predates the unix epoch".into())
        })?;

        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let stamp = URL_SAFE_NO_PAD.encode(stamp_secs.to_be_bytes());
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&payload, &stamp));

        Ok(format!("{payload}.{stamp}.{signature}"))
    }

    /// Verify a presented token and return its claims.
    ///
    /// The token is untrusted input. Returns `None` for any failure:
    /// malformed structure, signature mismatch, a signed timestamp outside
    /// the validity window, or claims that cannot be parsed. Never mutates
    /// state.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        self.verify_at(token, Utc::now())
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<Claims> {
        let mut segments = token.split('.');
        let payload = segments.next()?;
        let stamp = segments.next()?;
        let signature = segments.next()?;
        if segments.next().is_some() {
            return None;
        }

        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        // Signature check must be constant-time, so it goes through the MAC
        // rather than `==`.
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.update(b".");
        mac.update(stamp.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let stamp_bytes = URL_SAFE_NO_PAD.decode(stamp).ok()?;
        let stamp_secs = u64::from_be_bytes(stamp_bytes.try_into().ok()?);
        let stamped_at = DateTime::from_timestamp(i64::try_from(stamp_secs).ok()?, 0)?;

        // A stamp from the future means clock or serializer inconsistency,
        // not a fresh token.
        let age = now.signed_duration_since(stamped_at);
        if age < Duration::zero() || age > Duration::hours(TOKEN_MAX_AGE_HOURS) {
            return None;
        }

        let claims: Claims =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).ok()?).ok()?;

        // The signed stamp above already bounds the token's age. The claim
        // is aged again so a token whose embedded `issued_at` disagrees with
        // its signature stamp is refused instead of trusted. Redundant when
        // both clocks agree, and kept that way.
        if now.signed_duration_since(claims.issued_at) > Duration::hours(TOKEN_MAX_AGE_HOURS) {
            return None;
        }

        Some(claims)
    }

    /// Build the patient-facing intake URL for a freshly minted token.
    ///
    /// Trailing slashes on `base_url` are trimmed so the result never
    /// contains an empty path segment.
    pub fn form_url(
        &self,
        base_url: &str,
        subject_id: &str,
        scope_id: Option<&str>,
    ) -> IntakeResult<String> {
        let token = self.mint(subject_id, scope_id)?;
        Ok(format!("{}/intake/{token}", base_url.trim_end_matches('/')))
    }

    fn sign(&self, payload: &str, stamp: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.update(b".");
        mac.update(stamp.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Short, non-reversible digest of a structured document.
///
/// Audit logs record this instead of any part of the submission itself.
/// Documents serialize with sorted keys, so identical content always yields
/// the same fingerprint. Truncation is fine here: the value correlates log
/// lines, it does not need collision resistance at scale.
pub fn fingerprint<T: Serialize>(document: &T) -> IntakeResult<String> {
    let canonical = serde_json::to_vec(document)?;
    let digest = Sha256::digest(&canonical);
    Ok(hex::encode(digest)[..FINGERPRINT_LEN].to_string())
}

fn new_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codec() -> TokenCodec {
        TokenCodec::new("test-signing-secret").expect("codec builds")
    }

    #[test]
    fn mint_verify_round_trip() {
        let codec = codec();
        let token = codec
            .mint("appt-1234", Some("northside"))
            .expect("mint succeeds");

        let claims = codec.verify(&token).expect("fresh token verifies");
        assert_eq!(claims.subject_id, "appt-1234");
        assert_eq!(claims.scope_id, "northside");
        assert_eq!(claims.nonce.len(), NONCE_BYTES * 2);
    }

    #[test]
    fn mint_applies_default_scope() {
        let codec = codec();
        let token = codec.mint("appt-1", None).expect("mint succeeds");
        let claims = codec.verify(&token).expect("token verifies");
        assert_eq!(claims.scope_id, DEFAULT_SCOPE);
    }

    #[test]
    fn mint_rejects_empty_subject() {
        let codec = codec();
        let err = codec.mint("   ", None).expect_err("expected rejection");
        assert!(matches!(err, IntakeError::InvalidInput(_)));
    }

    #[test]
    fn new_rejects_empty_secret() {
        let err = TokenCodec::new("").expect_err("expected rejection");
        assert!(matches!(err, IntakeError::InvalidInput(_)));
    }

    #[test]
    fn token_expires_after_window() {
        let codec = codec();
        let minted_at = Utc::now();
        let token = codec
            .mint_at("appt-9", None, minted_at)
            .expect("mint succeeds");

        let just_inside = minted_at + Duration::hours(23) + Duration::minutes(59);
        assert!(codec.verify_at(&token, just_inside).is_some());

        let just_outside = minted_at + Duration::hours(24) + Duration::seconds(1);
        assert!(codec.verify_at(&token, just_outside).is_none());
    }

    #[test]
    fn future_dated_token_is_invalid() {
        let codec = codec();
        let now = Utc::now();
        let token = codec
            .mint_at("appt-9", None, now + Duration::hours(1))
            .expect("mint succeeds");

        assert!(codec.verify_at(&token, now).is_none());
    }

    #[test]
    fn stale_issued_at_claim_is_refused_even_with_fresh_stamp() {
        // Hand-assemble a token whose signed stamp is fresh but whose
        // embedded claim says it was issued 25 hours ago. The claim-side
        // age check must refuse it.
        let codec = codec();
        let now = Utc::now();
        let claims = Claims {
            subject_id: "appt-5".into(),
            scope_id: DEFAULT_SCOPE.into(),
            issued_at: now - Duration::hours(25),
            nonce: "00112233aabbccdd".into(),
        };

        let payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).expect("claims serialize"));
        let stamp = URL_SAFE_NO_PAD.encode((now.timestamp() as u64).to_be_bytes());
        let signature = URL_SAFE_NO_PAD.encode(codec.sign(&payload, &stamp));

        let token = format!("{payload}.{stamp}.{signature}");
        assert!(codec.verify_at(&token, now).is_none());
    }

    #[test]
    fn any_single_character_tamper_is_rejected() {
        let codec = codec();
        let token = codec.mint("appt-7", Some("clinic-a")).expect("mint succeeds");

        for index in 0..token.len() {
            let mut tampered: Vec<char> = token.chars().collect();
            tampered[index] = if tampered[index] == 'A' { 'B' } else { 'A' };
            let tampered: String = tampered.into_iter().collect();
            if tampered == token {
                continue;
            }
            assert!(
                codec.verify(&tampered).is_none(),
                "tamper at index {index} was accepted"
            );
        }
    }

    #[test]
    fn same_instant_mints_are_distinct() {
        let codec = codec();
        let now = Utc::now();
        let first = codec.mint_at("appt-3", None, now).expect("mint succeeds");
        let second = codec.mint_at("appt-3", None, now).expect("mint succeeds");
        assert_ne!(first, second);
    }

    #[test]
    fn wrong_secret_rejects_token() {
        let token = codec().mint("appt-2", None).expect("mint succeeds");
        let other = TokenCodec::new("another-secret").expect("codec builds");
        assert!(other.verify(&token).is_none());
    }

    #[test]
    fn garbage_tokens_are_invalid() {
        let codec = codec();
        for garbage in ["", "a", "a.b", "a.b.c", "a.b.c.d", "!!!.???.###"] {
            assert!(codec.verify(garbage).is_none(), "accepted {garbage:?}");
        }
    }

    #[test]
    fn form_url_trims_trailing_slash() {
        let codec = codec();
        let url = codec
            .form_url("https://forms.example.com/", "appt-8", None)
            .expect("url builds");

        assert!(url.starts_with("https://forms.example.com/intake/"));
        assert!(!url.contains(".com//"));

        let token = url.rsplit('/').next().expect("token segment present");
        assert!(codec.verify(token).is_some());
    }

    #[test]
    fn fingerprint_is_deterministic_and_short() {
        let doc = json!({"visit_information": {"reason_for_visit": "checkup"}});
        let first = fingerprint(&doc).expect("fingerprint computes");
        let second = fingerprint(&doc).expect("fingerprint computes");

        assert_eq!(first, second);
        assert_eq!(first.len(), FINGERPRINT_LEN);

        let other = json!({"visit_information": {"reason_for_visit": "follow-up"}});
        assert_ne!(first, fingerprint(&other).expect("fingerprint computes"));
    }
}
