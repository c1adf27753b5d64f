//! Webhook payload signing and verification.
//!
//! Every delivery carries an `x-tollgate-signature` header of the form
//! `t=<unix_ts>,v1=<hex>` where the hex value is
//! `HMAC-SHA256(secret, "<t>.<payload>")`. Receivers rebuild the signed
//! string from the header timestamp and the raw body, compare in constant
//! time, and reject stale timestamps.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "x-tollgate-signature";

/// Default tolerance for the signature timestamp, in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Compute HMAC-SHA256 and return the hex-encoded result.
///
/// # Panics
///
/// Never panics in practice: HMAC-SHA256 accepts keys of any size per
/// RFC 2104, so `new_from_slice` only fails if the Hmac implementation
/// is broken.
#[must_use]
pub fn hmac_sha256_hex(secret: &str, message: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts any key size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time string comparison to prevent timing attacks.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Sign a payload for the given timestamp: `t=<ts>,v1=<hex>`.
#[must_use]
pub fn sign_payload(secret: &str, payload: &str, timestamp: i64) -> String {
    let signed = format!("{timestamp}.{payload}");
    let signature = hmac_sha256_hex(secret, &signed);
    format!("t={timestamp},v1={signature}")
}

/// Sign a payload using the current time.
#[must_use]
pub fn sign_payload_now(secret: &str, payload: &str) -> String {
    sign_payload(secret, payload, Utc::now().timestamp())
}

/// Parse a signature header into its timestamp and `v1` signature.
///
/// Returns `None` when the header doesn't carry both a valid `t` and a
/// `v1` element. Unknown elements are ignored so the scheme can be
/// versioned later.
#[must_use]
pub fn parse_signature_header(header: &str) -> Option<(i64, String)> {
    let mut timestamp = None;
    let mut signature = None;

    for element in header.split(',') {
        match element.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signature = Some(value.to_owned()),
            _ => {}
        }
    }

    Some((timestamp?, signature?))
}

/// Verify a signature header against the raw payload.
///
/// Checks that the header timestamp is within `tolerance_secs` of `now`
/// (in either direction, tolerating modest clock skew) and that the
/// signature matches `HMAC-SHA256(secret, "<t>.<payload>")`.
#[must_use]
pub fn verify_signature(secret: &str, payload: &str, header: &str, tolerance_secs: i64) -> bool {
    verify_signature_at(secret, payload, header, tolerance_secs, Utc::now().timestamp())
}

/// [`verify_signature`] with an explicit `now`, for deterministic tests.
#[must_use]
pub fn verify_signature_at(
    secret: &str,
    payload: &str,
    header: &str,
    tolerance_secs: i64,
    now: i64,
) -> bool {
    let Some((timestamp, signature)) = parse_signature_header(header) else {
        return false;
    };

    if (now - timestamp).abs() > tolerance_secs {
        return false;
    }

    let expected = hmac_sha256_hex(secret, &format!("{timestamp}.{payload}"));
    constant_time_eq(&signature, &expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha256_produces_correct_length() {
        let result = hmac_sha256_hex("key", "The quick brown fox jumps over the lazy dog");
        assert_eq!(result.len(), 64); // SHA256 = 32 bytes = 64 hex chars
    }

    #[test]
    fn hmac_sha256_is_deterministic() {
        assert_eq!(
            hmac_sha256_hex("secret", "message"),
            hmac_sha256_hex("secret", "message")
        );
        assert_ne!(
            hmac_sha256_hex("secret", "message1"),
            hmac_sha256_hex("secret", "message2")
        );
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(constant_time_eq("", ""));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
        assert!(!constant_time_eq("abc", "ABC"));
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let header = sign_payload("whsec_test", r#"{"id":"evt_1"}"#, 1_700_000_000);
        assert!(verify_signature_at(
            "whsec_test",
            r#"{"id":"evt_1"}"#,
            &header,
            DEFAULT_TOLERANCE_SECS,
            1_700_000_000,
        ));
    }

    #[test]
    fn header_shape() {
        let header = sign_payload("whsec_test", "payload", 1_700_000_000);
        assert!(header.starts_with("t=1700000000,v1="));
        let (timestamp, signature) = parse_signature_header(&header).unwrap();
        assert_eq!(timestamp, 1_700_000_000);
        assert_eq!(signature.len(), 64);
    }

    #[test]
    fn wrong_secret_rejected() {
        let header = sign_payload("whsec_a", "payload", 1_700_000_000);
        assert!(!verify_signature_at(
            "whsec_b",
            "payload",
            &header,
            DEFAULT_TOLERANCE_SECS,
            1_700_000_000,
        ));
    }

    #[test]
    fn tampered_payload_rejected() {
        let header = sign_payload("whsec_test", "payload", 1_700_000_000);
        assert!(!verify_signature_at(
            "whsec_test",
            "tampered",
            &header,
            DEFAULT_TOLERANCE_SECS,
            1_700_000_000,
        ));
    }

    #[test]
    fn stale_timestamp_rejected() {
        let header = sign_payload("whsec_test", "payload", 1_700_000_000);
        assert!(!verify_signature_at(
            "whsec_test",
            "payload",
            &header,
            DEFAULT_TOLERANCE_SECS,
            1_700_000_000 + DEFAULT_TOLERANCE_SECS + 1,
        ));
        // Within tolerance on either side is accepted.
        assert!(verify_signature_at(
            "whsec_test",
            "payload",
            &header,
            DEFAULT_TOLERANCE_SECS,
            1_700_000_000 - DEFAULT_TOLERANCE_SECS,
        ));
    }

    #[test]
    fn malformed_headers_rejected() {
        for header in ["", "t=123", "v1=abc", "t=abc,v1=def", "nonsense"] {
            assert!(parse_signature_header(header).is_none(), "{header:?}");
        }
    }
}
