//! Webhook signature verification for receivers.
//!
//! Tollgate signs every delivery with an `x-tollgate-signature` header of
//! the form `t=<unix_ts>,v1=<hex>` where the hex value is
//! `HMAC-SHA256(secret, "<t>.<payload>")`. Verify the header against the
//! raw request body before trusting a delivery, and deduplicate on the
//! envelope `id`: delivery is at-least-once.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "x-tollgate-signature";

/// Default tolerance for the signature timestamp, in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Verify a delivery's signature header against its raw payload.
///
/// Rejects headers whose timestamp is more than `tolerance_secs` away from
/// the current time.
#[must_use]
pub fn verify_webhook(secret: &str, payload: &str, header: &str, tolerance_secs: i64) -> bool {
    verify_webhook_at(
        secret,
        payload,
        header,
        tolerance_secs,
        chrono::Utc::now().timestamp(),
    )
}

/// [`verify_webhook`] with an explicit `now`, for deterministic tests.
#[must_use]
pub fn verify_webhook_at(
    secret: &str,
    payload: &str,
    header: &str,
    tolerance_secs: i64,
    now: i64,
) -> bool {
    let mut timestamp = None;
    let mut signature = None;
    for element in header.split(',') {
        match element.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return false;
    };

    if (now - timestamp).abs() > tolerance_secs {
        return false;
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts any key size");
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    constant_time_eq(signature, &expected)
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, payload: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.{payload}").as_bytes());
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_accepted() {
        let header = sign("whsec_x", "{}", 1_700_000_000);
        assert!(verify_webhook_at("whsec_x", "{}", &header, 300, 1_700_000_000));
    }

    #[test]
    fn wrong_secret_or_payload_rejected() {
        let header = sign("whsec_x", "{}", 1_700_000_000);
        assert!(!verify_webhook_at("whsec_y", "{}", &header, 300, 1_700_000_000));
        assert!(!verify_webhook_at("whsec_x", "{...}", &header, 300, 1_700_000_000));
    }

    #[test]
    fn stale_timestamp_rejected() {
        let header = sign("whsec_x", "{}", 1_700_000_000);
        assert!(!verify_webhook_at("whsec_x", "{}", &header, 300, 1_700_000_301));
    }

    #[test]
    fn malformed_header_rejected() {
        assert!(!verify_webhook_at("whsec_x", "{}", "t=abc,v1=def", 300, 0));
        assert!(!verify_webhook_at("whsec_x", "{}", "", 300, 0));
    }
}
