use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signature sent with webhook deliveries as `Domwatch-Signature`.
/// Receivers recompute the HMAC over `{timestamp}.{body}` with their channel
/// secret to authenticate the payload.
pub fn sign_delivery_payload(secret: &str, timestamp: i64, body: &str) -> String {
    let signed_content = format!("{}.{}", timestamp, body);
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(signed_content.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("t={},v1={}", timestamp, signature)
}
