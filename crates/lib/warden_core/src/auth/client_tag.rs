//! Client-scoped secondary authentication tag.
//!
//! HMAC-SHA256 of the per-issuance client key under the client secret,
//! URL-safe base64 encoded. Bound into every claim set so a refresh can
//! re-derive it without consulting any store.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn keyed(client_secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(client_secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"))
}

/// Derive the tag for `client_key` under `client_secret`.
pub fn derive(client_key: &str, client_secret: &str) -> String {
    let mut mac = keyed(client_secret);
    mac.update(client_key.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Constant-time check that `tag` re-derives from `client_key` under `client_secret`.
pub fn verify(tag: &str, client_key: &str, client_secret: &str) -> bool {
    let Ok(expected) = URL_SAFE_NO_PAD.decode(tag) else {
        return false;
    };
    let mut mac = keyed(client_secret);
    mac.update(client_key.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        assert_eq!(derive("ck", "secret"), derive("ck", "secret"));
        assert_ne!(derive("ck", "secret"), derive("ck2", "secret"));
        assert_ne!(derive("ck", "secret"), derive("ck", "secret2"));
    }

    #[test]
    fn verify_accepts_only_matching_secret() {
        let tag = derive("client-key", "s3cret");
        assert!(verify(&tag, "client-key", "s3cret"));
        assert!(!verify(&tag, "client-key", "wrong"));
        assert!(!verify(&tag, "other-key", "s3cret"));
    }

    #[test]
    fn verify_rejects_undecodable_tag() {
        assert!(!verify("%%%", "client-key", "s3cret"));
        assert!(!verify("", "client-key", "s3cret"));
    }
}
