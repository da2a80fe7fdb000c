//! JWT token signing and verification (HS256 only).

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::AuthError;
use crate::models::auth::TokenClaims;

/// The only algorithm the codec signs with or accepts.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Stateless signer/verifier for [`TokenClaims`].
///
/// Holds the process-wide secret; cheap to share behind an `Arc`.
#[derive(Clone)]
pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtCodec {
    /// Build a codec for `secret`, accepting only tokens from `issuer`.
    ///
    /// Fails with [`AuthError::Signing`] when the secret is empty.
    pub fn new(secret: &[u8], issuer: &str) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Signing("signing secret is unavailable".into()));
        }
        // `Validation::new` restricts `algorithms` to exactly this one, so a
        // header naming anything else fails with `InvalidAlgorithm`.
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Sign a claim set into a compact JWT.
    pub fn sign(&self, claims: &TokenClaims) -> Result<String, AuthError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding)
            .map_err(|e| AuthError::Signing(format!("jwt encode: {e}")))
    }

    /// Verify signature, algorithm, issuer and timing; return the claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Malformed(e.to_string()),
            })
    }
}

impl std::fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCodec")
            .field("algorithm", &ALGORITHM)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::Utc;

    use super::*;
    use crate::models::auth::TokenKind;

    const SECRET: &[u8] = b"codec-test-secret";

    fn codec() -> JwtCodec {
        JwtCodec::new(SECRET, "warden").unwrap()
    }

    fn claims_expiring_in(secs: i64) -> TokenClaims {
        let now = Utc::now().timestamp();
        TokenClaims {
            uid: "42".into(),
            username: "alice".into(),
            role_id: "editor".into(),
            client_key: "client-1".into(),
            tag: "tag".into(),
            remember: false,
            kind: TokenKind::Access,
            jti: "jti-1".into(),
            iat: now - 5,
            nbf: now - 5,
            exp: now + secs,
            iss: "warden".into(),
            sub: "42".into(),
        }
    }

    #[test]
    fn sign_then_verify_reproduces_claims() {
        let codec = codec();
        let claims = claims_expiring_in(60);
        let token = codec.sign(&claims).unwrap();
        assert_eq!(codec.verify(&token).unwrap(), claims);
    }

    #[test]
    fn empty_secret_is_a_signing_error() {
        assert!(matches!(JwtCodec::new(b"", "warden"), Err(AuthError::Signing(_))));
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let codec = codec();
        let token = codec.sign(&claims_expiring_in(-10)).unwrap();
        assert!(matches!(codec.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn wrong_secret_is_malformed() {
        let token = codec().sign(&claims_expiring_in(60)).unwrap();
        let other = JwtCodec::new(b"another-secret", "warden").unwrap();
        assert!(matches!(other.verify(&token), Err(AuthError::Malformed(_))));
    }

    #[test]
    fn foreign_issuer_is_malformed() {
        let token = codec().sign(&claims_expiring_in(60)).unwrap();
        let other = JwtCodec::new(SECRET, "someone-else").unwrap();
        assert!(matches!(other.verify(&token), Err(AuthError::Malformed(_))));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(codec().verify("not.a.jwt"), Err(AuthError::Malformed(_))));
        assert!(matches!(codec().verify(""), Err(AuthError::Malformed(_))));
    }

    #[test]
    fn other_hmac_algorithm_is_refused() {
        let claims = claims_expiring_in(60);
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        assert!(matches!(codec().verify(&token), Err(AuthError::Malformed(_))));
    }

    #[test]
    fn unsigned_none_algorithm_is_refused() {
        let claims = claims_expiring_in(60);
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let token = format!("{header}.{payload}.");
        assert!(matches!(codec().verify(&token), Err(AuthError::Malformed(_))));
    }

    #[test]
    fn tampered_payload_is_malformed() {
        let codec = codec();
        let token = codec.sign(&claims_expiring_in(60)).unwrap();
        let mut forged = claims_expiring_in(60);
        forged.role_id = "admin".into();
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let parts: Vec<&str> = token.split('.').collect();
        let token = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert!(matches!(codec.verify(&token), Err(AuthError::Malformed(_))));
    }
}
