//! Signed bearer tokens (HS256 JWT).
//!
//! Tokens are self-contained and live for [`TOKEN_TTL_HOURS`]. There is no
//! server-side revocation list: a token stays valid until it expires.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Issuer tag embedded in (and required of) every token.
pub const ISSUER: &str = "first-aid-app";

pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub email: String,
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    /// Structure, signature, issuer or expiry check failed. Deliberately
    /// carries no detail.
    #[error("invalid token")]
    Invalid,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Issues and validates tokens against one process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_nbf = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::hours(TOKEN_TTL_HOURS),
        }
    }

    pub fn issue(&self, user_id: i64, email: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, email, Utc::now())
    }

    /// Issue a token as if minted at `issued_at`.
    pub fn issue_at(
        &self,
        user_id: i64,
        email: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let subject = user_id.to_string();
        let claims = Claims {
            user_id: subject.clone(),
            email: email.to_string(),
            sub: subject,
            iss: ISSUER.to_string(),
            iat: issued_at.timestamp(),
            nbf: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, issuer and `now < exp`. Every failure is
    /// [`TokenError::Invalid`].
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| TokenError::Invalid)?;

        // jsonwebtoken accepts exp == now; the token must be strictly unexpired.
        if data.claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Invalid);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"test-secret")
    }

    #[test]
    fn test_issue_then_validate() {
        let token = service().issue(42, "a@b.com").unwrap();
        let claims = service().validate(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.user_id, "42");
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issued = Utc::now() - Duration::hours(TOKEN_TTL_HOURS + 1);
        let token = service().issue_at(42, "a@b.com", issued).unwrap();
        assert!(matches!(service().validate(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_token_near_expiry_is_still_valid() {
        let issued = Utc::now() - Duration::hours(TOKEN_TTL_HOURS) + Duration::minutes(5);
        let token = service().issue_at(42, "a@b.com", issued).unwrap();
        assert!(service().validate(&token).is_ok());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = TokenService::new(b"other-secret").issue(42, "a@b.com").unwrap();
        assert!(matches!(service().validate(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let token = service().issue(42, "a@b.com").unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let forged = service().issue(7, "evil@b.com").unwrap();
        parts[1] = forged.split('.').nth(1).unwrap().to_string();
        let tampered = parts.join(".");
        assert!(matches!(service().validate(&tampered), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(service().validate(""), Err(TokenError::Invalid)));
        assert!(matches!(service().validate("a.b.c"), Err(TokenError::Invalid)));
        assert!(matches!(service().validate("not a token"), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_foreign_issuer_is_rejected() {
        let now = Utc::now();
        let claims = Claims {
            user_id: "42".into(),
            email: "a@b.com".into(),
            sub: "42".into(),
            iss: "someone-else".into(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(matches!(service().validate(&token), Err(TokenError::Invalid)));
    }
}
