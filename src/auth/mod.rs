pub mod password;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use password::{PasswordError, PasswordHasher};

/// Lifetime of an issued token. There is no refresh; clients log in again.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Who a token speaks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(identity: &Identity, now: DateTime<Utc>) -> Self {
        Self {
            user_id: identity.user_id,
            username: identity.username.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("missing or non-bearer authorization header")]
    Missing,
    #[error("invalid token")]
    Malformed,
    #[error("token has expired")]
    Expired,
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// A freshly signed token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates HS256 tokens with a server-held secret
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    pub fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let claims = Claims::new(identity, now);
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)?;

        Ok(IssuedToken {
            token,
            expires_at: now + Duration::hours(TOKEN_TTL_HOURS),
        })
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Checks the signature, then rejects once `now` is past `exp`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        // Expiry is checked against the caller's clock, not the library's
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            tracing::debug!("Rejected token: {}", e);
            TokenError::Malformed
        })?;

        if now.timestamp() > data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity {
            user_id: 7,
            username: "alice".to_string(),
        }
    }

    #[test]
    fn round_trip_returns_identity() {
        let tokens = TokenService::new("secret");
        let issued = tokens.issue(&alice()).unwrap();

        let claims = tokens.validate(&issued.token).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn expiry_is_exclusive_of_the_last_second() {
        let tokens = TokenService::new("secret");
        let issued_at = Utc::now();
        let token = tokens.issue_at(&alice(), issued_at).unwrap().token;

        let at_expiry = issued_at + Duration::hours(TOKEN_TTL_HOURS);
        assert!(tokens.validate_at(&token, at_expiry).is_ok());

        let after = at_expiry + Duration::seconds(1);
        assert!(matches!(tokens.validate_at(&token, after), Err(TokenError::Expired)));
    }

    #[test]
    fn wrong_secret_is_malformed() {
        let issued = TokenService::new("one").issue(&alice()).unwrap();
        let result = TokenService::new("two").validate(&issued.token);
        assert!(matches!(result, Err(TokenError::Malformed)));
    }

    #[test]
    fn tampered_token_is_malformed() {
        let tokens = TokenService::new("secret");
        let mut token = tokens.issue(&alice()).unwrap().token;
        token.push('x');

        assert!(matches!(tokens.validate(&token), Err(TokenError::Malformed)));
        assert!(matches!(tokens.validate("not-a-jwt"), Err(TokenError::Malformed)));
    }
}
