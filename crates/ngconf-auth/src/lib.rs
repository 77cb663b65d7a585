//! Bearer-token authentication collaborator (§4.11), grounded on
//! `original_source/internal/pkg/bifrost/auth.go`. [`Claims`] mirrors
//! `JWTClaims` (trimmed to subject and expiry — §4.11 scopes permissions
//! and full-name fields out of the core engine's concern); [`issue_token`]/
//! [`verify_token`] mirror `getToken`/`verifyAction`; [`UserStore`]
//! abstracts `validUser`'s credential check.

mod store;

pub use store::{StaticUserStore, UserStore};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Token lifetime in seconds, matching `auth.go`'s `ExpireTime`.
pub const DEFAULT_EXPIRE_SECONDS: u64 = 3600;

/// The claims carried by an issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated username, mirroring `JWTClaims.Username`.
    pub sub: String,
    /// Unix timestamp the token expires at, mirroring `JWTClaims.StandardClaims.ExpiresAt`.
    pub exp: u64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Issues and verifies bearer tokens signed with a single shared secret.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expire_seconds: u64,
}

impl TokenIssuer {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expire_seconds: DEFAULT_EXPIRE_SECONDS,
        }
    }

    pub fn with_expire_seconds(mut self, seconds: u64) -> Self {
        self.expire_seconds = seconds;
        self
    }

    /// Verifies `username`/`password` against `store` and, on success,
    /// issues a token expiring `expire_seconds` from now. Mirrors
    /// `validUser` followed by `getToken`.
    pub fn login(
        &self,
        store: &dyn UserStore,
        username: &str,
        password: &str,
    ) -> Result<String, AuthError> {
        if !store.verify(username, password) {
            return Err(AuthError::InvalidCredentials);
        }
        self.issue_token(username)
    }

    /// Issues a token for `username`, expiring `expire_seconds` from now.
    pub fn issue_token(&self, username: &str) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before epoch")
            .as_secs();
        self.issue_token_expiring_at(username, now + self.expire_seconds)
    }

    /// Issues a token for `username` with an explicit absolute expiry,
    /// primarily for tests that need a token already in the past.
    pub fn issue_token_expiring_at(&self, username: &str, exp: u64) -> Result<String, AuthError> {
        let claims = Claims {
            sub: username.to_string(),
            exp,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Verifies `token`'s signature and expiry, returning its claims.
    /// Mirrors `verifyAction` (the username/password re-check against the
    /// store is the caller's responsibility, since not every verification
    /// site has a store handy — e.g. a request already carrying a token).
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::StaticUserStore;

    #[test]
    fn issued_token_verifies_successfully() {
        let issuer = TokenIssuer::new(b"test-secret");
        let token = issuer.issue_token("admin").unwrap();
        let claims = issuer.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "admin");
    }

    #[test]
    fn expired_token_fails_verification() {
        let issuer = TokenIssuer::new(b"test-secret");
        let token = issuer.issue_token_expiring_at("admin", 1).unwrap();
        let err = issuer.verify_token(&token).unwrap_err();
        assert!(matches!(err, AuthError::Token(_)));
    }

    #[test]
    fn login_rejects_wrong_password() {
        let issuer = TokenIssuer::new(b"test-secret");
        let store = StaticUserStore::new("admin", "correct-horse");
        let err = issuer
            .login(&store, "admin", "wrong-password")
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn login_succeeds_with_correct_credentials() {
        let issuer = TokenIssuer::new(b"test-secret");
        let store = StaticUserStore::new("admin", "correct-horse");
        let token = issuer.login(&store, "admin", "correct-horse").unwrap();
        assert_eq!(issuer.verify_token(&token).unwrap().sub, "admin");
    }
}
