//! Bearer token verification.
//!
//! The identity provider issues HS256 JWTs whose `sub` claim is the stable
//! user id. The server never sees passwords or sessions; it only validates
//! tokens and maps them to user ids.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::AppState;

/// Classified authentication failures; all map to 401
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authorization token")]
    MissingToken,

    #[error("Invalid authorization token")]
    InvalidToken,

    #[error("Authorization token expired")]
    ExpiredToken,
}

/// Claims carried by the identity provider's session token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Stable user identifier
    pub sub: String,
    /// Expiry (Unix timestamp)
    pub exp: usize,
}

/// Verifies an opaque bearer credential and resolves the user id
///
/// Side-effect free: verification never touches the usage store.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<String, AuthError>;
}

/// HS256 JWT verifier backed by a shared secret
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            // Defaults: HS256, exp required and checked
            validation: Validation::default(),
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<String, AuthError> {
        let data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                    _ => AuthError::InvalidToken,
                }
            })?;

        Ok(data.claims.sub)
    }
}

/// Extract the bearer token from the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidToken)
}

/// Resolve the caller's user id from the request headers
///
/// Every handler calls this first, before touching any state.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<String, AuthError> {
    let token = bearer_token(headers)?;
    state.verifier.verify(token).await.map_err(|e| {
        tracing::warn!("Token verification failed: {}", e);
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "unit-test-secret";

    fn token_with_exp(sub: &str, exp: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: exp as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_bearer_token_extraction() {
        let headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Err(AuthError::MissingToken));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), Ok("abc123"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_bearer_token_rejects_empty_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&headers), Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_verify_valid_token() {
        let verifier = JwtVerifier::new(SECRET);
        let token = token_with_exp("user_123", chrono::Utc::now().timestamp() + 3600);

        assert_eq!(verifier.verify(&token).await, Ok("user_123".to_string()));
    }

    #[tokio::test]
    async fn test_verify_expired_token() {
        let verifier = JwtVerifier::new(SECRET);
        // Well past the default 60s leeway
        let token = token_with_exp("user_123", chrono::Utc::now().timestamp() - 3600);

        assert_eq!(verifier.verify(&token).await, Err(AuthError::ExpiredToken));
    }

    #[tokio::test]
    async fn test_verify_garbage_token() {
        let verifier = JwtVerifier::new(SECRET);

        assert_eq!(
            verifier.verify("not-a-jwt").await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn test_verify_wrong_secret() {
        let verifier = JwtVerifier::new("a-different-secret");
        let token = token_with_exp("user_123", chrono::Utc::now().timestamp() + 3600);

        assert_eq!(
            verifier.verify(&token).await,
            Err(AuthError::InvalidToken)
        );
    }
}
