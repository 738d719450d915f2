//! Bearer token issuing and the authentication middleware

use crate::api::rest::state::AppState;
use crate::config::AuthConfig;
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token could not be signed
    #[error("failed to sign token: {0}")]
    Signing(String),

    /// Token is malformed, expired or badly signed
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Claims carried by issued tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User email
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 bearer tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl_secs: i64::try_from(config.token_ttl_secs).unwrap_or(i64::MAX),
        }
    }

    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AuthError::Signing(err.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| AuthError::Invalid(err.to_string()))
    }
}

/// Reject requests without a valid bearer token.
///
/// On success the verified [`Claims`] are added to the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    let Some(token) = token else {
        return Err(unauthenticated());
    };

    match state.tokens.verify(token) {
        Ok(claims) => {
            tracing::debug!(subject = %claims.sub, "Authenticated request");
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(err) => {
            tracing::debug!(error = %err, "Rejected bearer token");
            Err(unauthenticated())
        }
    }
}

fn unauthenticated() -> ApiError {
    ApiError::Unauthorized("authentication required".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(secret: &str, ttl: u64) -> TokenIssuer {
        TokenIssuer::new(&AuthConfig {
            jwt_secret: secret.to_string(),
            token_ttl_secs: ttl,
        })
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = issuer("secret", 60);
        let token = tokens.issue("juan@rodriguez.org").unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "juan@rodriguez.org");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issuer("secret", 60).issue("a@b.co").unwrap();
        assert!(issuer("other", 60).verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = issuer("secret", 0);
        let token = tokens.issue("a@b.co").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(issuer("secret", 60).verify("not.a.token").is_err());
    }
}
