//! Request identity - Turns request headers into the acting user's id.
//!
//! Two providers exist. [`HeaderIdentity`] trusts a header set by an authenticating
//! gateway in front of the service. [`JwtIdentity`] validates an HS256 bearer token and
//! uses its `sub` claim. Which one runs is chosen by the `[auth]` config section.

use crate::{
    config::{AuthConfig, AuthMode},
    errors::{Error, Result},
};
use axum::http::{HeaderMap, header::AUTHORIZATION};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Resolves the caller of a request.
pub trait IdentityProvider: Send + Sync {
    /// Returns the caller's user id or [`Error::Unauthenticated`].
    fn current_user_id(&self, headers: &HeaderMap) -> Result<String>;
}

/// Reads the user id from a fixed header.
#[derive(Debug, Clone)]
pub struct HeaderIdentity {
    header: String,
}

impl HeaderIdentity {
    /// Uses `header` (case-insensitive) as the identity source.
    #[must_use]
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }
}

impl IdentityProvider for HeaderIdentity {
    fn current_user_id(&self, headers: &HeaderMap) -> Result<String> {
        headers
            .get(self.header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or(Error::Unauthenticated)
    }
}

/// Claims read from a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Expiry as a unix timestamp
    pub exp: usize,
    /// Intended audience
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// Validates `Authorization: Bearer <token>` with a shared secret.
pub struct JwtIdentity {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentity {
    /// Builds a validator; `audience` is enforced only when given.
    #[must_use]
    pub fn new(secret: &str, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates a raw token.
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let decoded = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            debug!("Rejected bearer token: {e}");
            Error::Unauthenticated
        })?;
        Ok(decoded.claims)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

impl IdentityProvider for JwtIdentity {
    fn current_user_id(&self, headers: &HeaderMap) -> Result<String> {
        let token = bearer_token(headers).ok_or(Error::Unauthenticated)?;
        let claims = self.validate_token(token)?;
        if claims.sub.is_empty() {
            return Err(Error::Unauthenticated);
        }
        Ok(claims.sub)
    }
}

/// Builds the provider selected by `config`.
pub fn from_config(config: &AuthConfig) -> Result<Arc<dyn IdentityProvider>> {
    match config.mode {
        AuthMode::Header => Ok(Arc::new(HeaderIdentity::new(config.header.clone()))),
        AuthMode::Jwt => {
            let secret = config.jwt_secret.as_deref().ok_or_else(|| Error::Config {
                message: "auth.jwt_secret is required in jwt mode".to_string(),
            })?;
            Ok(Arc::new(JwtIdentity::new(
                secret,
                config.jwt_audience.as_deref(),
            )))
        }
    }
}
