//! Identity gate.
//!
//! Sessions are issued by an external identity provider as HS256 JWTs whose
//! `sub` is the user id. This module only verifies them (and mints tokens for
//! development via the CLI); it never manages credentials.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{self, SecurityConfig};
use crate::error::ActionError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        let security = &config::config().security;
        let exp = (now + Duration::hours(security.jwt_expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            name: name.into(),
            email: email.into(),
            picture: None,
            iss: security.jwt_issuer.clone(),
            exp,
            iat: now.timestamp(),
        }
    }

    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = Some(picture.into());
        self
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidToken(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidToken(msg) => write!(f, "Invalid JWT token: {}", msg),
            JwtError::InvalidSecret => write!(f, "JWT secret not configured"),
        }
    }
}

impl std::error::Error for JwtError {}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    sign(claims, &config::config().security)
}

pub fn validate_jwt(token: &str) -> Result<Claims, JwtError> {
    verify(token, &config::config().security)
}

fn sign(claims: &Claims, security: &SecurityConfig) -> Result<String, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

fn verify(token: &str, security: &SecurityConfig) -> Result<Claims, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    if let Some(issuer) = &security.jwt_issuer {
        validation.set_issuer(&[issuer]);
    }

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

/// The acting principal, resolved from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name,
            email: claims.email,
            image: claims.picture,
        }
    }
}

/// Reject the call unless a session is present.
pub fn require_session(session: Option<&Session>) -> Result<&Session, ActionError> {
    session.ok_or_else(|| ActionError::unauthorized("Unauthorized"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn security(secret: &str, issuer: Option<&str>) -> SecurityConfig {
        SecurityConfig {
            enable_cors: false,
            cors_origins: vec![],
            jwt_secret: secret.to_string(),
            jwt_issuer: issuer.map(str::to_string),
            jwt_expiry_hours: 1,
        }
    }

    #[test]
    fn tokens_round_trip_into_sessions() {
        let sec = security("s3cret", None);
        let claims = Claims::new(Uuid::new_v4(), "Ada", "ada@example.com").with_picture("https://img/ada.png");
        let user_id = claims.sub;

        let token = sign(&claims, &sec).unwrap();
        let session = Session::from(verify(&token, &sec).unwrap());

        assert_eq!(session.user_id, user_id);
        assert_eq!(session.image.as_deref(), Some("https://img/ada.png"));
    }

    #[test]
    fn wrong_secret_or_issuer_is_rejected() {
        let mut claims = Claims::new(Uuid::new_v4(), "Ada", "ada@example.com");
        claims.iss = Some("someone-else".to_string());
        let token = sign(&claims, &security("one", None)).unwrap();

        assert!(verify(&token, &security("two", None)).is_err());
        assert!(verify(&token, &security("one", Some("devflow-idp"))).is_err());
    }

    #[test]
    fn empty_secret_disables_tokens() {
        let claims = Claims::new(Uuid::new_v4(), "Ada", "ada@example.com");
        assert!(matches!(sign(&claims, &security("", None)), Err(JwtError::InvalidSecret)));
    }

    #[test]
    fn missing_session_is_unauthorized() {
        let err = require_session(None).unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHORIZED");
    }
}
