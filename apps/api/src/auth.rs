//! JWT authentication module.
//!
//! Handles token generation and validation, password hashing, and the
//! [`AuthUser`] extractor that guards every protected route.
//!
//! ## Token lifecycle
//! ```text
//!   Anonymous ──login──► Authenticated(access, refresh)
//!                              │
//!                access expires│
//!                              ▼
//!                   refresh(refresh) ──► new pair, old refresh deleted
//!                              │
//!                      logout  ▼
//!                          LoggedOut (refresh row deleted)
//! ```
//!
//! Access tokens are stateless. Refresh tokens are only honoured while their
//! row exists in `refresh_tokens`.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tally_core::Role;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

pub const ACCESS_TOKEN: &str = "access";
pub const REFRESH_TOKEN: &str = "refresh";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Role at the time the token was issued
    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type ("access" or "refresh")
    pub token_type: String,
}

/// JWT token manager.
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_lifetime_secs: i64,
    refresh_lifetime_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: &str, access_lifetime_secs: i64, refresh_lifetime_secs: i64) -> Self {
        JwtManager {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_lifetime_secs,
            refresh_lifetime_secs,
        }
    }

    pub fn access_lifetime_secs(&self) -> i64 {
        self.access_lifetime_secs
    }

    fn issue(
        &self,
        user_id: &str,
        role: Role,
        token_type: &str,
        lifetime_secs: i64,
    ) -> Result<(String, DateTime<Utc>), ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(lifetime_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: token_type.to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::internal(format!("Failed to generate {token_type} token: {e}")))?;

        Ok((token, exp))
    }

    /// Generate an access token.
    pub fn generate_access_token(&self, user_id: &str, role: Role) -> Result<String, ApiError> {
        self.issue(user_id, role, ACCESS_TOKEN, self.access_lifetime_secs)
            .map(|(token, _)| token)
    }

    /// Generate a refresh token and the instant it stops being valid.
    pub fn generate_refresh_token(
        &self,
        user_id: &str,
        role: Role,
    ) -> Result<(String, DateTime<Utc>), ApiError> {
        self.issue(user_id, role, REFRESH_TOKEN, self.refresh_lifetime_secs)
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> =
            decode(token, &self.decoding_key, &Validation::default())
                .map_err(|e| ApiError::unauthenticated(format!("Invalid token: {e}")))?;

        Ok(token_data.claims)
    }

    /// Validate that a token is an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != ACCESS_TOKEN {
            return Err(ApiError::unauthenticated("Expected access token"));
        }

        Ok(claims)
    }

    /// Validate that a token is a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != REFRESH_TOKEN {
            return Err(ApiError::unauthenticated("Expected refresh token"));
        }

        Ok(claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Passwords
// =============================================================================

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;

    Ok(hash.to_string())
}

/// Verify a password against its stored hash. A malformed hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Extractor
// =============================================================================

/// The caller behind a valid access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthenticated("Missing bearer token"))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::unauthenticated("Malformed authorization header"))?;

        let claims = state.jwt.validate_access_token(token)?;

        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new("test-secret-that-is-long-enough-32b", 900, 86_400)
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = manager();

        let access_token = manager.generate_access_token("user-001", Role::Admin).unwrap();
        let claims = manager.validate_access_token(&access_token).unwrap();

        assert_eq!(claims.sub, "user-001");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.token_type, ACCESS_TOKEN);
    }

    #[test]
    fn test_refresh_token() {
        let manager = manager();

        let (refresh_token, expires_at) = manager.generate_refresh_token("user-001", Role::User).unwrap();
        let claims = manager.validate_refresh_token(&refresh_token).unwrap();

        assert_eq!(claims.token_type, REFRESH_TOKEN);
        assert_eq!(claims.exp, expires_at.timestamp());
    }

    #[test]
    fn refresh_tokens_are_unique() {
        let manager = manager();
        let (a, _) = manager.generate_refresh_token("user-001", Role::User).unwrap();
        let (b, _) = manager.generate_refresh_token("user-001", Role::User).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_token_type() {
        let manager = manager();

        let access_token = manager.generate_access_token("user-001", Role::User).unwrap();
        assert!(manager.validate_refresh_token(&access_token).is_err());

        let (refresh_token, _) = manager.generate_refresh_token("user-001", Role::User).unwrap();
        assert!(manager.validate_access_token(&refresh_token).is_err());
    }

    #[test]
    fn foreign_signature_rejected() {
        let other = JwtManager::new("another-secret-that-is-long-enough", 900, 86_400);
        let token = other.generate_access_token("user-001", Role::Admin).unwrap();

        let err = manager().validate_access_token(&token).unwrap_err();
        assert_eq!(err.code, "UNAUTHENTICATED");
    }

    #[test]
    fn bearer_prefix_required() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }
}
