//! JWT token generation and validation
//!
//! Access and refresh tokens are both HMAC-SHA256 JWTs, signed with two
//! independent secrets so that one leaked secret cannot mint the other kind.
//! Access tokens expire after `access_expiration_secs`; refresh tokens carry
//! no `exp` claim and stay valid until their store record is deleted.

use authgate_core::AuthConfig;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - user ID
    pub sub: String,
    /// JWT ID, unique per token
    pub jti: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch), absent on refresh tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

impl JwtError {
    pub fn is_expired(&self) -> bool {
        matches!(self, JwtError::ExpiredToken)
    }
}

/// JWT Configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret for access tokens
    pub access_secret: String,
    /// Secret for refresh tokens
    pub refresh_secret: String,
    /// Access token lifetime in seconds
    pub access_expiration_secs: u64,
    /// Token issuer identifier
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            access_secret: config.access_token_secret.clone(),
            refresh_secret: config.refresh_token_secret.clone(),
            access_expiration_secs: config.access_token_ttl_secs,
            issuer: config.issuer.clone(),
        }
    }
}

fn now_secs() -> Result<u64, JwtError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

fn sign(secret: &str, claims: &Claims) -> Result<String, JwtError> {
    let token = encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn verify(secret: &str, token: &str, validation: &Validation) -> Result<Claims, JwtError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Generate a short-lived access token for `user_id`
///
/// # Example
///
/// ```no_run
/// use authgate_api::auth::jwt::{generate_access_token, validate_access_token, JwtConfig};
///
/// let config = JwtConfig::default();
/// let token = generate_access_token(&config, "7f1c...").expect("Failed to generate token");
/// let claims = validate_access_token(&config, &token).expect("Invalid token");
/// assert_eq!(claims.sub, "7f1c...");
/// ```
pub fn generate_access_token(config: &JwtConfig, user_id: &str) -> Result<String, JwtError> {
    let now = now_secs()?;

    let claims = Claims {
        iss: config.issuer.clone(),
        sub: user_id.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now,
        exp: Some(now + config.access_expiration_secs),
    };

    sign(&config.access_secret, &claims)
}

/// Generate a refresh token for `user_id` (no expiry)
pub fn generate_refresh_token(config: &JwtConfig, user_id: &str) -> Result<String, JwtError> {
    let claims = Claims {
        iss: config.issuer.clone(),
        sub: user_id.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now_secs()?,
        exp: None,
    };

    sign(&config.refresh_secret, &claims)
}

/// Validate an access token's signature, issuer and expiry
pub fn validate_access_token(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.set_required_spec_claims(&["exp", "sub", "iss"]);
    // The lifetime is only seconds long; the default 60s leeway would swamp it
    validation.leeway = 0;

    verify(&config.access_secret, token, &validation)
}

/// Validate a refresh token's signature and issuer
pub fn validate_refresh_token(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.set_required_spec_claims(&["sub", "iss"]);
    validation.validate_exp = false;

    verify(&config.refresh_secret, token, &validation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_validate_access_token() {
        let config = JwtConfig::default();

        let token = generate_access_token(&config, "user-1").expect("Failed to generate token");
        let claims = validate_access_token(&config, &token).expect("Failed to validate token");

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.iss, "authgate");
        assert_eq!(claims.exp, Some(claims.iat + 15));
    }

    #[test]
    fn test_refresh_token_has_no_expiry() {
        let config = JwtConfig::default();

        let token = generate_refresh_token(&config, "user-1").unwrap();
        let claims = validate_refresh_token(&config, &token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert!(claims.exp.is_none());
    }

    #[test]
    fn test_tokens_are_unique() {
        let config = JwtConfig::default();

        let first = generate_access_token(&config, "user-1").unwrap();
        let second = generate_access_token(&config, "user-1").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_kinds_do_not_cross_verify() {
        let config = JwtConfig::default();

        let access = generate_access_token(&config, "user-1").unwrap();
        let refresh = generate_refresh_token(&config, "user-1").unwrap();

        assert!(matches!(
            validate_refresh_token(&config, &access),
            Err(JwtError::InvalidSignature)
        ));
        assert!(matches!(
            validate_access_token(&config, &refresh),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_invalid_token() {
        let config = JwtConfig::default();
        let result = validate_access_token(&config, "invalid.token.here");
        assert!(matches!(result, Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = JwtConfig {
            access_secret: "secret1".to_string(),
            ..Default::default()
        };
        let config2 = JwtConfig {
            access_secret: "secret2".to_string(),
            ..Default::default()
        };

        let token = generate_access_token(&config1, "user-1").unwrap();

        let result = validate_access_token(&config2, &token);
        assert!(matches!(result, Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_expired_token() {
        let config = JwtConfig::default();
        let now = now_secs().unwrap();

        let claims = Claims {
            iss: config.issuer.clone(),
            sub: "user-1".to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now - 30,
            exp: Some(now - 15),
        };
        let token = sign(&config.access_secret, &claims).unwrap();

        let result = validate_access_token(&config, &token);
        assert!(matches!(result, Err(JwtError::ExpiredToken)));
        assert!(result.unwrap_err().is_expired());
    }

    #[test]
    fn test_access_token_requires_expiry() {
        let config = JwtConfig::default();

        // Signed with the access secret but shaped like a refresh token
        let claims = Claims {
            iss: config.issuer.clone(),
            sub: "user-1".to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now_secs().unwrap(),
            exp: None,
        };
        let token = sign(&config.access_secret, &claims).unwrap();

        assert!(matches!(
            validate_access_token(&config, &token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_issuer() {
        let config = JwtConfig::default();
        let other = JwtConfig {
            issuer: "someone-else".to_string(),
            ..Default::default()
        };

        let token = generate_refresh_token(&other, "user-1").unwrap();
        assert!(matches!(
            validate_refresh_token(&config, &token),
            Err(JwtError::InvalidToken)
        ));
    }
}
