//! Token lifecycle: issuance, verification, rotation and revocation
//!
//! A token is only accepted while its record exists in the [`TokenStore`];
//! a valid signature on its own is never enough. Deleting records is how
//! tokens are revoked.

use super::jwt::{
    generate_access_token, generate_refresh_token, validate_access_token, validate_refresh_token,
    JwtConfig, JwtError,
};
use super::models::TokenPair;
use crate::error::AppError;
use authgate_store::{TokenKind, TokenRecord, TokenStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

fn signing_error(err: JwtError) -> AppError {
    AppError::Internal(format!("token signing failed: {err}"))
}

fn refresh_not_found() -> AppError {
    AppError::NotFound("Can't find that refresh-token".to_string())
}

/// Issues, verifies, rotates and revokes tokens against a [`TokenStore`]
#[derive(Clone)]
pub struct TokenService {
    jwt: JwtConfig,
    store: Arc<dyn TokenStore>,
}

impl TokenService {
    pub fn new(jwt: JwtConfig, store: Arc<dyn TokenStore>) -> Self {
        Self { jwt, store }
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt
    }

    /// Sign and persist a new access token
    pub async fn issue_access_token(&self, user_id: &str) -> Result<String, AppError> {
        let token = generate_access_token(&self.jwt, user_id).map_err(signing_error)?;
        self.store
            .insert(vec![TokenRecord::new(&token, user_id, TokenKind::Access)])
            .await?;

        debug!(user_id, "access token issued");
        Ok(token)
    }

    /// Sign and persist a new refresh token
    pub async fn issue_refresh_token(&self, user_id: &str) -> Result<String, AppError> {
        let token = generate_refresh_token(&self.jwt, user_id).map_err(signing_error)?;
        self.store
            .insert(vec![TokenRecord::new(&token, user_id, TokenKind::Refresh)])
            .await?;

        debug!(user_id, "refresh token issued");
        Ok(token)
    }

    /// Sign both tokens and persist them in a single insert
    pub async fn issue_pair(&self, user_id: &str) -> Result<TokenPair, AppError> {
        let access_token = generate_access_token(&self.jwt, user_id).map_err(signing_error)?;
        let refresh_token = generate_refresh_token(&self.jwt, user_id).map_err(signing_error)?;

        self.store
            .insert(vec![
                TokenRecord::new(&access_token, user_id, TokenKind::Access),
                TokenRecord::new(&refresh_token, user_id, TokenKind::Refresh),
            ])
            .await?;

        debug!(user_id, "token pair issued");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verify an access token and return its user id
    ///
    /// Fails with [`AppError::InvalidSignature`] when the token does not
    /// verify (the wrapped [`JwtError`] tells expiry apart) and with
    /// [`AppError::NotRecognized`] when the store holds no live record for it.
    pub async fn verify_access_token(&self, token: &str) -> Result<String, AppError> {
        let claims = validate_access_token(&self.jwt, token).map_err(AppError::InvalidSignature)?;

        let record = self
            .store
            .find(&claims.sub, TokenKind::Access, token)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "access token not in store");
                AppError::NotRecognized
            })?;

        if record.user_id != claims.sub {
            warn!(user_id = %claims.sub, owner = %record.user_id, "access token owner mismatch");
            return Err(AppError::NotRecognized);
        }

        Ok(claims.sub)
    }

    /// Exchange a refresh token for a new access token
    ///
    /// Every access token previously issued to the user is revoked in the
    /// same store operation that persists the new one. That operation only
    /// succeeds while the refresh record still exists, so a logout landing
    /// mid-rotation leaves no access token behind.
    pub async fn rotate_access_token(&self, refresh_token: Option<&str>) -> Result<String, AppError> {
        let presented = refresh_token.ok_or(AppError::AccessDenied)?;
        let claims =
            validate_refresh_token(&self.jwt, presented).map_err(AppError::InvalidSignature)?;

        let record = self
            .store
            .find(&claims.sub, TokenKind::Refresh, presented)
            .await?
            .ok_or_else(refresh_not_found)?;

        let stored = validate_refresh_token(&self.jwt, &record.token).map_err(AppError::Corrupt)?;
        if stored.sub != claims.sub {
            warn!(user_id = %claims.sub, stored = %stored.sub, "refresh token identity mismatch");
            return Err(AppError::UserMismatch);
        }

        let token = generate_access_token(&self.jwt, &claims.sub).map_err(signing_error)?;
        let revoked = self
            .store
            .replace_access(
                &claims.sub,
                presented,
                TokenRecord::new(&token, &claims.sub, TokenKind::Access),
            )
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "refresh token revoked during rotation");
                refresh_not_found()
            })?;

        info!(user_id = %claims.sub, revoked, "access token rotated");
        Ok(token)
    }

    /// Revoke every access and refresh token of the refresh token's owner
    ///
    /// Only the signature is checked: any valid refresh token of the user
    /// ends all of their sessions. Returns the number of revoked records.
    pub async fn revoke_all(&self, refresh_token: Option<&str>) -> Result<u64, AppError> {
        let presented = refresh_token.ok_or(AppError::AccessDenied)?;
        let claims =
            validate_refresh_token(&self.jwt, presented).map_err(AppError::InvalidSignature)?;

        let revoked = self.store.revoke_user(&claims.sub).await?;
        if revoked == 0 {
            return Err(AppError::NothingToRevoke);
        }

        info!(user_id = %claims.sub, revoked, "tokens revoked");
        Ok(revoked)
    }
}
