//! authgate store - persistence for users and issued tokens
//!
//! Two traits describe what the token lifecycle needs from storage:
//! [`CredentialStore`] for user accounts and [`TokenStore`] for the
//! allowlist of live access and refresh tokens. Implementations:
//! - [`MemoryStore`]: process-local, used for tests and single-node demos
//! - [`SurrealStore`]: SurrealDB document store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;
pub mod surrealdb_store;

pub use memory::MemoryStore;
pub use surrealdb_store::SurrealStore;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Stored user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// PHC-format password hash, never the raw password
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to create a user; the store assigns id and timestamp
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Which kind of token a record holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live token. Deleting the record revokes the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    pub user_id: String,
    pub kind: TokenKind,
    pub created_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn new(token: impl Into<String>, user_id: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
            kind,
            created_at: Utc::now(),
        }
    }
}

/// User account storage
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a user by (normalized) email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Create a user. Email uniqueness is enforced atomically by the store
    /// and reported as [`StoreError::DuplicateEmail`].
    async fn create(&self, user: NewUser) -> Result<User>;

    /// Cheap connectivity check for readiness probes
    async fn ping(&self) -> Result<()>;
}

/// Allowlist of issued tokens keyed by `(user_id, kind)`
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist all records or none of them
    async fn insert(&self, records: Vec<TokenRecord>) -> Result<()>;

    /// Find the record holding exactly `token`
    async fn find(&self, user_id: &str, kind: TokenKind, token: &str)
        -> Result<Option<TokenRecord>>;

    /// All records of one kind owned by a user
    async fn find_for_user(&self, user_id: &str, kind: TokenKind) -> Result<Vec<TokenRecord>>;

    /// Delete every access record of the user and insert `record`, atomically,
    /// provided the user still holds the refresh record `refresh_token`.
    /// Returns the number of records deleted, or `None` when the refresh
    /// record is gone and nothing was changed.
    async fn replace_access(
        &self,
        user_id: &str,
        refresh_token: &str,
        record: TokenRecord,
    ) -> Result<Option<u64>>;

    /// Delete every access and refresh record of the user, atomically.
    /// Returns the number of records deleted.
    async fn revoke_user(&self, user_id: &str) -> Result<u64>;
}
