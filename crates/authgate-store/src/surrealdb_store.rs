//! SurrealDB implementation of the credential and token stores
//!
//! Tables:
//! - `users`: one document per account, `UNIQUE` index on `email`
//! - `tokens`: one document per live token, indexed on `(user_id, kind)`

use crate::{
    CredentialStore, NewUser, Result, StoreError, TokenKind, TokenRecord, TokenStore, User,
};
use async_trait::async_trait;
use authgate_core::DatabaseConfig;
use chrono::Utc;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::debug;
use uuid::Uuid;

const EMAIL_INDEX: &str = "idx_users_email";
const MISSING_REFRESH: &str = "refresh record not found";

const SCHEMA: &str = r#"
    DEFINE TABLE IF NOT EXISTS users SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS idx_users_email ON users FIELDS email UNIQUE;
    DEFINE TABLE IF NOT EXISTS tokens SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS idx_tokens_owner ON tokens FIELDS user_id, kind;
"#;

/// SurrealDB-backed store
#[derive(Clone)]
pub struct SurrealStore {
    client: Surreal<Client>,
}

impl SurrealStore {
    /// Open a SurrealDB connection and select namespace and database
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        // The ws engine adds the scheme itself
        let url = config
            .surrealdb_url
            .strip_prefix("ws://")
            .or_else(|| config.surrealdb_url.strip_prefix("wss://"))
            .unwrap_or(&config.surrealdb_url);

        let client = Surreal::new::<Ws>(url)
            .await
            .map_err(|e| StoreError::Connection(format!("SurrealDB connection failed: {e}")))?;

        client
            .signin(Root {
                username: &config.surrealdb_user,
                password: &config.surrealdb_pass,
            })
            .await
            .map_err(|e| StoreError::Connection(format!("SurrealDB auth failed: {e}")))?;

        client
            .use_ns(&config.surrealdb_namespace)
            .use_db(&config.surrealdb_database)
            .await
            .map_err(|e| StoreError::Connection(format!("SurrealDB namespace error: {e}")))?;

        Ok(Self { client })
    }

    /// Create tables and indexes (idempotent)
    pub async fn init_schema(&self) -> Result<()> {
        self.client
            .query(SCHEMA)
            .await
            .map_err(db_error)?
            .check()
            .map_err(db_error)?;

        Ok(())
    }
}

fn db_error(e: surrealdb::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

#[async_trait]
impl CredentialStore for SurrealStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users: Vec<User> = self
            .client
            .query(
                "SELECT meta::id(id) AS id, name, email, password_hash, created_at \
                 FROM users WHERE email = $email LIMIT 1",
            )
            .bind(("email", email.to_string()))
            .await
            .map_err(db_error)?
            .take(0)
            .map_err(db_error)?;

        Ok(users.into_iter().next())
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let created = User {
            id: Uuid::new_v4().to_string(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };

        let response = self
            .client
            .query(
                "CREATE type::thing('users', $id) CONTENT { \
                    name: $name, email: $email, password_hash: $password_hash, created_at: $created_at \
                 } RETURN NONE",
            )
            .bind(("id", created.id.clone()))
            .bind(("name", created.name.clone()))
            .bind(("email", created.email.clone()))
            .bind(("password_hash", created.password_hash.clone()))
            .bind(("created_at", created.created_at))
            .await
            .map_err(db_error)?;

        // A unique index violation is reported per statement
        response.check().map_err(|e| {
            let message = e.to_string();
            if message.contains(EMAIL_INDEX) {
                StoreError::DuplicateEmail
            } else {
                StoreError::Database(message)
            }
        })?;

        debug!(user_id = %created.id, "user document created");
        Ok(created)
    }

    async fn ping(&self) -> Result<()> {
        self.client.health().await.map_err(db_error)
    }
}

#[async_trait]
impl TokenStore for SurrealStore {
    async fn insert(&self, records: Vec<TokenRecord>) -> Result<()> {
        // A single INSERT statement is atomic
        self.client
            .query("INSERT INTO tokens $records RETURN NONE")
            .bind(("records", records))
            .await
            .map_err(db_error)?
            .check()
            .map_err(db_error)?;

        Ok(())
    }

    async fn find(
        &self,
        user_id: &str,
        kind: TokenKind,
        token: &str,
    ) -> Result<Option<TokenRecord>> {
        let records: Vec<TokenRecord> = self
            .client
            .query(
                "SELECT token, user_id, kind, created_at FROM tokens \
                 WHERE user_id = $user_id AND kind = $kind AND token = $token LIMIT 1",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("kind", kind))
            .bind(("token", token.to_string()))
            .await
            .map_err(db_error)?
            .take(0)
            .map_err(db_error)?;

        Ok(records.into_iter().next())
    }

    async fn find_for_user(&self, user_id: &str, kind: TokenKind) -> Result<Vec<TokenRecord>> {
        self.client
            .query(
                "SELECT token, user_id, kind, created_at FROM tokens \
                 WHERE user_id = $user_id AND kind = $kind",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("kind", kind))
            .await
            .map_err(db_error)?
            .take(0)
            .map_err(db_error)
    }

    async fn replace_access(
        &self,
        user_id: &str,
        refresh_token: &str,
        record: TokenRecord,
    ) -> Result<Option<u64>> {
        // BEGIN/COMMIT produce no result entries: IF is index 0, DELETE index 1
        let mut response = self
            .client
            .query(
                r#"
                BEGIN TRANSACTION;
                IF array::len((SELECT VALUE token FROM tokens
                    WHERE user_id = $user_id AND kind = 'refresh' AND token = $refresh_token)) == 0 {
                    THROW $missing_refresh;
                };
                DELETE tokens WHERE user_id = $user_id AND kind = 'access' RETURN BEFORE;
                CREATE tokens CONTENT $record RETURN NONE;
                COMMIT TRANSACTION;
            "#,
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("refresh_token", refresh_token.to_string()))
            .bind(("missing_refresh", MISSING_REFRESH))
            .bind(("record", record))
            .await
            .map_err(db_error)?;

        // A THROW cancels the whole transaction
        let errors = response.take_errors();
        if errors
            .values()
            .any(|e| e.to_string().contains(MISSING_REFRESH))
        {
            debug!(user_id, "refresh record gone, access tokens left untouched");
            return Ok(None);
        }
        if let Some(e) = errors.into_values().next() {
            return Err(db_error(e));
        }

        let removed: Vec<TokenRecord> = response.take(1).map_err(db_error)?;

        debug!(user_id, removed = removed.len(), "access tokens replaced");
        Ok(Some(removed.len() as u64))
    }

    async fn revoke_user(&self, user_id: &str) -> Result<u64> {
        let removed: Vec<TokenRecord> = self
            .client
            .query("DELETE tokens WHERE user_id = $user_id RETURN BEFORE")
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(db_error)?
            .take(0)
            .map_err(db_error)?;

        debug!(user_id, removed = removed.len(), "tokens revoked");
        Ok(removed.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    // These tests need a running SurrealDB (see DatabaseConfig defaults)
    use super::*;

    async fn connect() -> SurrealStore {
        let store = SurrealStore::connect(&DatabaseConfig {
            surrealdb_database: format!("test_{}", Uuid::new_v4().simple()),
            ..Default::default()
        })
        .await
        .expect("SurrealDB connection");
        store.init_schema().await.expect("schema");
        store
    }

    #[tokio::test]
    #[ignore = "requires SurrealDB"]
    async fn test_unique_email_index() {
        let store = connect().await;
        let user = NewUser {
            name: "Alice Smith".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
        };

        let created = store.create(user.clone()).await.unwrap();
        assert_eq!(
            store.find_by_email("a@x.com").await.unwrap().map(|u| u.id),
            Some(created.id)
        );
        assert!(matches!(
            store.create(user).await,
            Err(StoreError::DuplicateEmail)
        ));
    }

    #[tokio::test]
    #[ignore = "requires SurrealDB"]
    async fn test_token_lifecycle() {
        let store = connect().await;
        store
            .insert(vec![
                TokenRecord::new("a1", "u1", TokenKind::Access),
                TokenRecord::new("r1", "u1", TokenKind::Refresh),
            ])
            .await
            .unwrap();

        let removed = store
            .replace_access("u1", "r1", TokenRecord::new("a2", "u1", TokenKind::Access))
            .await
            .unwrap();
        assert_eq!(removed, Some(1));
        assert!(store
            .find("u1", TokenKind::Access, "a2")
            .await
            .unwrap()
            .is_some());

        assert_eq!(store.revoke_user("u1").await.unwrap(), 2);
        assert!(store
            .find_for_user("u1", TokenKind::Refresh)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    #[ignore = "requires SurrealDB"]
    async fn test_replace_access_after_revoke_changes_nothing() {
        let store = connect().await;
        store
            .insert(vec![
                TokenRecord::new("a1", "u1", TokenKind::Access),
                TokenRecord::new("r1", "u1", TokenKind::Refresh),
            ])
            .await
            .unwrap();
        store.revoke_user("u1").await.unwrap();

        let result = store
            .replace_access("u1", "r1", TokenRecord::new("a2", "u1", TokenKind::Access))
            .await
            .unwrap();
        assert_eq!(result, None);
        assert!(store
            .find_for_user("u1", TokenKind::Access)
            .await
            .unwrap()
            .is_empty());
    }
}
