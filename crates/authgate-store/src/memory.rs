//! In-memory store implementation
//!
//! All state sits behind one lock so that every trait method is atomic,
//! including the multi-record token operations.

use crate::{
    CredentialStore, NewUser, Result, StoreError, TokenKind, TokenRecord, TokenStore, User,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    users: HashMap<String, User>,
    /// email -> user id
    email_index: HashMap<String, String>,
    tokens: Vec<TokenRecord>,
}

/// In-memory implementation of [`CredentialStore`] and [`TokenStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live token records across all users
    pub async fn token_count(&self) -> usize {
        self.state.read().await.tokens.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;

        Ok(state
            .email_index
            .get(email)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;

        if state.email_index.contains_key(&user.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let created = User {
            id: Uuid::new_v4().to_string(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };

        state
            .email_index
            .insert(created.email.clone(), created.id.clone());
        state.users.insert(created.id.clone(), created.clone());

        Ok(created)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert(&self, records: Vec<TokenRecord>) -> Result<()> {
        let mut state = self.state.write().await;
        state.tokens.extend(records);
        Ok(())
    }

    async fn find(
        &self,
        user_id: &str,
        kind: TokenKind,
        token: &str,
    ) -> Result<Option<TokenRecord>> {
        let state = self.state.read().await;

        Ok(state
            .tokens
            .iter()
            .find(|r| r.user_id == user_id && r.kind == kind && r.token == token)
            .cloned())
    }

    async fn find_for_user(&self, user_id: &str, kind: TokenKind) -> Result<Vec<TokenRecord>> {
        let state = self.state.read().await;

        Ok(state
            .tokens
            .iter()
            .filter(|r| r.user_id == user_id && r.kind == kind)
            .cloned()
            .collect())
    }

    async fn replace_access(
        &self,
        user_id: &str,
        refresh_token: &str,
        record: TokenRecord,
    ) -> Result<Option<u64>> {
        let mut state = self.state.write().await;

        let holds_refresh = state.tokens.iter().any(|r| {
            r.user_id == user_id && r.kind == TokenKind::Refresh && r.token == refresh_token
        });
        if !holds_refresh {
            return Ok(None);
        }

        let before = state.tokens.len();
        state
            .tokens
            .retain(|r| !(r.user_id == user_id && r.kind == TokenKind::Access));
        let removed = (before - state.tokens.len()) as u64;

        state.tokens.push(record);

        Ok(Some(removed))
    }

    async fn revoke_user(&self, user_id: &str) -> Result<u64> {
        let mut state = self.state.write().await;

        let before = state.tokens.len();
        state.tokens.retain(|r| r.user_id != user_id);

        Ok((before - state.tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Alice Smith".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$v=19$m=8,t=1,p=1$c2FsdA$aGFzaA".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let store = MemoryStore::new();

        let created = store.create(new_user("a@x.com")).await.unwrap();
        assert!(Uuid::parse_str(&created.id).is_ok());

        let found = store.find_by_email("a@x.com").await.unwrap();
        assert_eq!(found, Some(created));

        assert!(store.find_by_email("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();

        store.create(new_user("a@x.com")).await.unwrap();
        let result = store.create(new_user("a@x.com")).await;

        assert!(matches!(result, Err(StoreError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_concurrent_registration_has_single_winner() {
        let store = MemoryStore::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create(new_user("race@x.com")).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_find_matches_exact_token() {
        let store = MemoryStore::new();
        store
            .insert(vec![
                TokenRecord::new("access-1", "u1", TokenKind::Access),
                TokenRecord::new("refresh-1", "u1", TokenKind::Refresh),
            ])
            .await
            .unwrap();

        assert!(store
            .find("u1", TokenKind::Access, "access-1")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find("u1", TokenKind::Refresh, "access-1")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find("u2", TokenKind::Access, "access-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_replace_access_keeps_refresh_and_other_users() {
        let store = MemoryStore::new();
        store
            .insert(vec![
                TokenRecord::new("a1", "u1", TokenKind::Access),
                TokenRecord::new("a2", "u1", TokenKind::Access),
                TokenRecord::new("r1", "u1", TokenKind::Refresh),
                TokenRecord::new("a3", "u2", TokenKind::Access),
            ])
            .await
            .unwrap();

        let removed = store
            .replace_access("u1", "r1", TokenRecord::new("a4", "u1", TokenKind::Access))
            .await
            .unwrap();
        assert_eq!(removed, Some(2));

        let access = store.find_for_user("u1", TokenKind::Access).await.unwrap();
        assert_eq!(access.len(), 1);
        assert_eq!(access[0].token, "a4");
        assert_eq!(
            store.find_for_user("u1", TokenKind::Refresh).await.unwrap().len(),
            1
        );
        assert_eq!(
            store.find_for_user("u2", TokenKind::Access).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_revoke_user_counts_both_kinds() {
        let store = MemoryStore::new();
        store
            .insert(vec![
                TokenRecord::new("a1", "u1", TokenKind::Access),
                TokenRecord::new("r1", "u1", TokenKind::Refresh),
                TokenRecord::new("a2", "u2", TokenKind::Access),
            ])
            .await
            .unwrap();

        assert_eq!(store.revoke_user("u1").await.unwrap(), 2);
        assert_eq!(store.revoke_user("u1").await.unwrap(), 0);
        assert_eq!(store.token_count().await, 1);
    }

    #[tokio::test]
    async fn test_replace_access_requires_refresh_record() {
        let store = MemoryStore::new();
        store
            .insert(vec![
                TokenRecord::new("a1", "u1", TokenKind::Access),
                TokenRecord::new("r1", "u1", TokenKind::Refresh),
                TokenRecord::new("r2", "u2", TokenKind::Refresh),
            ])
            .await
            .unwrap();

        // Another user's refresh token does not count
        let result = store
            .replace_access("u1", "r2", TokenRecord::new("a2", "u1", TokenKind::Access))
            .await
            .unwrap();
        assert_eq!(result, None);

        store.revoke_user("u1").await.unwrap();
        let result = store
            .replace_access("u1", "r1", TokenRecord::new("a3", "u1", TokenKind::Access))
            .await
            .unwrap();
        assert_eq!(result, None);

        assert!(store
            .find_for_user("u1", TokenKind::Access)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(store.token_count().await, 1);
    }
}
