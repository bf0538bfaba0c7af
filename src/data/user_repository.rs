use crate::domain::error::DomainError;
use crate::domain::repository::UserRepository;
use crate::domain::user::{NewUser, User};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

#[derive(Default)]
struct UserTable {
    rows: HashMap<i64, User>,
    last_id: i64,
}

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    storage: Arc<RwLock<UserTable>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn save_user(&self, user: NewUser) -> Result<User> {
        trace!("Acquiring write lock for user storage");
        let mut storage = self.storage.write().await;
        if storage.rows.values().any(|u| u.email == user.email) {
            return Err(
                DomainError::Validation("User with this email already exists".to_string()).into(),
            );
        }

        storage.last_id += 1;
        let user = User {
            id: storage.last_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
        };
        storage.rows.insert(user.id, user.clone());
        debug!(user_id = user.id, email = %user.email, "User saved to memory storage");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let storage = self.storage.read().await;
        let user = storage.rows.values().find(|u| u.email == email).cloned();
        trace!(found = user.is_some(), "Looked up user by email");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let storage = self.storage.read().await;
        let user = storage.rows.get(&id).cloned();
        trace!(found = user.is_some(), "Looked up user by id");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: email.to_string(),
            password_hash: "hash123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_user_assigns_sequential_ids() {
        let repo = InMemoryUserRepository::new();

        let first = repo.save_user(new_user("a@example.com")).await.unwrap();
        let second = repo.save_user(new_user("b@example.com")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_find_user_by_email_and_id() {
        let repo = InMemoryUserRepository::new();
        let saved = repo.save_user(new_user("alice@example.com")).await.unwrap();

        let by_email = repo.find_user_by_email("alice@example.com").await.unwrap();
        assert_eq!(by_email.unwrap().id, saved.id);

        let by_id = repo.find_user_by_id(saved.id).await.unwrap();
        assert_eq!(by_id.unwrap().email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_missing_user_is_none() {
        let repo = InMemoryUserRepository::new();

        assert!(repo.find_user_by_email("nobody@example.com").await.unwrap().is_none());
        assert!(repo.find_user_by_id(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.save_user(new_user("dup@example.com")).await.unwrap();

        let err = repo.save_user(new_user("dup@example.com")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_find_user_by_email_case_sensitive() {
        let repo = InMemoryUserRepository::new();
        repo.save_user(new_user("Test@Example.com")).await.unwrap();

        assert!(repo.find_user_by_email("Test@Example.com").await.unwrap().is_some());
        assert!(repo.find_user_by_email("test@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_writes() {
        let repo = InMemoryUserRepository::new();

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let repo_clone = repo.clone();
                tokio::spawn(async move {
                    repo_clone
                        .save_user(new_user(&format!("user{}@example.com", i)))
                        .await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.sort();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    }
}
