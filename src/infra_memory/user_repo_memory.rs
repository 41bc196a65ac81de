use crate::application_port::AuthError;
use crate::domain_model::UserId;
use crate::domain_port::{UserRecord, UserRepo};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

pub struct MemoryUserRepo {
    by_id: DashMap<UserId, UserRecord>,
    // username -> id
    usernames: DashMap<String, UserId>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            usernames: DashMap::new(),
        }
    }
}

impl Default for MemoryUserRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create(&self, record: UserRecord) -> Result<(), AuthError> {
        match self.usernames.entry(record.username.clone()) {
            Entry::Occupied(_) => Err(AuthError::UserExists),
            Entry::Vacant(slot) => {
                slot.insert(record.user_id);
                self.by_id.insert(record.user_id, record);
                Ok(())
            }
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, AuthError> {
        let Some(user_id) = self.usernames.get(username).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.by_id.get(&user_id).map(|rec| rec.clone()))
    }

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.by_id.get(&user_id).map(|rec| rec.clone()))
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        Ok(self.usernames.contains_key(username))
    }

    async fn id_exists(&self, user_id: UserId) -> Result<bool, AuthError> {
        Ok(self.by_id.contains_key(&user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(username: &str) -> UserRecord {
        UserRecord {
            user_id: UserId(uuid::Uuid::new_v4()),
            username: username.to_string(),
            password_hash: "hash".to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let repo = MemoryUserRepo::new();
        let first = record("alice1");
        let id = first.user_id;
        repo.create(first).await.unwrap();

        assert!(matches!(
            repo.create(record("alice1")).await,
            Err(AuthError::UserExists)
        ));
        assert!(repo.username_exists("alice1").await.unwrap());
        assert!(repo.id_exists(id).await.unwrap());
        assert_eq!(
            repo.get_by_username("alice1").await.unwrap().map(|r| r.user_id),
            Some(id)
        );
        assert!(repo.get_by_username("nobody").await.unwrap().is_none());
    }
}
