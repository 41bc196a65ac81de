use crate::application_port::AuthError;
use crate::domain_model::UserId;
use crate::domain_port::AuthSessionStore;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

struct Session {
    user_id: UserId,
    expire_at: DateTime<Utc>,
}

/// Refresh-token sessions keyed by jti. Expired entries are dropped on lookup
/// and swept on every save.
pub struct MemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AuthSessionStore for MemorySessionStore {
    async fn save_refresh_jti(
        &self,
        user_id: UserId,
        jti: &str,
        ttl_secs: u64,
    ) -> Result<(), AuthError> {
        let ttl = Duration::try_seconds(ttl_secs as i64)
            .ok_or_else(|| AuthError::Store(format!("ttl out of range: {ttl_secs}")))?;
        let now = Utc::now();
        self.sessions.retain(|_, session| session.expire_at > now);
        self.sessions.insert(
            jti.to_string(),
            Session {
                user_id,
                expire_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn check_refresh_jti(&self, jti: &str) -> Result<Option<UserId>, AuthError> {
        let now = Utc::now();
        let live = self
            .sessions
            .get(jti)
            .map(|session| (session.user_id, session.expire_at > now));
        match live {
            Some((user_id, true)) => Ok(Some(user_id)),
            Some((_, false)) => {
                self.sessions.remove(jti);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn revoke_refresh_jti(&self, jti: &str) -> Result<(), AuthError> {
        self.sessions.remove(jti);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn jti_lives_until_revoked() {
        let store = MemorySessionStore::new();
        let user = UserId(uuid::Uuid::new_v4());
        store.save_refresh_jti(user, "jti-1", 60).await.unwrap();

        assert_eq!(store.check_refresh_jti("jti-1").await.unwrap(), Some(user));
        // Checking does not consume.
        assert_eq!(store.check_refresh_jti("jti-1").await.unwrap(), Some(user));

        store.revoke_refresh_jti("jti-1").await.unwrap();
        assert_eq!(store.check_refresh_jti("jti-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_jti_is_rejected() {
        let store = MemorySessionStore::new();
        let user = UserId(uuid::Uuid::new_v4());
        store.sessions.insert(
            "old".to_string(),
            Session {
                user_id: user,
                expire_at: Utc::now() - Duration::seconds(1),
            },
        );
        assert_eq!(store.check_refresh_jti("old").await.unwrap(), None);
        assert!(store.sessions.get("old").is_none());
    }

    #[tokio::test]
    async fn save_sweeps_sessions_nobody_looks_up() {
        let store = MemorySessionStore::new();
        let user = UserId(uuid::Uuid::new_v4());
        for jti in ["stale-1", "stale-2"] {
            store.sessions.insert(
                jti.to_string(),
                Session {
                    user_id: user,
                    expire_at: Utc::now() - Duration::seconds(1),
                },
            );
        }

        store.save_refresh_jti(user, "fresh", 60).await.unwrap();

        assert_eq!(store.sessions.len(), 1);
        assert_eq!(store.check_refresh_jti("fresh").await.unwrap(), Some(user));
    }
}
