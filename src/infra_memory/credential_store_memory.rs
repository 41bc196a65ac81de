use crate::domain_model::*;
use crate::domain_port::{CredentialStore, CredentialStoreError};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Tokens {
    access_token: Option<AccessToken>,
    refresh_token: Option<RefreshToken>,
}

/// Process-local credential holder, for CLI clients and tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: Mutex<Tokens>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: CredentialPair) -> Self {
        Self {
            tokens: Mutex::new(Tokens {
                access_token: Some(credentials.access_token),
                refresh_token: Some(credentials.refresh_token),
            }),
        }
    }

    /// Replace only the access token, leaving the refresh token alone.
    pub async fn set_access_token(&self, access_token: AccessToken) {
        self.tokens.lock().await.access_token = Some(access_token);
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn access_token(&self) -> Result<Option<AccessToken>, CredentialStoreError> {
        Ok(self.tokens.lock().await.access_token.clone())
    }

    async fn refresh_token(&self) -> Result<Option<RefreshToken>, CredentialStoreError> {
        Ok(self.tokens.lock().await.refresh_token.clone())
    }

    async fn set_credentials(
        &self,
        credentials: CredentialPair,
    ) -> Result<(), CredentialStoreError> {
        let mut guard = self.tokens.lock().await;
        guard.access_token = Some(credentials.access_token);
        guard.refresh_token = Some(credentials.refresh_token);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialStoreError> {
        *self.tokens.lock().await = Tokens::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_clear() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.access_token().await.unwrap(), None);

        store
            .set_credentials(CredentialPair::new("a", "r"))
            .await
            .unwrap();
        assert_eq!(
            store.access_token().await.unwrap(),
            Some(AccessToken("a".to_string()))
        );
        assert_eq!(
            store.refresh_token().await.unwrap(),
            Some(RefreshToken("r".to_string()))
        );

        store.clear().await.unwrap();
        assert_eq!(store.access_token().await.unwrap(), None);
        assert_eq!(store.refresh_token().await.unwrap(), None);
    }
}
