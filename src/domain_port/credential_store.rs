use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum CredentialStoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid credential value: {0}")]
    InvalidValue(String),
}

/// Where the current access/refresh token pair lives.
///
/// Implementations decide the storage transport (cookies, memory, ...);
/// callers only read and replace the pair.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn access_token(&self) -> Result<Option<AccessToken>, CredentialStoreError>;
    async fn refresh_token(&self) -> Result<Option<RefreshToken>, CredentialStoreError>;
    async fn set_credentials(&self, credentials: CredentialPair)
    -> Result<(), CredentialStoreError>;
    async fn clear(&self) -> Result<(), CredentialStoreError>;
}
