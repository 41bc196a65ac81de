use crate::application_port::*;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait AuthSessionStore: Send + Sync {
    /// Save a refresh token jti for a user with TTL.
    async fn save_refresh_jti(
        &self,
        user_id: UserId,
        jti: &str,
        ttl_secs: u64,
    ) -> Result<(), AuthError>;
    /// Check if JTI is present (valid). Refresh tokens are not rotated, so the
    /// jti stays valid until it expires or is revoked.
    async fn check_refresh_jti(&self, jti: &str) -> Result<Option<UserId>, AuthError>;
    /// Forget a jti (logout). Unknown jtis are ignored.
    async fn revoke_refresh_jti(&self, jti: &str) -> Result<(), AuthError>;
}
