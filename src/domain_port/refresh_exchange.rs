use crate::domain_model::*;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshFailure {
    #[error("refresh rejected with status {status}: {error}: {message}")]
    Rejected {
        status: u16,
        error: String,
        message: String,
    },
    #[error("refresh transport failed: {0}")]
    Transport(String),
    #[error("malformed refresh response: {0}")]
    Malformed(String),
    #[error("refresh exchange panicked")]
    Panicked,
    #[error("refresh task was cancelled")]
    Cancelled,
}

/// Result of one settled refresh exchange, shared by every caller that
/// awaited it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(AccessToken),
    RefreshFailed(RefreshFailure),
}

impl RefreshOutcome {
    pub fn is_refreshed(&self) -> bool {
        matches!(self, RefreshOutcome::Refreshed(_))
    }
}

/// Trades a refresh token for a new access token. One call is one round trip
/// to the refresh endpoint; failures are values, not errors.
#[async_trait::async_trait]
pub trait RefreshExchange: Send + Sync {
    async fn exchange(&self, refresh_token: &RefreshToken) -> RefreshOutcome;
}
