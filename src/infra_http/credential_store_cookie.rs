use super::cookie_policy::*;
use crate::domain_model::*;
use crate::domain_port::{CredentialStore, CredentialStoreError};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct CookieJar {
    access_token: Option<String>,
    refresh_token: Option<String>,
    // Set-Cookie values queued for the outgoing response.
    outgoing: Vec<String>,
}

/// Credentials carried by HTTP-only cookies of one server-side request.
///
/// Reads come from the incoming `Cookie` header; writes update the jar and
/// queue `Set-Cookie` values that the caller copies onto its response.
#[derive(Debug)]
pub struct CookieCredentialStore {
    policy: CookiePolicy,
    remember_me: bool,
    jar: Mutex<CookieJar>,
}

impl CookieCredentialStore {
    pub fn from_request(cookie_header: Option<&str>, policy: CookiePolicy) -> Self {
        let mut jar = CookieJar::default();
        for (name, value) in cookie_header.map(parse_cookie_header).unwrap_or_default() {
            if value.is_empty() {
                continue;
            }
            match name.as_str() {
                ACCESS_COOKIE => jar.access_token = Some(value),
                REFRESH_COOKIE => jar.refresh_token = Some(value),
                _ => {}
            }
        }
        Self {
            policy,
            remember_me: false,
            jar: Mutex::new(jar),
        }
    }

    /// Use the long remember-me lifetime when rewriting the refresh cookie.
    pub fn remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }

    /// `Set-Cookie` values produced so far, in write order.
    pub async fn set_cookie_headers(&self) -> Vec<String> {
        self.jar.lock().await.outgoing.clone()
    }
}

fn checked(value: &str) -> Result<(), CredentialStoreError> {
    if value.is_empty() || !is_cookie_safe(value) {
        return Err(CredentialStoreError::InvalidValue(
            "token is not a valid cookie value".to_string(),
        ));
    }
    Ok(())
}

#[async_trait::async_trait]
impl CredentialStore for CookieCredentialStore {
    async fn access_token(&self) -> Result<Option<AccessToken>, CredentialStoreError> {
        Ok(self.jar.lock().await.access_token.clone().map(AccessToken))
    }

    async fn refresh_token(&self) -> Result<Option<RefreshToken>, CredentialStoreError> {
        Ok(self.jar.lock().await.refresh_token.clone().map(RefreshToken))
    }

    async fn set_credentials(
        &self,
        credentials: CredentialPair,
    ) -> Result<(), CredentialStoreError> {
        checked(credentials.access_token.as_str())?;
        checked(credentials.refresh_token.as_str())?;

        let mut jar = self.jar.lock().await;
        let access_cookie = self.policy.access_cookie(&credentials.access_token);
        jar.outgoing.push(access_cookie);
        // Unchanged refresh token keeps its original cookie and expiry.
        if jar.refresh_token.as_deref() != Some(credentials.refresh_token.as_str()) {
            let refresh_cookie = self
                .policy
                .refresh_cookie(&credentials.refresh_token, self.remember_me);
            jar.outgoing.push(refresh_cookie);
        }
        jar.access_token = Some(credentials.access_token.0);
        jar.refresh_token = Some(credentials.refresh_token.0);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialStoreError> {
        let mut jar = self.jar.lock().await;
        jar.access_token = None;
        jar.refresh_token = None;
        jar.outgoing.extend(self.policy.expired_cookies());
        Ok(())
    }
}
