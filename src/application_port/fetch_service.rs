use crate::domain_model::*;
use crate::domain_port::{CredentialStoreError, RefreshFailure, TransportError};

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub method: HttpMethod,
    pub headers: Headers,
    pub body: Option<RequestBody>,
    pub search_params: Vec<(String, String)>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: HttpMethod::Get,
            headers: Headers::new(),
            body: None,
            search_params: Vec::new(),
        }
    }
}

impl FetchOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn method(method: HttpMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.search_params.push((key.into(), value.into()));
        self
    }
}

/// Terminal state reached by one logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPath {
    /// First response was returned as-is (success or any non-401 status).
    FirstAttempt,
    /// 401 with no refresh token available; original response returned.
    NoRefreshToken,
    /// 401, refresh attempted and failed; original response returned.
    RefreshFailed(RefreshFailure),
    /// 401, refresh succeeded; the single retry's response was returned.
    Retried,
}

#[derive(Debug, Clone)]
pub struct FetchReport {
    pub response: HttpResponse,
    pub path: FetchPath,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Credentials(#[from] CredentialStoreError),
}

#[async_trait::async_trait]
pub trait FetchService: Send + Sync {
    async fn fetch_with_report(
        &self,
        url: &str,
        options: FetchOptions,
    ) -> Result<FetchReport, FetchError>;

    async fn fetch(&self, url: &str, options: FetchOptions) -> Result<HttpResponse, FetchError> {
        self.fetch_with_report(url, options)
            .await
            .map(|report| report.response)
    }
}
