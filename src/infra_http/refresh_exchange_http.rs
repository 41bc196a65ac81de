use crate::domain_model::*;
use crate::domain_port::{HttpTransport, RefreshExchange, RefreshFailure, RefreshOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Calls the `POST /auth/refresh` endpoint over the wrapped transport, so the
/// transport's timeout applies to the exchange as well.
pub struct HttpRefreshExchange {
    transport: Arc<dyn HttpTransport>,
    url: String,
}

impl HttpRefreshExchange {
    pub fn new(transport: Arc<dyn HttpTransport>, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
        }
    }
}

#[async_trait::async_trait]
impl RefreshExchange for HttpRefreshExchange {
    async fn exchange(&self, refresh_token: &RefreshToken) -> RefreshOutcome {
        let body = match RequestBody::json(&RefreshRequest {
            refresh_token: refresh_token.as_str(),
        }) {
            Ok(body) => body,
            Err(e) => return RefreshOutcome::RefreshFailed(RefreshFailure::Malformed(e.to_string())),
        };
        let mut headers = Headers::new();
        headers.set(CONTENT_TYPE, APPLICATION_JSON);
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.url.clone(),
            headers,
            body: Some(body),
        };

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => return RefreshOutcome::RefreshFailed(RefreshFailure::Transport(e.to_string())),
        };

        if !response.is_success() {
            let payload = response.json::<ErrorResponse>().unwrap_or_default();
            return RefreshOutcome::RefreshFailed(RefreshFailure::Rejected {
                status: response.status,
                error: payload.error.unwrap_or_else(|| "unknown".to_string()),
                message: payload.message.unwrap_or_else(|| response.text()),
            });
        }

        match response.json::<RefreshResponse>() {
            Ok(parsed) if !parsed.access_token.is_empty() => {
                RefreshOutcome::Refreshed(AccessToken(parsed.access_token))
            }
            Ok(_) => RefreshOutcome::RefreshFailed(RefreshFailure::Malformed(
                "empty access token".to_string(),
            )),
            Err(e) => RefreshOutcome::RefreshFailed(RefreshFailure::Malformed(e.to_string())),
        }
    }
}
