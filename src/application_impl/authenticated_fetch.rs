use crate::application_impl::RefreshCoordinator;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{CredentialStore, HttpTransport, RefreshOutcome};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Outbound API calls with bearer credentials and one refresh-and-retry cycle
/// on 401.
///
/// The credential store is per caller context; the coordinator is shared by
/// every fetcher that uses the same refresh token.
pub struct AuthenticatedFetch {
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<dyn CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    base_url: Option<String>,
}

impl AuthenticatedFetch {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<dyn CredentialStore>,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            transport,
            credentials,
            coordinator,
            base_url: None,
        }
    }

    /// Relative URLs are resolved against `base_url`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    fn resolve_url(&self, url: &str, search_params: &[(String, String)]) -> String {
        let mut resolved = match &self.base_url {
            Some(base) if !url.starts_with("http://") && !url.starts_with("https://") => {
                format!("{}/{}", base, url.trim_start_matches('/'))
            }
            _ => url.to_string(),
        };

        if !search_params.is_empty() {
            let query = search_params
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            resolved.push(if resolved.contains('?') { '&' } else { '?' });
            resolved.push_str(&query);
        }
        resolved
    }
}

fn build_request(
    url: &str,
    options: &FetchOptions,
    access_token: Option<&AccessToken>,
) -> HttpRequest {
    let mut headers = options.headers.clone();
    if let Some(token) = access_token {
        headers.set(AUTHORIZATION, token.bearer());
    }
    // Multipart bodies leave Content-Type to the transport, it owns the boundary.
    match &options.body {
        Some(body) if body.is_multipart() => headers.remove(CONTENT_TYPE),
        Some(_) if !headers.contains(CONTENT_TYPE) => headers.set(CONTENT_TYPE, APPLICATION_JSON),
        _ => {}
    }

    HttpRequest {
        method: options.method,
        url: url.to_string(),
        headers,
        body: options.body.clone(),
    }
}

#[async_trait::async_trait]
impl FetchService for AuthenticatedFetch {
    #[instrument(skip(self, options), fields(method = %options.method))]
    async fn fetch_with_report(
        &self,
        url: &str,
        options: FetchOptions,
    ) -> Result<FetchReport, FetchError> {
        let url = self.resolve_url(url, &options.search_params);

        let access_token = self.credentials.access_token().await?;
        let request = build_request(&url, &options, access_token.as_ref());
        let response = self.transport.send(request).await?;

        if !response.is_unauthorized() {
            return Ok(FetchReport {
                response,
                path: FetchPath::FirstAttempt,
            });
        }

        let Some(refresh_token) = self.credentials.refresh_token().await? else {
            debug!("401 with no refresh token");
            return Ok(FetchReport {
                response,
                path: FetchPath::NoRefreshToken,
            });
        };

        let access_token = match self.coordinator.refresh(&refresh_token).await {
            RefreshOutcome::Refreshed(access_token) => access_token,
            RefreshOutcome::RefreshFailed(reason) => {
                warn!(%reason, "refresh failed, returning original 401");
                return Ok(FetchReport {
                    response,
                    path: FetchPath::RefreshFailed(reason),
                });
            }
        };

        self.credentials
            .set_credentials(CredentialPair::from_tokens(access_token.clone(), refresh_token))
            .await?;

        debug!("retrying with refreshed access token");
        let retry = build_request(&url, &options, Some(&access_token));
        let response = self.transport.send(retry).await?;
        Ok(FetchReport {
            response,
            path: FetchPath::Retried,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_port::{RefreshExchange, RefreshFailure, TransportError};
    use crate::infra_memory::MemoryCredentialStore;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers 401 to any bearer other than `valid`, records every request.
    struct TokenCheckingTransport {
        valid: String,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl TokenCheckingTransport {
        fn new(valid: &str) -> Arc<Self> {
            Arc::new(Self {
                valid: valid.to_string(),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl HttpTransport for TokenCheckingTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let expected = format!("Bearer {}", self.valid);
            let authorized = request.headers.get(AUTHORIZATION) == Some(expected.as_str());
            self.requests.lock().unwrap().push(request);
            tokio::task::yield_now().await;
            Ok(if authorized {
                HttpResponse::new(200, "ok")
            } else {
                HttpResponse::new(401, r#"{"error":"unauthorized"}"#)
            })
        }
    }

    /// Replays a fixed list of statuses in order.
    struct ScriptedTransport {
        statuses: Mutex<VecDeque<u16>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(statuses: &[u16]) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(statuses.iter().copied().collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let status = self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra request");
            Ok(HttpResponse::new(status, format!("attempt with {status}")))
        }
    }

    struct FailingTransport;

    #[async_trait::async_trait]
    impl HttpTransport for FailingTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::Connect("connection refused".to_string()))
        }
    }

    struct MockRefreshEndpoint {
        calls: AtomicUsize,
        delay: Duration,
        result: RefreshOutcome,
    }

    impl MockRefreshEndpoint {
        fn succeeding(token: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                result: RefreshOutcome::Refreshed(AccessToken(token.to_string())),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(1),
                result: RefreshOutcome::RefreshFailed(RefreshFailure::Rejected {
                    status: 401,
                    error: "invalid_token".to_string(),
                    message: "Refresh token is not valid".to_string(),
                }),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl RefreshExchange for MockRefreshEndpoint {
        async fn exchange(&self, _refresh_token: &RefreshToken) -> RefreshOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.result.clone()
        }
    }

    async fn store_with(access: &str, refresh: Option<&str>) -> Arc<MemoryCredentialStore> {
        let store = Arc::new(MemoryCredentialStore::new());
        match refresh {
            Some(refresh) => store
                .set_credentials(CredentialPair::new(access, refresh))
                .await
                .unwrap(),
            None => store.set_access_token(AccessToken(access.to_string())).await,
        }
        store
    }

    fn fetcher(
        transport: Arc<dyn HttpTransport>,
        store: Arc<MemoryCredentialStore>,
        endpoint: Arc<MockRefreshEndpoint>,
    ) -> AuthenticatedFetch {
        let coordinator = Arc::new(RefreshCoordinator::new(endpoint));
        AuthenticatedFetch::new(transport, store, coordinator).with_base_url("http://api.test/")
    }

    #[tokio::test]
    async fn concurrent_401s_share_a_single_refresh() {
        let transport = TokenCheckingTransport::new("new-token");
        let store = store_with("expired", Some("refresh-1")).await;
        let endpoint = MockRefreshEndpoint::succeeding("new-token", Duration::from_millis(50));
        let fetch = fetcher(transport.clone(), store.clone(), endpoint.clone());

        let (profile, settings) = tokio::join!(
            fetch.fetch_with_report("/profile", FetchOptions::get()),
            fetch.fetch_with_report("/settings", FetchOptions::get()),
        );
        let profile = profile.unwrap();
        let settings = settings.unwrap();

        assert_eq!(endpoint.calls(), 1);
        assert_eq!(profile.path, FetchPath::Retried);
        assert_eq!(settings.path, FetchPath::Retried);
        assert_eq!(profile.response.status, 200);
        assert_eq!(settings.response.status, 200);

        let retried: Vec<_> = transport
            .requests()
            .into_iter()
            .filter(|r| r.headers.get(AUTHORIZATION) == Some("Bearer new-token"))
            .map(|r| r.url)
            .collect();
        assert_eq!(retried.len(), 2);
        assert!(retried.contains(&"http://api.test/profile".to_string()));
        assert!(retried.contains(&"http://api.test/settings".to_string()));

        assert_eq!(
            store.access_token().await.unwrap(),
            Some(AccessToken("new-token".to_string()))
        );
        assert_eq!(
            store.refresh_token().await.unwrap(),
            Some(RefreshToken("refresh-1".to_string()))
        );
    }

    #[tokio::test]
    async fn retry_happens_at_most_once() {
        let transport = ScriptedTransport::new(&[401, 401]);
        let store = store_with("expired", Some("refresh-1")).await;
        let endpoint = MockRefreshEndpoint::succeeding("still-bad", Duration::from_millis(1));
        let fetch = fetcher(transport.clone(), store, endpoint.clone());

        let report = fetch
            .fetch_with_report("/boards", FetchOptions::get())
            .await
            .unwrap();

        assert_eq!(report.path, FetchPath::Retried);
        assert_eq!(report.response.status, 401);
        assert_eq!(transport.calls(), 2);
        assert_eq!(endpoint.calls(), 1);
    }

    #[tokio::test]
    async fn later_401_triggers_a_new_refresh() {
        let transport = ScriptedTransport::new(&[401, 200, 401, 200]);
        let store = store_with("expired", Some("refresh-1")).await;
        let endpoint = MockRefreshEndpoint::succeeding("fresh", Duration::from_millis(1));
        let fetch = fetcher(transport, store, endpoint.clone());

        fetch.fetch("/tasks", FetchOptions::get()).await.unwrap();
        fetch.fetch("/tasks", FetchOptions::get()).await.unwrap();

        assert_eq!(endpoint.calls(), 2);
    }

    #[tokio::test]
    async fn missing_refresh_token_returns_401_without_more_calls() {
        let transport = ScriptedTransport::new(&[401]);
        let store = store_with("expired", None).await;
        let endpoint = MockRefreshEndpoint::succeeding("unused", Duration::from_millis(1));
        let fetch = fetcher(transport.clone(), store, endpoint.clone());

        let report = fetch
            .fetch_with_report("/teams", FetchOptions::get())
            .await
            .unwrap();

        assert_eq!(report.path, FetchPath::NoRefreshToken);
        assert_eq!(report.response.status, 401);
        assert_eq!(transport.calls(), 1);
        assert_eq!(endpoint.calls(), 0);
    }

    #[tokio::test]
    async fn failed_refresh_surfaces_the_original_401() {
        let transport = ScriptedTransport::new(&[401]);
        let store = store_with("expired", Some("revoked")).await;
        let endpoint = MockRefreshEndpoint::failing();
        let fetch = fetcher(transport.clone(), store.clone(), endpoint.clone());

        let report = fetch
            .fetch_with_report("/teams", FetchOptions::get())
            .await
            .unwrap();

        assert!(matches!(
            report.path,
            FetchPath::RefreshFailed(RefreshFailure::Rejected { status: 401, .. })
        ));
        assert_eq!(report.response, HttpResponse::new(401, "attempt with 401"));
        assert_eq!(transport.calls(), 1);
        assert_eq!(
            store.access_token().await.unwrap(),
            Some(AccessToken("expired".to_string()))
        );
    }

    #[tokio::test]
    async fn non_401_errors_pass_through() {
        for status in [400, 403, 404, 409, 500, 503] {
            let transport = ScriptedTransport::new(&[status]);
            let store = store_with("token", Some("refresh")).await;
            let endpoint = MockRefreshEndpoint::succeeding("unused", Duration::from_millis(1));
            let fetch = fetcher(transport.clone(), store, endpoint.clone());

            let report = fetch
                .fetch_with_report("/boards", FetchOptions::get())
                .await
                .unwrap();

            assert_eq!(report.path, FetchPath::FirstAttempt);
            assert_eq!(report.response.status, status);
            assert_eq!(transport.calls(), 1);
            assert_eq!(endpoint.calls(), 0);
        }
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let store = store_with("token", Some("refresh")).await;
        let endpoint = MockRefreshEndpoint::succeeding("unused", Duration::from_millis(1));
        let fetch = fetcher(Arc::new(FailingTransport), store, endpoint.clone());

        let err = fetch
            .fetch("/boards", FetchOptions::get())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Transport(TransportError::Connect(_))));
        assert_eq!(endpoint.calls(), 0);
    }

    #[test]
    fn json_and_text_bodies_default_to_application_json() {
        let token = AccessToken("abc".to_string());
        let options = FetchOptions::method(HttpMethod::Post)
            .with_body(RequestBody::Json(serde_json::json!({ "title": "Ship it" })));
        let request = build_request("http://api.test/tasks", &options, Some(&token));
        assert_eq!(request.headers.get(CONTENT_TYPE), Some(APPLICATION_JSON));
        assert_eq!(request.headers.get(AUTHORIZATION), Some("Bearer abc"));

        let options = FetchOptions::method(HttpMethod::Patch)
            .with_body(RequestBody::Text("{}".to_string()));
        let request = build_request("http://api.test/tasks/1", &options, None);
        assert_eq!(request.headers.get(CONTENT_TYPE), Some(APPLICATION_JSON));
        assert_eq!(request.headers.get(AUTHORIZATION), None);
    }

    #[test]
    fn explicit_content_type_is_kept() {
        let options = FetchOptions::method(HttpMethod::Put)
            .with_header("Content-Type", "text/csv")
            .with_body(RequestBody::Bytes(b"a,b".to_vec()));
        let request = build_request("http://api.test/import", &options, None);
        assert_eq!(request.headers.get(CONTENT_TYPE), Some("text/csv"));
    }

    #[test]
    fn multipart_body_has_no_explicit_content_type() {
        let form = MultipartForm::new()
            .text("caption", "whiteboard")
            .file("file", "board.png", Some("image/png".to_string()), vec![1, 2, 3]);
        let options = FetchOptions::method(HttpMethod::Post).with_body(RequestBody::Multipart(form));
        let request = build_request("http://api.test/uploads", &options, None);
        assert_eq!(request.headers.get(CONTENT_TYPE), None);

        // A caller-set Content-Type would lack the boundary, it is dropped too.
        let with_header = options
            .clone()
            .with_header("Content-Type", "multipart/form-data");
        let request = build_request("http://api.test/uploads", &with_header, None);
        assert_eq!(request.headers.get(CONTENT_TYPE), None);
        assert!(request.body.as_ref().is_some_and(RequestBody::is_multipart));

        let get = build_request("http://api.test/uploads", &FetchOptions::get(), None);
        assert_eq!(get.headers.get(CONTENT_TYPE), None);
    }

    #[tokio::test]
    async fn search_params_are_encoded_and_appended() {
        let transport = TokenCheckingTransport::new("token");
        let store = store_with("token", None).await;
        let endpoint = MockRefreshEndpoint::succeeding("unused", Duration::from_millis(1));
        let fetch = fetcher(transport.clone(), store, endpoint);

        fetch
            .fetch(
                "/tasks?team=core",
                FetchOptions::get()
                    .with_param("status", "open")
                    .with_param("q", "bug fix&more"),
            )
            .await
            .unwrap();
        fetch
            .fetch("https://other.test/ping", FetchOptions::get())
            .await
            .unwrap();

        let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://api.test/tasks?team=core&status=open&q=bug%20fix%26more".to_string(),
                "https://other.test/ping".to_string(),
            ]
        );
    }
}
