// Runs against a local server:
// $ cargo run --bin teamboard
// $ cargo run --bin fetch_demo
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use teamboard::application_impl::*;
use teamboard::application_port::*;
use teamboard::domain_model::*;
use teamboard::domain_port::*;
use teamboard::infra_http::*;
use teamboard::infra_memory::*;
use teamboard::logger::*;
use teamboard::settings::*;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: AccessToken,
    refresh_token: RefreshToken,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    let cli = Cli::parse();
    let project_settings = parse_settings(cli.settings.as_deref())?;
    logger.reload_from_config(&LogConfig {
        filter: project_settings.log.filter.clone(),
    })?;

    let client = &project_settings.client;
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(client.timeout())?);
    let coordinator = Arc::new(RefreshCoordinator::new(Arc::new(HttpRefreshExchange::new(
        transport.clone(),
        client.refresh_url(),
    ))));

    let credentials = json!({"username": "demo-user", "password": "demo-password"});
    let anonymous = AuthenticatedFetch::new(
        transport.clone(),
        Arc::new(MemoryCredentialStore::new()),
        coordinator.clone(),
    )
    .with_base_url(client.base_url.clone());

    let signup = anonymous
        .fetch(
            "/auth/signup",
            FetchOptions::method(HttpMethod::Post).with_body(RequestBody::json(&credentials)?),
        )
        .await?;
    info!(status = signup.status, "signup");

    let login = anonymous
        .fetch(
            "/auth/login",
            FetchOptions::method(HttpMethod::Post).with_body(RequestBody::Json(credentials)),
        )
        .await?;
    if !login.is_success() {
        return Err(anyhow::anyhow!("login failed: {} {}", login.status, login.text()));
    }
    let tokens: LoginResponse = login.json()?;

    // Start from a stale access token so the first call takes the refresh path.
    let store = Arc::new(MemoryCredentialStore::with_credentials(CredentialPair::from_tokens(
        AccessToken("stale-access-token".to_string()),
        tokens.refresh_token,
    )));
    let fetcher = AuthenticatedFetch::new(transport, store.clone(), coordinator)
        .with_base_url(client.base_url.clone());

    let report = fetcher.fetch_with_report("/me", FetchOptions::get()).await?;
    info!(status = report.response.status, path = ?report.path, "GET /me");
    println!("{}", report.response.text());

    let refreshed = store.access_token().await?;
    info!(
        rotated = refreshed.as_ref() != Some(&tokens.access_token),
        "access token after refresh"
    );

    Ok(())
}
