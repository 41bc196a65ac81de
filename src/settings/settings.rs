use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub client: Client,
    pub cookie: Cookie,
    pub http: Http,
    pub log: Log,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub backend: String, // "fake" or "real"
    pub issuer: String,
    pub audience: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub remember_me_refresh_ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Client {
    /// API root used by AuthenticatedFetch for relative URLs.
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Cookie {
    pub secure: bool,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub tls: Option<Tls>,
}

#[derive(Debug, Deserialize)]
pub struct Tls {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

impl Auth {
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }

    pub fn remember_me_refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.remember_me_refresh_ttl_secs)
    }
}

impl Client {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn refresh_url(&self) -> String {
        format!("{}/auth/refresh", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Environment overrides use the `TEAMBOARD__SECTION__KEY` form,
/// e.g. `TEAMBOARD__HTTP__ADDRESS=0.0.0.0:8443`.
const ENV_PREFIX: &str = "TEAMBOARD";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    if settings.auth.access_ttl_secs == 0 || settings.auth.refresh_ttl_secs == 0 {
        return Err(anyhow!("auth token lifetimes must be positive"));
    }

    Ok(settings)
}
