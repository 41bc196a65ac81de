use anyhow::{Result, anyhow};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

const BOOTSTRAP_FILTER: &str = "info";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
}

impl LogConfig {
    pub fn parse_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.filter).map_err(|e| anyhow!("invalid log filter {:?}: {e}", self.filter))
    }
}

pub struct Logger {
    reload_handle: reload::Handle<EnvFilter, Registry>,
    // RUST_LOG was set at bootstrap and wins over the settings file.
    env_override: bool,
}

impl Logger {
    /// Install the global subscriber. Uses `RUST_LOG` when present, `info`
    /// otherwise, until settings are loaded.
    pub fn new_bootstrap() -> Self {
        let (filter, env_override) = match EnvFilter::try_from_default_env() {
            Ok(filter) => (filter, true),
            Err(_) => (EnvFilter::new(BOOTSTRAP_FILTER), false),
        };
        let (filter, reload_handle) = reload::Layer::new(filter);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();

        Self {
            reload_handle,
            env_override,
        }
    }

    /// Swap in the configured filter. Returns `false` when `RUST_LOG` is in
    /// charge and the config was ignored.
    pub fn reload_from_config(&self, config: &LogConfig) -> Result<bool> {
        let filter = config.parse_filter()?;
        if self.env_override {
            tracing::debug!(filter = %config.filter, "RUST_LOG set, keeping bootstrap filter");
            return Ok(false);
        }
        self.reload_handle.reload(filter).map_err(|e| anyhow!(e))?;
        Ok(true)
    }
}
