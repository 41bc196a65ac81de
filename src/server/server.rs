use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_http::CookiePolicy;
use crate::infra_memory::*;
use crate::logger::*;
use crate::settings::Settings;
use std::sync::Arc;

const DEV_SIGNING_KEY: &str = "teamboard-dev-signing-key";

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub cookie_policy: Arc<CookiePolicy>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let auth_service: Arc<dyn AuthService> = match settings.auth.backend.as_str() {
            "fake" => Arc::new(FakeAuthService::new()),
            "real" => {
                let key = match std::env::var("JWT_SIGNING_KEY") {
                    Ok(key) if !key.is_empty() => key,
                    _ => {
                        warn!("JWT_SIGNING_KEY is not set, using the development key");
                        DEV_SIGNING_KEY.to_string()
                    }
                };
                let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
                    issuer: settings.auth.issuer.clone(),
                    audience: settings.auth.audience.clone(),
                    access_ttl: settings.auth.access_ttl(),
                    refresh_ttl: settings.auth.refresh_ttl(),
                    remember_me_refresh_ttl: settings.auth.remember_me_refresh_ttl(),
                    signing_key: key.into_bytes(),
                }));
                let user_repo: Arc<dyn UserRepo> = Arc::new(MemoryUserRepo::new());
                let session_store: Arc<dyn AuthSessionStore> = Arc::new(MemorySessionStore::new());
                Arc::new(RealAuthService::new(
                    user_repo,
                    Arc::new(Argon2PasswordHasher {}),
                    token_codec,
                    session_store,
                ))
            }
            other => return Err(anyhow::anyhow!("Unknown auth backend: {}", other)),
        };
        info!(backend = %settings.auth.backend, "auth service ready");

        let cookie_policy = CookiePolicy {
            secure: settings.cookie.secure,
            access_max_age_secs: settings.auth.access_ttl_secs,
            refresh_max_age_secs: settings.auth.refresh_ttl_secs,
            remember_me_max_age_secs: settings.auth.remember_me_refresh_ttl_secs,
            ..CookiePolicy::default()
        };

        Ok(Self::from_parts(auth_service, cookie_policy))
    }

    pub fn from_parts(auth_service: Arc<dyn AuthService>, cookie_policy: CookiePolicy) -> Self {
        Self {
            auth_service,
            cookie_policy: Arc::new(cookie_policy),
        }
    }
}
