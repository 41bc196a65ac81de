use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{AuthSessionStore, UserRecord, UserRepo};
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

pub struct Argon2PasswordHasher;

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| AuthError::InternalError(format!("invalid PHC hash: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::InternalError(format!("verify error: {e}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub remember_me_refresh_ttl: Duration,
    pub signing_key: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user id as string
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String,
    kind: TokenKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TokenKind {
    Access,
    Refresh,
}

fn encode_claims(
    uid: UserId,
    jti: String,
    kind: TokenKind,
    ttl: Duration,
    cfg: &JwtConfig,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + ttl;
    let claims = Claims {
        sub: uid.0.to_string(),
        exp: exp_dt.timestamp(),
        iat: iat_dt.timestamp(),
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
        jti,
        kind,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&cfg.signing_key),
    )
    .map_err(|e| AuthError::InternalError(e.to_string()))?;
    Ok((token, exp_dt))
}

fn decode_claims(token: &str, kind: TokenKind, cfg: &JwtConfig) -> Result<Claims, AuthError> {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_exp = true;
    v.leeway = 0;
    v.set_audience(&[cfg.audience.clone()]);
    v.set_issuer(&[cfg.issuer.clone()]);
    let data = decode::<Claims>(token, &DecodingKey::from_secret(&cfg.signing_key), &v)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid,
        })?;
    // An access token must never be accepted as a refresh token and vice versa.
    if data.claims.kind != kind {
        return Err(AuthError::TokenInvalid);
    }
    Ok(data.claims)
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }

    #[inline]
    fn gen_jti() -> String {
        Uuid::new_v4().to_string()
    }

    #[inline]
    fn parse_user_id(sub: &str) -> Result<UserId, AuthError> {
        sub.parse::<UserId>().map_err(|_| AuthError::TokenInvalid)
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_access_token(
        &self,
        user: UserId,
        jti: Option<String>,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let jti = jti.unwrap_or_else(Self::gen_jti);
        let (token, exp_dt) =
            encode_claims(user, jti, TokenKind::Access, self.cfg.access_ttl, &self.cfg)?;
        Ok((AccessToken(token), exp_dt))
    }

    async fn issue_refresh_token(
        &self,
        user: UserId,
        jti: String,
        remember_me: bool,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError> {
        let ttl = if remember_me {
            self.cfg.remember_me_refresh_ttl
        } else {
            self.cfg.refresh_ttl
        };
        let (token, exp_dt) = encode_claims(user, jti, TokenKind::Refresh, ttl, &self.cfg)?;
        Ok((RefreshToken(token), exp_dt))
    }

    async fn verify_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<TokenVerifyResult, AuthError> {
        let claims = decode_claims(token.as_str(), TokenKind::Access, &self.cfg)?;
        let user_id = Self::parse_user_id(&claims.sub)?;
        Ok(TokenVerifyResult {
            user_id,
            jti: Some(claims.jti),
        })
    }

    async fn verify_refresh_token(
        &self,
        token: &RefreshToken,
    ) -> Result<TokenVerifyResult, AuthError> {
        let claims = decode_claims(token.as_str(), TokenKind::Refresh, &self.cfg)?;
        let user_id = Self::parse_user_id(&claims.sub)?;
        Ok(TokenVerifyResult {
            user_id,
            jti: Some(claims.jti),
        })
    }
}

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    session_store: Arc<dyn AuthSessionStore>,
    min_username_len: usize,
    min_password_len: usize,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn AuthSessionStore>,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            token_codec,
            session_store,
            min_username_len: 6,
            min_password_len: 6,
        }
    }

    fn validate_signup(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username.len() < self.min_username_len {
            return Err(AuthError::Validation("username too short".to_string()));
        }
        if password.len() < self.min_password_len {
            return Err(AuthError::Validation("password too short".to_string()));
        }
        Ok(())
    }

    #[inline]
    fn new_jti() -> String {
        Uuid::new_v4().to_string()
    }

    fn ttl_secs(until: DateTime<Utc>) -> u64 {
        let secs = (until - Utc::now()).num_seconds();
        if secs <= 0 { 1 } else { secs as u64 }
    }

    /// Verify a refresh token and confirm its jti is still live.
    async fn live_refresh_session(&self, refresh_token: &str) -> Result<(UserId, String), AuthError> {
        let verify_result = self
            .token_codec
            .verify_refresh_token(&RefreshToken(refresh_token.to_string()))
            .await?;
        let jti = verify_result.jti.ok_or(AuthError::TokenInvalid)?;

        match self.session_store.check_refresh_jti(&jti).await? {
            Some(user_id) if user_id == verify_result.user_id => Ok((user_id, jti)),
            _ => Err(AuthError::TokenInvalid),
        }
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn signup(&self, request: SignupInput) -> Result<UserId, AuthError> {
        let SignupInput { username, password } = request;

        self.validate_signup(&username, &password)?;

        if self.user_repo.username_exists(&username).await? {
            return Err(AuthError::UserExists);
        }

        let user_id = UserId(Uuid::new_v4());
        let password_hash = self.credential_hasher.hash_password(&password).await?;
        self.user_repo
            .create(UserRecord {
                user_id,
                username,
                password_hash,
                is_active: true,
                created_at: Utc::now(),
            })
            .await?;

        info!(%user_id, "user signed up");
        Ok(user_id)
    }

    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput {
            username,
            password,
            remember_me,
        } = request;

        let rec = self
            .user_repo
            .get_by_username(&username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !rec.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        let ok = self
            .credential_hasher
            .verify_password(&password, &rec.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        let jti = Self::new_jti();

        let (access_token, access_exp) = self
            .token_codec
            .issue_access_token(rec.user_id, Some(jti.clone()))
            .await?;

        let (refresh_token, refresh_exp) = self
            .token_codec
            .issue_refresh_token(rec.user_id, jti.clone(), remember_me)
            .await?;

        self.session_store
            .save_refresh_jti(rec.user_id, &jti, Self::ttl_secs(refresh_exp))
            .await?;

        info!(user_id = %rec.user_id, remember_me, "user logged in");
        Ok(LoginResult {
            user_id: rec.user_id,
            tokens: AuthTokens {
                access_token,
                refresh_token,
                access_token_expires_at: access_exp,
                refresh_token_expires_at: refresh_exp,
            },
        })
    }

    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        let verify_result = self
            .token_codec
            .verify_access_token(&AccessToken(token.to_string()))
            .await?;

        if !self.user_repo.id_exists(verify_result.user_id).await? {
            return Err(AuthError::UserNotFound);
        }

        Ok(verify_result.user_id)
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshedAccess, AuthError> {
        let (user_id, _jti) = self.live_refresh_session(refresh_token).await?;

        if !self.user_repo.id_exists(user_id).await? {
            return Err(AuthError::UserNotFound);
        }

        let (access_token, access_token_expires_at) =
            self.token_codec.issue_access_token(user_id, None).await?;

        debug!(%user_id, "access token refreshed");
        Ok(RefreshedAccess {
            access_token,
            access_token_expires_at,
        })
    }

    async fn logout(&self, user_id: UserId, refresh_token: &str) -> Result<(), AuthError> {
        let (owner, jti) = self.live_refresh_session(refresh_token).await?;
        if owner != user_id {
            return Err(AuthError::TokenInvalid);
        }
        self.session_store.revoke_refresh_jti(&jti).await?;
        info!(%user_id, "user logged out");
        Ok(())
    }

    async fn profile(&self, user_id: UserId) -> Result<UserProfile, AuthError> {
        let rec = self
            .user_repo
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(UserProfile {
            user_id: rec.user_id,
            username: rec.username,
            created_at: rec.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::{MemorySessionStore, MemoryUserRepo};

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            issuer: "teamboard.auth".to_string(),
            audience: "teamboard-web".to_string(),
            access_ttl: Duration::from_secs(3600),
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            remember_me_refresh_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            signing_key: b"test-signing-key".to_vec(),
        }
    }

    fn service() -> RealAuthService {
        RealAuthService::new(
            Arc::new(MemoryUserRepo::new()),
            Arc::new(Argon2PasswordHasher),
            Arc::new(JwtHs256Codec::new(jwt_config())),
            Arc::new(MemorySessionStore::new()),
        )
    }

    async fn signed_in(service: &RealAuthService, remember_me: bool) -> LoginResult {
        service
            .signup(SignupInput {
                username: "maria.k".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();
        service
            .login(LoginInput {
                username: "maria.k".to_string(),
                password: "correct horse".to_string(),
                remember_me,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn codec_rejects_token_of_the_wrong_kind() {
        let codec = JwtHs256Codec::new(jwt_config());
        let user = UserId(Uuid::new_v4());
        let (access, _) = codec.issue_access_token(user, None).await.unwrap();
        let (refresh, _) = codec
            .issue_refresh_token(user, "jti-1".to_string(), false)
            .await
            .unwrap();

        assert_eq!(codec.verify_access_token(&access).await.unwrap().user_id, user);
        assert!(matches!(
            codec.verify_refresh_token(&RefreshToken(access.0.clone())).await,
            Err(AuthError::TokenInvalid)
        ));
        assert!(matches!(
            codec.verify_access_token(&AccessToken(refresh.0.clone())).await,
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn remember_me_extends_refresh_lifetime() {
        let codec = JwtHs256Codec::new(jwt_config());
        let user = UserId(Uuid::new_v4());
        let (_, short) = codec
            .issue_refresh_token(user, "a".to_string(), false)
            .await
            .unwrap();
        let (_, long) = codec
            .issue_refresh_token(user, "b".to_string(), true)
            .await
            .unwrap();
        assert!(long - short > chrono::Duration::days(20));
    }

    #[tokio::test]
    async fn signup_validates_and_rejects_duplicates() {
        let service = service();
        let short = service
            .signup(SignupInput {
                username: "bob".to_string(),
                password: "long enough".to_string(),
            })
            .await;
        assert!(matches!(short, Err(AuthError::Validation(_))));

        signed_in(&service, false).await;
        let again = service
            .signup(SignupInput {
                username: "maria.k".to_string(),
                password: "another one".to_string(),
            })
            .await;
        assert!(matches!(again, Err(AuthError::UserExists)));
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let service = service();
        signed_in(&service, false).await;
        let result = service
            .login(LoginInput {
                username: "maria.k".to_string(),
                password: "wrong horse".to_string(),
                remember_me: false,
            })
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn refresh_keeps_refresh_token_valid_until_logout() {
        let service = service();
        let login = signed_in(&service, false).await;
        let refresh = login.tokens.refresh_token.as_str().to_string();

        let first = service.refresh_access_token(&refresh).await.unwrap();
        let user_id = service
            .verify_token(first.access_token.as_str())
            .await
            .unwrap();
        assert_eq!(user_id, login.user_id);

        // Not rotated, so the same refresh token works again.
        service.refresh_access_token(&refresh).await.unwrap();

        let stranger = UserId(Uuid::new_v4());
        assert!(matches!(
            service.logout(stranger, &refresh).await,
            Err(AuthError::TokenInvalid)
        ));

        service.logout(login.user_id, &refresh).await.unwrap();
        assert!(matches!(
            service.refresh_access_token(&refresh).await,
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn profile_returns_username() {
        let service = service();
        let login = signed_in(&service, true).await;
        let profile = service.profile(login.user_id).await.unwrap();
        assert_eq!(profile.username, "maria.k");
    }
}
