use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::infra_http::CookiePolicy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::{HeaderValue, StatusCode, header};
use warp::reject;
use warp::reply::Response;
use warp::Reply;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignupResponse {
    user_id: UserId,
}

pub async fn signup(
    request: SignupRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user_id = auth_service
        .signup(SignupInput {
            username: request.username,
            password: request.password,
        })
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&SignupResponse { user_id }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user_id: UserId,
    #[serde(flatten)]
    tokens: AuthTokens,
}

pub async fn login(
    request: LoginRequest,
    auth_service: Arc<dyn AuthService>,
    cookie_policy: Arc<CookiePolicy>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let remember_me = request.remember_me;
    let LoginResult { user_id, tokens } = auth_service
        .login(LoginInput {
            username: request.username,
            password: request.password,
            remember_me,
        })
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let cookies = [
        cookie_policy.access_cookie(&tokens.access_token),
        cookie_policy.refresh_cookie(&tokens.refresh_token, remember_me),
    ];

    let response = warp::reply::json(&LoginResponse { user_id, tokens }).into_response();
    with_cookies(response, &cookies)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: AccessToken,
}

pub async fn refresh(
    request: RefreshRequest,
    auth_service: Arc<dyn AuthService>,
    cookie_policy: Arc<CookiePolicy>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let refreshed = auth_service
        .refresh_access_token(&request.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let cookie = cookie_policy.access_cookie(&refreshed.access_token);
    let response = warp::reply::json(&RefreshResponse {
        access_token: refreshed.access_token,
    })
    .into_response();
    with_cookies(response, &[cookie])
}

pub async fn logout(
    user_id: UserId,
    request: RefreshRequest,
    auth_service: Arc<dyn AuthService>,
    cookie_policy: Arc<CookiePolicy>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .logout(user_id, &request.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT).into_response();
    with_cookies(response, &cookie_policy.expired_cookies())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    user_id: UserId,
    username: String,
}

pub async fn me(
    user_id: UserId,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let profile = auth_service
        .profile(user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&MeResponse {
        user_id: profile.user_id,
        username: profile.username,
    }))
}

fn with_cookies(mut response: Response, cookies: &[String]) -> Result<Response, warp::Rejection> {
    for cookie in cookies {
        let value = HeaderValue::from_str(cookie)
            .map_err(ApiErrorCode::internal)
            .map_err(reject::custom)?;
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}
