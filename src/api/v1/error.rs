use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let code = if let Some(code) = err.find::<ApiErrorCode>() {
        code.clone()
    } else if err.find::<reject::MissingHeader>().is_some() {
        ApiErrorCode::MissingToken
    } else if let Some(e) = err.find::<warp::body::BodyDeserializeError>() {
        ApiErrorCode::BadRequest(e.to_string())
    } else if err.find::<reject::LengthRequired>().is_some() {
        ApiErrorCode::BadRequest("content-length required".to_string())
    } else if err.find::<reject::PayloadTooLarge>().is_some() {
        ApiErrorCode::BadRequest("request body too large".to_string())
    } else if err.find::<reject::UnsupportedMediaType>().is_some() {
        ApiErrorCode::BadRequest("expected a JSON body".to_string())
    } else if err.is_not_found() {
        ApiErrorCode::NotFound
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        ApiErrorCode::MethodNotAllowed
    } else {
        ApiErrorCode::internal(format!("unhandled rejection: {:?}", err))
    };

    Ok(error_reply(&code))
}

pub fn error_reply(code: &ApiErrorCode) -> warp::reply::WithStatus<warp::reply::Json> {
    let json = warp::reply::json(&ApiError {
        error: code.code(),
        message: code.to_string(),
    });
    warp::reply::with_status(json, code.status())
}

/// Wire shape of every error: `{ "error": ..., "message": ... }`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiErrorCode {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiErrorCode::InvalidCredentials => "invalid_credentials",
            ApiErrorCode::UsernameTaken => "username_taken",
            ApiErrorCode::InvalidToken => "invalid_token",
            ApiErrorCode::TokenExpired => "token_expired",
            ApiErrorCode::MissingToken => "missing_token",
            ApiErrorCode::BadRequest(_) => "bad_request",
            ApiErrorCode::NotFound => "not_found",
            ApiErrorCode::MethodNotAllowed => "method_not_allowed",
            ApiErrorCode::InternalError => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::TokenExpired
            | ApiErrorCode::MissingToken => StatusCode::UNAUTHORIZED,
            ApiErrorCode::UsernameTaken => StatusCode::CONFLICT,
            ApiErrorCode::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::UserExists => ApiErrorCode::UsernameTaken,
            AuthError::UserNotFound | AuthError::TokenInvalid => ApiErrorCode::InvalidToken,
            AuthError::TokenExpired => ApiErrorCode::TokenExpired,
            AuthError::Validation(message) => ApiErrorCode::BadRequest(message),
            AuthError::Store(e) => ApiErrorCode::internal(e),
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_http_statuses() {
        let cases = [
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::TokenExpired, StatusCode::UNAUTHORIZED),
            (AuthError::UserExists, StatusCode::CONFLICT),
            (AuthError::Validation("short".into()), StatusCode::BAD_REQUEST),
            (AuthError::Store("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiErrorCode::from(error).status(), status);
        }
    }
}
