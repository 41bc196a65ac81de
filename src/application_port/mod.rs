mod auth_service;
mod fetch_service;

pub use auth_service::*;
pub use fetch_service::*;
