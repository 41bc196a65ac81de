// client

mod credential_store;
mod http_transport;
mod refresh_exchange;

pub use credential_store::*;
pub use http_transport::*;
pub use refresh_exchange::*;

// server

mod auth_session_store;
mod user_repo;

pub use auth_session_store::*;
pub use user_repo::*;
