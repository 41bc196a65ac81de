mod auth_service_fake;
mod auth_service_impl;
mod authenticated_fetch;
mod refresh_coordinator;

pub use auth_service_fake::*;
pub use auth_service_impl::*;
pub use authenticated_fetch::*;
pub use refresh_coordinator::*;
