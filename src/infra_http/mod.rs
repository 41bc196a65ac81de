mod cookie_policy;
mod credential_store_cookie;
mod refresh_exchange_http;
mod transport_reqwest;

pub use cookie_policy::*;
pub use credential_store_cookie::*;
pub use refresh_exchange_http::*;
pub use transport_reqwest::*;
