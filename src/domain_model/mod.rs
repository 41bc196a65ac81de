mod http;
mod token;
mod user;

pub use http::*;
pub use token::*;
pub use user::*;
