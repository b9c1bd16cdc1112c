//! API v2: application API key or OAuth 1.0 token/secret, pages flagged by a
//! `pagination` key.

mod request;
mod response;

pub use request::Request;
pub use response::Response;

pub const BASE_PATH: &str = "/v2";
