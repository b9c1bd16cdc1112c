//! API v3: OAuth 2.0 bearer token plus `x-api-key`, pages identified by a
//! `count` key and errors wrapped in a JSON `error` envelope.

mod request;
mod response;

pub use request::{
    AccessToken, ConnectionOptions, OAuthClient, OAuthClientOptions, OAuthTokenOptions, Request,
    TokenMode,
};
pub use response::Response;

pub const BASE_PATH: &str = "/v3/application";
