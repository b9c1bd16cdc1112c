//! Etsy API client library for Rust.
//!
//! Builds authenticated requests against the two generations of the
//! [Etsy Open API](https://developers.etsy.com/) and classifies their
//! replies into normalized results or typed errors.
//!
//! * v2 requests authenticate with the application API key (`api_key`
//!   parameter) or, given an access token and secret, an OAuth 1.0 signature
//!   produced by a [`RequestSigner`].
//! * v3 requests carry an OAuth 2.0 bearer token plus the `x-api-key` header.
//!
//! The generation is picked per call through the `api_version` parameter:
//! `"v3"` selects v3, anything else v2.
//!
//! # Quick Start
//!
//! ```no_run
//! use etsy_client::{Config, EtsyClient, NormalizedResult};
//! use serde_json::json;
//!
//! let client = EtsyClient::new(Config::from_env());
//!
//! let params = json!({"api_version": "v3", "access_token": "token", "limit": 10});
//! let response = client
//!     .get("/shops/123/listings/active", params.as_object().unwrap())
//!     .unwrap();
//!
//! match response.result().unwrap() {
//!     NormalizedResult::Many(listings) => println!("{} listings", listings.len()),
//!     NormalizedResult::Single(listing) => println!("{listing}"),
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod params;
pub mod query;
pub mod request;
pub mod response;
pub mod transport;
pub mod v2;
pub mod v3;

// Re-export the main public types at the crate root for convenience.
pub use client::EtsyClient;
pub use config::{Config, Credentials};
pub use error::{ErrorKind, EtsyError, ResponseError, Result};
pub use params::{parse_includes, ApiVersion, AssociationSpec, ParameterSet};
pub use request::Request;
pub use response::{NormalizedResult, Response};
pub use transport::{
    Body, HttpRequest, HttpTransport, HttpTransportBuilder, Method, RawResponse, RequestSigner,
    Signing, Transport,
};
pub use v3::{AccessToken, OAuthClient, OAuthClientOptions, OAuthTokenOptions, TokenMode};
