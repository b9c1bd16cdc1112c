use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::Config;
use crate::error::{EtsyError, Result};
use crate::params::{CommonParams, ParameterSet};
use crate::query;
use crate::transport::{Body, HttpRequest, Method, RawResponse, Transport};

use super::BASE_PATH;

// ---------------------------------------------------------------------------
// OAuth 2.0 client / token options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    pub headers: BTreeMap<String, String>,
}

/// Settings of the OAuth 2.0 client the bearer token belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OAuthClientOptions {
    /// Overrides `{protocol}://{host}/v3/application`.
    pub site: Option<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub token_method: String,
    pub max_redirects: usize,
    /// Turn non-2xx statuses into transport errors instead of classifying them.
    pub raise_errors: bool,
    pub auth_scheme: String,
    pub connection_opts: ConnectionOptions,
}

impl Default for OAuthClientOptions {
    fn default() -> Self {
        Self {
            site: None,
            authorize_url: "/oauth/authorize".into(),
            token_url: "/oauth/token".into(),
            token_method: "post".into(),
            max_redirects: 5,
            raise_errors: false,
            auth_scheme: "basic_auth".into(),
            connection_opts: ConnectionOptions::default(),
        }
    }
}

/// Where the bearer token is placed on each request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenMode {
    #[default]
    Header,
    Body,
    Query,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OAuthTokenOptions {
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub expires_at: Option<u64>,
    pub mode: TokenMode,
    /// `%s` is replaced by the token.
    pub header_format: String,
    pub param_name: String,
}

impl Default for OAuthTokenOptions {
    fn default() -> Self {
        Self {
            refresh_token: None,
            expires_in: None,
            expires_at: None,
            mode: TokenMode::Header,
            header_format: "Bearer %s".into(),
            param_name: "access_token".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthClient {
    pub id: String,
    pub secret: Option<String>,
    pub site: String,
    pub options: OAuthClientOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub client: OAuthClient,
    pub token: Option<String>,
    pub options: OAuthTokenOptions,
}

impl AccessToken {
    pub fn refresh_token(&self) -> Option<&str> {
        self.options.refresh_token.as_deref()
    }

    pub fn expires_in(&self) -> Option<u64> {
        self.options.expires_in
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A v3 request: bearer token plus `x-api-key` on every call.
#[derive(Debug, Clone)]
pub struct Request {
    resource_path: String,
    api_key: String,
    parameters: ParameterSet,
    client: AccessToken,
}

impl Request {
    pub fn new(config: &Config, resource_path: &str, parameters: &ParameterSet) -> Result<Self> {
        let common = CommonParams::extract(config, parameters);

        let mut parameters = common.parameters;
        // v2 only
        parameters.remove("fields");
        if let Some(includes) = common.includes {
            parameters.insert("includes".into(), includes);
        }

        let client_options = client_options(config, common.oauth_client_options)?;
        let token_options: OAuthTokenOptions =
            options_from("oauth_token_options", common.oauth_token_options.unwrap_or(Value::Null))?;

        let site = client_options
            .site
            .clone()
            .unwrap_or_else(|| format!("{}{BASE_PATH}", config.site()));

        Ok(Self {
            resource_path: resource_path.to_string(),
            api_key: config.api_key.clone(),
            parameters,
            client: AccessToken {
                client: OAuthClient {
                    id: config.api_key.clone(),
                    secret: config.api_secret.clone(),
                    site,
                    options: client_options,
                },
                token: common.token,
                options: token_options,
            },
        })
    }

    pub fn base_path(&self) -> &'static str {
        BASE_PATH
    }

    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    pub fn token(&self) -> Option<&str> {
        self.client.token.as_deref()
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn client(&self) -> &AccessToken {
        &self.client
    }

    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.client.client.site.trim_end_matches('/'),
            self.resource_path.trim_start_matches('/')
        )
    }

    /// Build the wire-level request for `method`.
    pub fn build(&self, method: Method) -> Result<HttpRequest> {
        let token = self.token().ok_or(EtsyError::MissingAccessToken)?;
        let token_options = &self.client.options;

        let mut request = HttpRequest::new(method, self.url());
        for (name, value) in &self.client.client.options.connection_opts.headers {
            request.headers.push((name.clone(), value.clone()));
        }
        request.headers.push(("x-api-key".into(), self.api_key.clone()));

        let (mut query_params, mut body_params) = match method {
            Method::Get => (self.parameters.clone(), ParameterSet::new()),
            Method::Post | Method::Put => (ParameterSet::new(), self.parameters.clone()),
            Method::Delete => (ParameterSet::new(), ParameterSet::new()),
        };

        let token_value = Value::String(token.to_string());
        match token_options.mode {
            TokenMode::Header => request.headers.push((
                "Authorization".into(),
                token_options.header_format.replace("%s", token),
            )),
            TokenMode::Query => {
                query_params.insert(token_options.param_name.clone(), token_value);
            }
            TokenMode::Body => {
                body_params.insert(token_options.param_name.clone(), token_value);
            }
        }

        if !query_params.is_empty() {
            request.query = Some(query::to_url(&query_params));
        }
        if !body_params.is_empty() {
            request.body = Some(Body::Form(query::to_url(&body_params)));
        }

        Ok(request)
    }

    pub fn get(&self, transport: &dyn Transport) -> Result<RawResponse> {
        self.perform(Method::Get, transport)
    }

    pub fn post(&self, transport: &dyn Transport) -> Result<RawResponse> {
        self.perform(Method::Post, transport)
    }

    pub fn put(&self, transport: &dyn Transport) -> Result<RawResponse> {
        self.perform(Method::Put, transport)
    }

    pub fn delete(&self, transport: &dyn Transport) -> Result<RawResponse> {
        self.perform(Method::Delete, transport)
    }

    pub fn perform(&self, method: Method, transport: &dyn Transport) -> Result<RawResponse> {
        let request = self.build(method)?;
        debug!(version = "v3", %method, url = %request.url, "sending request");

        let raw = transport.execute(&request)?;
        if self.client.client.options.raise_errors && !raw.is_success() {
            return Err(EtsyError::Api {
                status: raw.status,
                message: raw.body,
            });
        }

        Ok(raw)
    }
}

/// Defaults (`raise_errors: false`, configured User-Agent) with the caller's
/// options merged over them key by key.
fn client_options(config: &Config, overrides: Option<Value>) -> Result<OAuthClientOptions> {
    let mut merged = Map::new();
    if let Some(ref user_agent) = config.user_agent {
        merged.insert(
            "connection_opts".into(),
            json!({ "headers": { "User-Agent": user_agent } }),
        );
    }
    merged.insert("raise_errors".into(), Value::Bool(false));

    match overrides {
        None | Some(Value::Null) => {}
        Some(Value::Object(map)) => merged.extend(map),
        Some(other) => {
            return Err(EtsyError::invalid_parameter(
                "oauth_client_options",
                format!("expected an object, got {other}"),
            ))
        }
    }

    options_from("oauth_client_options", Value::Object(merged))
}

fn options_from<T: DeserializeOwned + Default>(name: &str, value: Value) -> Result<T> {
    match value {
        Value::Null => Ok(T::default()),
        value => serde_json::from_value(value).map_err(|e| EtsyError::invalid_parameter(name, e)),
    }
}
