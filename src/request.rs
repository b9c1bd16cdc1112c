use crate::config::Config;
use crate::error::Result;
use crate::params::{ApiVersion, ParameterSet};
use crate::transport::{HttpRequest, Method, RawResponse, Transport};
use crate::{v2, v3};

/// A request routed to the API generation named by the `api_version`
/// parameter. Only `"v3"` selects v3; anything else, or nothing, is v2.
#[derive(Debug, Clone)]
pub enum Request {
    V2(v2::Request),
    V3(v3::Request),
}

impl Request {
    pub fn new(config: &Config, resource_path: &str, parameters: &ParameterSet) -> Result<Self> {
        match ApiVersion::from_params(parameters) {
            ApiVersion::V2 => Ok(Request::V2(v2::Request::new(config, resource_path, parameters)?)),
            ApiVersion::V3 => Ok(Request::V3(v3::Request::new(config, resource_path, parameters)?)),
        }
    }

    pub fn api_version(&self) -> ApiVersion {
        match self {
            Request::V2(_) => ApiVersion::V2,
            Request::V3(_) => ApiVersion::V3,
        }
    }

    pub fn base_path(&self) -> &'static str {
        match self {
            Request::V2(r) => r.base_path(),
            Request::V3(r) => r.base_path(),
        }
    }

    pub fn resource_path(&self) -> &str {
        match self {
            Request::V2(r) => r.resource_path(),
            Request::V3(r) => r.resource_path(),
        }
    }

    pub fn parameters(&self) -> &ParameterSet {
        match self {
            Request::V2(r) => r.parameters(),
            Request::V3(r) => r.parameters(),
        }
    }

    /// Redirect limit the transport should follow, when the request sets one.
    pub fn max_redirects(&self) -> Option<usize> {
        match self {
            Request::V2(_) => None,
            Request::V3(r) => Some(r.client().client.options.max_redirects),
        }
    }

    pub fn build(&self, method: Method) -> Result<HttpRequest> {
        match self {
            Request::V2(r) => Ok(r.build(method)),
            Request::V3(r) => r.build(method),
        }
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
        match self {
            Request::V2(r) => r.perform(method, transport),
            Request::V3(r) => r.perform(method, transport),
        }
    }
}
