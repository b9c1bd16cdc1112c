use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::params::ParameterSet;
use crate::request::Request;
use crate::response::Response;
use crate::transport::{HttpTransport, Method, RequestSigner, Transport};

/// Main entry point: builds a [`Request`] for the API generation the
/// parameters select, sends it and wraps the reply in the matching
/// [`Response`].
///
/// ```no_run
/// use etsy_client::{Config, EtsyClient, ParameterSet};
///
/// let client = EtsyClient::new(Config::new("my-api-key"));
/// let response = client.get("/listings/active", &ParameterSet::new()).unwrap();
/// println!("{} listings", response.total().unwrap().unwrap_or(0));
/// ```
pub struct EtsyClient {
    config: Config,
    transport: Option<Arc<dyn Transport>>,
    signer: Option<Arc<dyn RequestSigner>>,
}

impl EtsyClient {
    /// Client sending over a fresh [`HttpTransport`] per request, so that
    /// per-request redirect limits apply.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            transport: None,
            signer: None,
        }
    }

    pub fn with_transport(config: Config, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Some(Arc::new(transport)),
            signer: None,
        }
    }

    /// Signer used for v2 requests carrying a token/secret pair. Only consulted
    /// when no custom transport was given.
    pub fn with_signer(mut self, signer: impl RequestSigner + 'static) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn get(&self, resource_path: &str, parameters: &ParameterSet) -> Result<Response> {
        self.request(Method::Get, resource_path, parameters)
    }

    pub fn post(&self, resource_path: &str, parameters: &ParameterSet) -> Result<Response> {
        self.request(Method::Post, resource_path, parameters)
    }

    pub fn put(&self, resource_path: &str, parameters: &ParameterSet) -> Result<Response> {
        self.request(Method::Put, resource_path, parameters)
    }

    pub fn delete(&self, resource_path: &str, parameters: &ParameterSet) -> Result<Response> {
        self.request(Method::Delete, resource_path, parameters)
    }

    pub fn request(
        &self,
        method: Method,
        resource_path: &str,
        parameters: &ParameterSet,
    ) -> Result<Response> {
        let request = Request::new(&self.config, resource_path, parameters)?;
        let version = request.api_version();

        let raw = match &self.transport {
            Some(transport) => request.perform(method, transport.as_ref())?,
            None => {
                let transport = HttpTransport::builder()
                    .max_redirects(request.max_redirects())
                    .signer(self.signer.clone())
                    .build()?;
                request.perform(method, &transport)?
            }
        };

        debug!(%version, %method, resource_path, status = raw.status, "request completed");
        Ok(Response::new(version, raw, &self.config))
    }
}

impl fmt::Debug for EtsyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EtsyClient")
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .field("signer", &self.signer.is_some())
            .finish()
    }
}
