use std::fmt;
use std::sync::Arc;

use reqwest::blocking::{multipart, Client};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::redirect::Policy;
use tracing::debug;

use crate::error::{EtsyError, Result};

// ---------------------------------------------------------------------------
// Wire-level request / response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Already-encoded `application/x-www-form-urlencoded` payload.
    Form(String),
    /// Text fields of a `multipart/form-data` payload.
    Multipart(Vec<(String, String)>),
}

/// How the transport must authenticate the request on top of its headers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Signing {
    /// Nothing to add; the request is either anonymous or already carries its
    /// credentials (API key parameter, bearer header).
    #[default]
    None,
    /// Sign on behalf of the token holder through a [`RequestSigner`].
    OAuth1 { token: String, secret: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL without the query string.
    pub url: String,
    /// Encoded query string, without the leading `?`.
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    pub signing: Signing,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: None,
            headers: Vec::new(),
            body: None,
            signing: Signing::None,
        }
    }

    pub fn full_url(&self) -> String {
        match self.query.as_deref() {
            Some(q) if !q.is_empty() => format!("{}?{q}", self.url),
            _ => self.url.clone(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status code and body exactly as the server returned them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// Executes wire-level requests. Non-2xx statuses are not errors here.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<RawResponse>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<RawResponse> {
        (**self).execute(request)
    }
}

/// Produces the `Authorization` header for requests made in secure v2 mode.
pub trait RequestSigner: Send + Sync {
    fn authorization(&self, request: &HttpRequest, token: &str, secret: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// reqwest-backed transport
// ---------------------------------------------------------------------------

/// Blocking HTTP transport built on `reqwest`.
pub struct HttpTransport {
    http: Client,
    signer: Option<Arc<dyn RequestSigner>>,
}

#[derive(Default)]
pub struct HttpTransportBuilder {
    max_redirects: Option<usize>,
    signer: Option<Arc<dyn RequestSigner>>,
}

impl HttpTransportBuilder {
    pub fn max_redirects(mut self, max_redirects: Option<usize>) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn signer(mut self, signer: Option<Arc<dyn RequestSigner>>) -> Self {
        self.signer = signer;
        self
    }

    pub fn build(self) -> Result<HttpTransport> {
        let mut builder = Client::builder();
        if let Some(max) = self.max_redirects {
            builder = builder.redirect(Policy::limited(max));
        }

        Ok(HttpTransport {
            http: builder.build()?,
            signer: self.signer,
        })
    }
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &HttpRequest) -> Result<RawResponse> {
        let url = request.full_url();
        let mut builder = match request.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Put => self.http.put(&url),
            Method::Delete => self.http.delete(&url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Signing::OAuth1 { token, secret } = &request.signing {
            let signer = self.signer.as_ref().ok_or(EtsyError::MissingSigner)?;
            builder = builder.header(AUTHORIZATION, signer.authorization(request, token, secret)?);
        }

        builder = match &request.body {
            Some(Body::Form(payload)) => builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(payload.clone()),
            Some(Body::Multipart(fields)) => {
                let mut form = multipart::Form::new();
                for (name, value) in fields {
                    form = form.text(name.clone(), value.clone());
                }
                builder.multipart(form)
            }
            None => builder,
        };

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        debug!(method = %request.method, status, "received response");

        Ok(RawResponse { status, body })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_url_appends_non_empty_query() {
        let mut request = HttpRequest::new(Method::Get, "https://example.com/v2/users");
        assert_eq!(request.full_url(), "https://example.com/v2/users");

        request.query = Some(String::new());
        assert_eq!(request.full_url(), "https://example.com/v2/users");

        request.query = Some("a=b".into());
        assert_eq!(request.full_url(), "https://example.com/v2/users?a=b");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut request = HttpRequest::new(Method::Get, "https://example.com");
        request.headers.push(("x-api-key".into(), "key".into()));
        assert_eq!(request.header("X-Api-Key"), Some("key"));
        assert_eq!(request.header("authorization"), None);
    }

    #[test]
    fn test_raw_response_success_range() {
        assert!(RawResponse::new(200, "").is_success());
        assert!(RawResponse::new(201, "").is_success());
        assert!(!RawResponse::new(404, "").is_success());
        assert!(!RawResponse::new(500, "").is_success());
    }

    #[test]
    fn test_method_names() {
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }
}
