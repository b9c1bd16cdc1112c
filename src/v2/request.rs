use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{EtsyError, Result};
use crate::params::{parse_includes, AssociationSpec, CommonParams, ParameterSet};
use crate::query;
use crate::transport::{Body, HttpRequest, Method, RawResponse, Signing, Transport};

use super::BASE_PATH;

/// A v2 request, fully resolved at construction.
///
/// In basic mode (no token/secret pair) the application API key travels as
/// the `api_key` parameter; in secure mode the transport signs the request
/// instead.
#[derive(Debug, Clone)]
pub struct Request {
    site: String,
    resource_path: String,
    token: Option<String>,
    secret: Option<String>,
    resources: Vec<AssociationSpec>,
    multipart: bool,
    parameters: ParameterSet,
}

impl Request {
    pub fn new(config: &Config, resource_path: &str, parameters: &ParameterSet) -> Result<Self> {
        let common = CommonParams::extract(config, parameters);
        let secure = common.token.is_some() && common.secret.is_some();

        if common.require_secure && !secure {
            return Err(EtsyError::SecureConnectionRequired);
        }

        let resources = parse_includes(common.includes.as_ref())?;

        let mut parameters = common.parameters;
        if !secure {
            parameters.insert("api_key".into(), Value::String(config.api_key.clone()));
        }

        Ok(Self {
            site: config.site(),
            resource_path: resource_path.to_string(),
            token: common.token,
            secret: common.secret,
            resources,
            multipart: common.multipart,
            parameters,
        })
    }

    pub fn base_path(&self) -> &'static str {
        BASE_PATH
    }

    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Wire parameters, `api_key` included in basic mode.
    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn resources(&self) -> &[AssociationSpec] {
        &self.resources
    }

    pub fn is_multipart(&self) -> bool {
        self.multipart
    }

    pub fn is_secure(&self) -> bool {
        self.token.is_some() && self.secret.is_some()
    }

    pub fn query(&self) -> String {
        query::to_url_with_includes(&self.parameters, &self.resources)
    }

    /// Path relative to the host, e.g. `/v2/shops/1/listings?api_key=...`.
    pub fn endpoint_url(&self, include_query: bool) -> String {
        let mut url = format!("{BASE_PATH}{}", self.resource_path);
        if include_query {
            url.push('?');
            url.push_str(&self.query());
        }
        url
    }

    /// Build the wire-level request for `method`.
    pub fn build(&self, method: Method) -> HttpRequest {
        let mut request = HttpRequest::new(method, format!("{}{}", self.site, self.endpoint_url(false)));
        request.signing = self.signing();

        match method {
            Method::Get | Method::Delete => {
                request.query = Some(self.query());
            }
            Method::Post if self.multipart => {
                request.body = Some(Body::Multipart(query::fields(&self.parameters)));
            }
            Method::Post => {
                request.query = Some(self.query());
            }
            Method::Put => {
                request.body = Some(Body::Form(self.query()));
            }
        }

        request
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
        let request = self.build(method);
        debug!(
            version = "v2",
            %method,
            url = %request.url,
            secure = self.is_secure(),
            multipart = self.multipart,
            "sending request"
        );
        transport.execute(&request)
    }

    fn signing(&self) -> Signing {
        match (&self.token, &self.secret) {
            (Some(token), Some(secret)) => Signing::OAuth1 {
                token: token.clone(),
                secret: secret.clone(),
            },
            _ => Signing::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transport::testing::RecordingTransport;
    use serde_json::json;
    use std::collections::HashMap;

    fn params(value: Value) -> ParameterSet {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn config() -> Config {
        Config::new("key")
    }

    fn decode(query: &str) -> HashMap<String, Vec<String>> {
        let mut out: HashMap<String, Vec<String>> = HashMap::new();
        for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
            out.entry(k.into_owned()).or_default().push(v.into_owned());
        }
        out
    }

    #[test]
    fn test_require_secure_without_credentials_fails_before_any_call() {
        let err = Request::new(&config(), "/path", &params(json!({"require_secure": true})))
            .unwrap_err();
        assert!(matches!(err, EtsyError::SecureConnectionRequired));
        assert_eq!(err.kind(), Some(ErrorKind::SecureConnectionRequired));
    }

    #[test]
    fn test_require_secure_with_credentials_succeeds() {
        let request = Request::new(
            &config(),
            "/path",
            &params(json!({"require_secure": true, "access_token": "t", "access_secret": "s"})),
        )
        .unwrap();
        assert!(request.is_secure());
    }

    #[test]
    fn test_basic_mode_appends_api_key() {
        let request = Request::new(&config(), "/user", &params(json!({"limit": "1"}))).unwrap();
        assert_eq!(
            request.parameters(),
            &params(json!({"limit": "1", "api_key": "key"}))
        );
        assert!(!request.is_secure());
    }

    #[test]
    fn test_secure_mode_omits_api_key() {
        let request = Request::new(
            &config(),
            "/user",
            &params(json!({"limit": "1", "access_token": "token", "access_secret": "secret"})),
        )
        .unwrap();
        assert_eq!(request.parameters(), &params(json!({"limit": "1"})));
        assert_eq!(request.token(), Some("token"));
        assert_eq!(request.secret(), Some("secret"));
    }

    #[test]
    fn test_token_without_secret_stays_basic() {
        let request =
            Request::new(&config(), "/user", &params(json!({"access_token": "token"}))).unwrap();
        assert!(!request.is_secure());
        assert!(request.parameters().contains_key("api_key"));
    }

    #[test]
    fn test_single_and_simplified_associations() {
        let request =
            Request::new(&config(), "/foo", &params(json!({"a": "b", "includes": "Thunder"}))).unwrap();
        let decoded = decode(&request.query());
        assert_eq!(decoded["a"], vec!["b"]);
        assert_eq!(decoded["includes"], vec!["Thunder"]);

        let request = Request::new(
            &config(),
            "/foo",
            &params(json!({"a": "b", "includes": ["Thunder", "Lightning"]})),
        )
        .unwrap();
        assert_eq!(decode(&request.query())["includes"], vec!["Thunder,Lightning"]);
    }

    #[test]
    fn test_multiple_resources_in_endpoint_url() {
        let request = Request::new(
            &config(),
            "/foo",
            &params(json!({
                "a": "b",
                "includes": [{"resource": "Lightning"}, {"resource": "Thunder"}]
            })),
        )
        .unwrap();

        let url = request.endpoint_url(true);
        let (path, query) = url.split_once('?').unwrap();
        assert_eq!(path, "/v2/foo");
        let decoded = decode(query);
        assert_eq!(decoded["a"], vec!["b"]);
        assert_eq!(decoded["includes"], vec!["Lightning,Thunder"]);
        assert_eq!(decoded["api_key"], vec!["key"]);
    }

    #[test]
    fn test_caller_params_are_not_modified() {
        let options = params(json!({
            "includes": "Lightning",
            "access_token": "token",
            "access_secret": "secret",
            "fields": ["id"],
            "limit": 100,
            "offset": 100
        }));
        let copy = options.clone();

        Request::new(&config(), "", &options).unwrap();

        assert_eq!(options, copy);
    }

    #[test]
    fn test_get_builds_query_against_site() {
        let request = Request::new(&config(), "/shops/1", &params(json!({"limit": 5}))).unwrap();
        let wire = request.build(Method::Get);
        assert_eq!(wire.method, Method::Get);
        assert_eq!(wire.url, "https://openapi.etsy.com/v2/shops/1");
        assert_eq!(wire.query.as_deref(), Some("api_key=key&limit=5"));
        assert_eq!(wire.body, None);
        assert_eq!(wire.signing, Signing::None);
    }

    #[test]
    fn test_put_sends_query_as_body() {
        let request = Request::new(&config(), "/listings/1", &params(json!({"title": "a b"}))).unwrap();
        let wire = request.build(Method::Put);
        assert_eq!(wire.url, "https://openapi.etsy.com/v2/listings/1");
        assert_eq!(wire.query, None);
        assert_eq!(wire.body, Some(Body::Form("api_key=key&title=a%20b".into())));
    }

    #[test]
    fn test_plain_post_and_delete_carry_query() {
        let request = Request::new(&config(), "/listings", &params(json!({"title": "x"}))).unwrap();
        let post = request.build(Method::Post);
        assert_eq!(post.query.as_deref(), Some("api_key=key&title=x"));
        assert_eq!(post.body, None);

        let delete = request.build(Method::Delete);
        assert_eq!(delete.method, Method::Delete);
        assert_eq!(delete.query.as_deref(), Some("api_key=key&title=x"));
    }

    #[test]
    fn test_multipart_post_sends_form_fields_without_query() {
        let request = Request::new(
            &config(),
            "/listings/1/images",
            &params(json!({"multipart": true, "rank": 1, "tags": ["a", "b"]})),
        )
        .unwrap();
        assert!(request.is_multipart());

        let wire = request.build(Method::Post);
        assert_eq!(wire.query, None);
        assert_eq!(
            wire.body,
            Some(Body::Multipart(vec![
                ("api_key".into(), "key".into()),
                ("rank".into(), "1".into()),
                ("tags".into(), "a,b".into()),
            ]))
        );
    }

    #[test]
    fn test_secure_requests_are_signed_by_transport() {
        let request = Request::new(
            &config(),
            "/users/__SELF__",
            &params(json!({"access_token": "token", "access_secret": "secret"})),
        )
        .unwrap();
        let wire = request.build(Method::Get);
        assert_eq!(
            wire.signing,
            Signing::OAuth1 {
                token: "token".into(),
                secret: "secret".into()
            }
        );
        assert_eq!(wire.query.as_deref(), Some(""));
    }

    #[test]
    fn test_perform_hands_request_to_transport() {
        let transport = RecordingTransport::new(200, r#"{"count":0,"results":[]}"#);
        let request = Request::new(&config(), "/", &ParameterSet::new()).unwrap();

        let raw = request.get(&transport).unwrap();

        assert_eq!(raw.status, 200);
        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].full_url(), "https://openapi.etsy.com/v2/?api_key=key");
    }
}
