use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{EtsyError, Result};

/// Caller-supplied request parameters. Keys are sorted, so anything rendered
/// from a parameter set is stable for a given input.
pub type ParameterSet = Map<String, Value>;

// ---------------------------------------------------------------------------
// API generations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ApiVersion {
    #[default]
    V2,
    V3,
}

impl ApiVersion {
    /// Resolve an `api_version` tag. Anything other than `"v3"` means v2.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("v3") => ApiVersion::V3,
            _ => ApiVersion::V2,
        }
    }

    /// Resolve the version from the `api_version` entry of a parameter set.
    pub fn from_params(params: &ParameterSet) -> Self {
        Self::from_tag(params.get("api_version").and_then(Value::as_str))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V2 => "v2",
            ApiVersion::V3 => "v3",
        }
    }

    pub fn base_path(&self) -> &'static str {
        match self {
            ApiVersion::V2 => crate::v2::BASE_PATH,
            ApiVersion::V3 => crate::v3::BASE_PATH,
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Associations
// ---------------------------------------------------------------------------

pub const DEFAULT_ASSOCIATION_LIMIT: u64 = 25;
pub const DEFAULT_ASSOCIATION_OFFSET: u64 = 0;

/// "Include related resource" directive understood by the v2 API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssociationSpec {
    pub resource: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
}

impl AssociationSpec {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            fields: None,
            limit: None,
            offset: None,
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<OneOrMany>::deserialize(deserializer)?.map(|v| match v {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    }))
}

/// Normalise an `includes` value into association specs.
///
/// Accepts a comma-separated string, a single association object, or a
/// sequence mixing resource names and association objects.
pub fn parse_includes(value: Option<&Value>) -> Result<Vec<AssociationSpec>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(s
            .split(',')
            .filter(|r| !r.is_empty())
            .map(AssociationSpec::new)
            .collect()),
        Some(Value::Array(items)) => items.iter().map(parse_association).collect(),
        Some(obj @ Value::Object(_)) => Ok(vec![parse_association(obj)?]),
        Some(other) => Err(EtsyError::invalid_parameter(
            "includes",
            format!("expected a string, object or sequence, got {other}"),
        )),
    }
}

fn parse_association(value: &Value) -> Result<AssociationSpec> {
    match value {
        Value::String(s) => Ok(AssociationSpec::new(s.as_str())),
        Value::Object(_) => serde_json::from_value(value.clone())
            .map_err(|e| EtsyError::invalid_parameter("includes", e)),
        other => Err(EtsyError::invalid_parameter(
            "includes",
            format!("unsupported association {other}"),
        )),
    }
}

// ---------------------------------------------------------------------------
// Control parameters
// ---------------------------------------------------------------------------

/// Keys that configure the request rather than travel on the wire.
pub const CONTROL_KEYS: [&str; 8] = [
    "api_version",
    "access_token",
    "access_secret",
    "require_secure",
    "includes",
    "multipart",
    "oauth_client_options",
    "oauth_token_options",
];

/// The caller's parameters split into control settings and wire parameters.
///
/// Built from a copy; the caller's mapping is never touched.
#[derive(Debug, Clone, Default)]
pub(crate) struct CommonParams {
    pub token: Option<String>,
    pub secret: Option<String>,
    pub require_secure: bool,
    pub includes: Option<Value>,
    pub multipart: bool,
    pub oauth_client_options: Option<Value>,
    pub oauth_token_options: Option<Value>,
    pub parameters: ParameterSet,
}

impl CommonParams {
    pub fn extract(config: &Config, parameters: &ParameterSet) -> Self {
        let mut params = parameters.clone();
        params.remove("api_version");

        let token = take_string(&mut params, "access_token")
            .or_else(|| config.credentials.access_token.clone());
        let secret = take_string(&mut params, "access_secret")
            .or_else(|| config.credentials.access_secret.clone());

        Self {
            token,
            secret,
            require_secure: take_flag(&mut params, "require_secure"),
            includes: take_present(&mut params, "includes"),
            multipart: take_flag(&mut params, "multipart"),
            oauth_client_options: take_present(&mut params, "oauth_client_options"),
            oauth_token_options: take_present(&mut params, "oauth_token_options"),
            parameters: params,
        }
    }
}

/// `null` and `false` are unset, everything else counts as set.
pub(crate) fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

fn take_present(params: &mut ParameterSet, key: &str) -> Option<Value> {
    params.remove(key).filter(|v| !v.is_null())
}

fn take_flag(params: &mut ParameterSet, key: &str) -> bool {
    params.remove(key).is_some_and(|v| is_truthy(&v))
}

fn take_string(params: &mut ParameterSet, key: &str) -> Option<String> {
    match take_present(params, key)? {
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
