use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::config::Config;
use crate::error::{ErrorKind, Result};
use crate::params::ApiVersion;
use crate::transport::RawResponse;
use crate::{v2, v3};

// ---------------------------------------------------------------------------
// Normalised result
// ---------------------------------------------------------------------------

/// A single decoded record, or a page of them.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResult {
    Single(Value),
    Many(Vec<Value>),
}

impl NormalizedResult {
    pub fn len(&self) -> usize {
        match self {
            NormalizedResult::Single(_) => 1,
            NormalizedResult::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<Value> {
        match self {
            NormalizedResult::Single(v) => vec![v],
            NormalizedResult::Many(items) => items,
        }
    }

    pub fn as_single(&self) -> Option<&Value> {
        match self {
            NormalizedResult::Single(v) => Some(v),
            NormalizedResult::Many(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Classification table
// ---------------------------------------------------------------------------

static ALL_QUANTITIES_ARE_ZERO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)all quantities are zero").expect("valid regex"));
static BAD_REQUEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)bad request").expect("valid regex"));
static URI_TOO_LONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)URI Too Long").expect("valid regex"));
static OPERATION_IN_PROGRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Operation now in progress").expect("valid regex"));
static TEMPORARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)temporary").expect("valid regex"));

/// Conditions recognised from the body text alone, first match wins.
pub(crate) fn body_condition(text: &str) -> Option<ErrorKind> {
    if text == "oauth_problem=token_revoked" {
        Some(ErrorKind::OAuthTokenRevoked)
    } else if text.contains("Shop with PK shop_id") {
        Some(ErrorKind::MissingShopID)
    } else if text.contains("is not a valid user_id") {
        Some(ErrorKind::InvalidUserID)
    } else if text.contains("Temporary Etsy issue") {
        Some(ErrorKind::TemporaryIssue)
    } else if text.contains("Resource temporarily unavailable") {
        Some(ErrorKind::ResourceUnavailable)
    } else if text.contains("You have exceeded") {
        Some(ErrorKind::ExceededRateLimit)
    } else {
        None
    }
}

/// Status-driven kind for a v2 body that is not JSON.
pub(crate) fn v2_status_condition(status: u16, text: &str) -> ErrorKind {
    if status == 500 {
        ErrorKind::ServerError
    } else {
        common_status_condition(status, text)
    }
}

/// Status-driven kind for a failed v3 response.
pub(crate) fn v3_status_condition(status: u16, text: &str) -> ErrorKind {
    match status {
        500 => ErrorKind::ServerError,
        502 if TEMPORARY.is_match(text) => ErrorKind::TemporaryServerError,
        429 => ErrorKind::ExceededOverallRateLimit,
        400 if text.contains("no Shop for shop_id") => ErrorKind::ShopNotFound,
        _ => common_status_condition(status, text),
    }
}

fn is_resource_busy(status: u16, text: &str) -> bool {
    status == 409 && text.contains("resource is being edited by another process")
}

fn common_status_condition(status: u16, text: &str) -> ErrorKind {
    if is_resource_busy(status, text) {
        ErrorKind::ResourceIsBusy
    } else if status == 400 && ALL_QUANTITIES_ARE_ZERO.is_match(text) {
        ErrorKind::AllQuantitiesAreZero
    } else if BAD_REQUEST.is_match(text) {
        ErrorKind::RequestCannotBeRecognized
    } else if status == 414 && URI_TOO_LONG.is_match(text) {
        ErrorKind::UriTooLong
    } else if status == 503 && OPERATION_IN_PROGRESS.is_match(text) {
        ErrorKind::OperationInProgress
    } else {
        ErrorKind::InvalidResponseFormat
    }
}

/// `results` of a decoded body as a list; `null`/absent is empty.
pub(crate) fn results(hash: &Value) -> Vec<Value> {
    hash.get("results")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

pub(crate) fn results_len(hash: &Value) -> usize {
    hash.get("results")
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

// ---------------------------------------------------------------------------
// Version-agnostic response
// ---------------------------------------------------------------------------

/// A raw response paired with the classifier of the API generation that
/// produced it.
#[derive(Debug)]
pub enum Response {
    V2(v2::Response),
    V3(v3::Response),
}

impl Response {
    pub fn new(version: ApiVersion, raw: RawResponse, config: &Config) -> Self {
        match version {
            ApiVersion::V2 => Response::V2(v2::Response::new(raw, config)),
            ApiVersion::V3 => Response::V3(v3::Response::new(raw, config)),
        }
    }

    pub fn api_version(&self) -> ApiVersion {
        match self {
            Response::V2(_) => ApiVersion::V2,
            Response::V3(_) => ApiVersion::V3,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Response::V2(r) => r.code(),
            Response::V3(r) => r.code(),
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Response::V2(r) => r.body(),
            Response::V3(r) => r.body(),
        }
    }

    pub fn success(&self) -> bool {
        match self {
            Response::V2(r) => r.success(),
            Response::V3(r) => r.success(),
        }
    }

    pub fn to_hash(&self) -> Result<&Value> {
        match self {
            Response::V2(r) => r.to_hash(),
            Response::V3(r) => r.to_hash(),
        }
    }

    pub fn paginated(&self) -> Result<bool> {
        match self {
            Response::V2(r) => r.paginated(),
            Response::V3(r) => r.paginated(),
        }
    }

    pub fn count(&self) -> Result<usize> {
        match self {
            Response::V2(r) => r.count(),
            Response::V3(r) => r.count(),
        }
    }

    pub fn total(&self) -> Result<Option<u64>> {
        match self {
            Response::V2(r) => r.total(),
            Response::V3(r) => r.total(),
        }
    }

    pub fn result(&self) -> Result<NormalizedResult> {
        match self {
            Response::V2(r) => r.result(),
            Response::V3(r) => r.result(),
        }
    }
}
