#[cfg(test)]
use std::cell::Cell;

use once_cell::unsync::OnceCell;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ErrorKind, ResponseError, Result};
use crate::params::is_truthy;
use crate::response::{body_condition, results, results_len, v2_status_condition, NormalizedResult};
use crate::transport::RawResponse;

/// Classifier for v2 responses.
///
/// Body-text conditions are checked regardless of status; the status only
/// matters once the body turns out not to be JSON. The body is decoded and
/// classified at most once.
#[derive(Debug)]
pub struct Response {
    raw: RawResponse,
    silent_errors: bool,
    json: OnceCell<Option<Value>>,
    validation: OnceCell<std::result::Result<(), ResponseError>>,
    #[cfg(test)]
    decodes: Cell<usize>,
}

impl Response {
    pub fn new(raw: RawResponse, config: &Config) -> Self {
        Self::with_silent_errors(raw, config.silent_errors)
    }

    pub fn with_silent_errors(raw: RawResponse, silent_errors: bool) -> Self {
        Self {
            raw,
            silent_errors,
            json: OnceCell::new(),
            validation: OnceCell::new(),
            #[cfg(test)]
            decodes: Cell::new(0),
        }
    }

    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }

    pub fn code(&self) -> u16 {
        self.raw.status
    }

    pub fn body(&self) -> &str {
        &self.raw.body
    }

    pub fn success(&self) -> bool {
        self.raw.is_success()
    }

    /// Fail with the first matching error condition, if any.
    pub fn validate(&self) -> std::result::Result<(), ResponseError> {
        self.validation
            .get_or_init(|| match self.classify() {
                Some(kind) => {
                    warn!(version = "v2", %kind, status = self.code(), "error response");
                    Err(self.error(kind))
                }
                None => Ok(()),
            })
            .clone()
    }

    fn classify(&self) -> Option<ErrorKind> {
        let data = self.body();
        body_condition(data).or_else(|| {
            self.json()
                .is_none()
                .then(|| v2_status_condition(self.code(), data))
        })
    }

    /// The decoded body, after validation.
    pub fn to_hash(&self) -> Result<&Value> {
        self.validate()?;
        Ok(self
            .json()
            .ok_or_else(|| self.error(ErrorKind::InvalidResponseFormat))?)
    }

    pub fn paginated(&self) -> Result<bool> {
        Ok(self.to_hash()?.get("pagination").is_some_and(is_truthy))
    }

    /// Records in this page when paginated, the `count` field otherwise.
    pub fn count(&self) -> Result<usize> {
        let hash = self.to_hash()?;
        if self.paginated()? {
            Ok(results_len(hash))
        } else {
            let count = hash.get("count").and_then(Value::as_u64).unwrap_or(0);
            Ok(usize::try_from(count).unwrap_or(usize::MAX))
        }
    }

    /// The raw `count` field: the size of the whole collection.
    pub fn total(&self) -> Result<Option<u64>> {
        Ok(self.to_hash()?.get("count").and_then(Value::as_u64))
    }

    pub fn result(&self) -> Result<NormalizedResult> {
        if self.success() {
            let mut records = results(self.to_hash()?);
            let result = if self.count()? == 1 {
                NormalizedResult::Single(if records.is_empty() {
                    Value::Null
                } else {
                    records.swap_remove(0)
                })
            } else {
                NormalizedResult::Many(records)
            };
            debug!(version = "v2", status = self.code(), records = result.len(), "classified response");
            return Ok(result);
        }

        if self.silent_errors {
            debug!(version = "v2", status = self.code(), "suppressing error response");
            return Ok(NormalizedResult::Many(Vec::new()));
        }

        self.validate()?;
        warn!(version = "v2", status = self.code(), "unsuccessful response without a known condition");
        Err(self.error(ErrorKind::InvalidResponseFormat).into())
    }

    fn json(&self) -> Option<&Value> {
        self.json
            .get_or_init(|| {
                #[cfg(test)]
                self.decodes.set(self.decodes.get() + 1);
                serde_json::from_str(&self.raw.body).ok()
            })
            .as_ref()
    }

    fn error(&self, kind: ErrorKind) -> ResponseError {
        ResponseError::new(kind, self.code(), self.body())
    }

    #[cfg(test)]
    pub(crate) fn decode_count(&self) -> usize {
        self.decodes.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtsyError;
    use crate::response::testing::capture_logs;
    use serde_json::json;

    fn response(status: u16, body: &str) -> Response {
        Response::with_silent_errors(RawResponse::new(status, body), false)
    }

    fn kind_of(err: EtsyError) -> ErrorKind {
        err.kind().expect("classified error")
    }

    #[test]
    fn test_total() {
        assert_eq!(response(200, r#"{ "count": 42 }"#).total().unwrap(), Some(42));
    }

    #[test]
    fn test_decode_json_to_hash() {
        assert_eq!(
            response(200, r#"{ "foo":"bar" }"#).to_hash().unwrap(),
            &json!({"foo": "bar"})
        );
    }

    #[test]
    fn test_body_is_decoded_once() {
        let r = response(200, r#"{ "count": 1, "results": [{"id": 1}] }"#);
        for _ in 0..2 {
            r.to_hash().unwrap();
            r.count().unwrap();
            r.total().unwrap();
            r.result().unwrap();
        }
        assert_eq!(r.decode_count(), 1);
    }

    #[test]
    fn test_invalid_body_is_decoded_once_too() {
        let r = response(500, "Server Error");
        assert!(r.to_hash().is_err());
        assert!(r.result().is_err());
        assert_eq!(r.decode_count(), 1);
    }

    #[test]
    fn test_count_when_not_paginated() {
        let r = response(200, r#"{ "count": 1 }"#);
        assert_eq!(r.count().unwrap(), 1);
        assert!(!r.paginated().unwrap());
    }

    #[test]
    fn test_count_when_paginated() {
        let r = response(200, r#"{ "count": 100, "results": [{},{}], "pagination": {} }"#);
        assert!(r.paginated().unwrap());
        assert_eq!(r.count().unwrap(), 2);
        assert_eq!(r.total().unwrap(), Some(100));
    }

    #[test]
    fn test_count_zero_when_paginated_results_are_null() {
        let r = response(200, r#"{ "count": 100, "results": null, "pagination": {} }"#);
        assert_eq!(r.count().unwrap(), 0);
        assert_eq!(r.result().unwrap(), NormalizedResult::Many(vec![]));
    }

    #[test]
    fn test_multiple_results_are_returned_as_list() {
        let r = response(200, r#"{ "count": 2, "results": ["one", "two"] }"#);
        assert_eq!(
            r.result().unwrap(),
            NormalizedResult::Many(vec![json!("one"), json!("two")])
        );
    }

    #[test]
    fn test_single_result_is_unwrapped() {
        let r = response(200, r#"{ "count": 1, "results": ["foo"] }"#);
        assert_eq!(r.result().unwrap(), NormalizedResult::Single(json!("foo")));
    }

    #[test]
    fn test_raw_body_is_available() {
        assert_eq!(response(200, "I am not JSON").body(), "I am not JSON");
    }

    #[test]
    fn test_server_error() {
        let err = response(500, "Server Error").result().unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ServerError));
        assert_eq!(err.code(), Some(500));
        assert_eq!(err.data(), Some("Server Error"));
    }

    #[test]
    fn test_non_json_status_conditions() {
        let busy = "The resource is being edited by another process. Please try again in a few moments.";
        assert_eq!(kind_of(response(409, busy).result().unwrap_err()), ErrorKind::ResourceIsBusy);
        assert_eq!(
            kind_of(response(400, "_object: All quantities are zero").result().unwrap_err()),
            ErrorKind::AllQuantitiesAreZero
        );
        assert_eq!(
            kind_of(
                response(400, "<HTML><HEAD> <TITLE>Bad Request</TITLE> </HEAD></HTML>")
                    .result()
                    .unwrap_err()
            ),
            ErrorKind::RequestCannotBeRecognized
        );
        assert_eq!(
            kind_of(response(414, "Error: URI Too Long").result().unwrap_err()),
            ErrorKind::UriTooLong
        );
        assert_eq!(
            kind_of(
                response(503, "<title>503 Operation now in progress</title>")
                    .result()
                    .unwrap_err()
            ),
            ErrorKind::OperationInProgress
        );
        let err = response(515, "Random text").result().unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidResponseFormat));
        assert_eq!(err.data(), Some("Random text"));
    }

    #[test]
    fn test_body_conditions_raise_from_to_hash_regardless_of_status() {
        let cases = [
            ("oauth_problem=token_revoked", ErrorKind::OAuthTokenRevoked),
            ("something Shop with PK shop_id something", ErrorKind::MissingShopID),
            ("'someguy' is not a valid user_id", ErrorKind::InvalidUserID),
            ("something Temporary Etsy issue something", ErrorKind::TemporaryIssue),
            (
                "something Resource temporarily unavailable something",
                ErrorKind::ResourceUnavailable,
            ),
            (
                "something You have exceeded your API limit something",
                ErrorKind::ExceededRateLimit,
            ),
        ];
        for (body, kind) in cases {
            assert_eq!(kind_of(response(200, body).to_hash().unwrap_err()), kind, "{body}");
        }
    }

    #[test]
    fn test_success_is_status_driven() {
        assert!(response(200, "").success());
        assert!(response(201, "").success());
        assert!(!response(404, "").success());
        assert!(!response(500, "").success());
        assert_eq!(response(400, "").code(), 400);
    }

    #[test]
    fn test_silent_errors_return_empty_result_but_to_hash_still_fails() {
        let r = Response::with_silent_errors(RawResponse::new(500, "Server Error"), true);
        assert_eq!(r.result().unwrap(), NormalizedResult::Many(vec![]));
        assert_eq!(kind_of(r.to_hash().unwrap_err()), ErrorKind::ServerError);
    }

    #[test]
    fn test_unsuccessful_json_without_known_condition() {
        let r = response(404, r#"{"error": "not here"}"#);
        assert!(r.to_hash().is_ok());
        assert_eq!(kind_of(r.result().unwrap_err()), ErrorKind::InvalidResponseFormat);
    }

    #[test]
    fn test_silent_errors_follow_config() {
        let config = Config::new("key").with_silent_errors(true);
        let r = Response::new(RawResponse::new(503, "down"), &config);
        assert!(r.result().unwrap().is_empty());
    }

    #[test]
    fn test_error_is_logged_once_per_response() {
        let r = response(500, "Server Error");
        let logs = capture_logs(|| {
            assert!(r.to_hash().is_err());
            assert!(r.paginated().is_err());
            assert!(r.count().is_err());
            assert!(r.total().is_err());
            assert!(r.result().is_err());
        });
        assert_eq!(logs.matches("error response").count(), 1, "{logs}");
    }

    #[test]
    fn test_oversized_count_saturates() {
        let r = response(200, r#"{ "count": 18446744073709551615 }"#);
        assert_eq!(r.total().unwrap(), Some(u64::MAX));
        assert_eq!(
            r.count().unwrap(),
            usize::try_from(u64::MAX).unwrap_or(usize::MAX)
        );
    }
}
