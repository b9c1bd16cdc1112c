#[cfg(test)]
use std::cell::Cell;

use once_cell::unsync::OnceCell;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ErrorKind, ResponseError, Result};
use crate::response::{body_condition, results, results_len, v3_status_condition, NormalizedResult};
use crate::transport::RawResponse;

/// Classifier for v3 responses.
///
/// Any non-2xx status is a failure. Body-text conditions apply to the error
/// text only: the `error` field of a JSON envelope, or the whole body of a
/// failed response. A successful record is never matched against them.
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

    /// Text the error conditions are matched against: the `error` field of a
    /// JSON envelope, any other JSON body re-serialized, a non-JSON body as is.
    pub fn error_data(&self) -> String {
        match self.json() {
            Some(value) => match value.get("error") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => value.to_string(),
            },
            None => self.body().to_string(),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ResponseError> {
        self.validation
            .get_or_init(|| match self.classify() {
                Some(kind) => {
                    warn!(version = "v3", %kind, status = self.code(), "error response");
                    Err(self.error(kind))
                }
                None => Ok(()),
            })
            .clone()
    }

    fn classify(&self) -> Option<ErrorKind> {
        let failed = self.json().is_none() || !self.success();
        let enveloped = self.json().is_some_and(|v| v.get("error").is_some());
        if !failed && !enveloped {
            return None;
        }

        let data = self.error_data();
        body_condition(&data).or_else(|| failed.then(|| v3_status_condition(self.code(), &data)))
    }

    pub fn to_hash(&self) -> Result<&Value> {
        self.validate()?;
        Ok(self
            .json()
            .ok_or_else(|| self.error(ErrorKind::InvalidResponseFormat))?)
    }

    /// Collections carry a `count`; single entities do not.
    pub fn paginated(&self) -> Result<bool> {
        Ok(self.to_hash()?.get("count").is_some())
    }

    pub fn count(&self) -> Result<usize> {
        if !self.paginated()? {
            return Ok(1);
        }
        Ok(results_len(self.to_hash()?))
    }

    pub fn total(&self) -> Result<Option<u64>> {
        Ok(self.to_hash()?.get("count").and_then(Value::as_u64))
    }

    pub fn result(&self) -> Result<NormalizedResult> {
        if self.success() {
            let hash = self.to_hash()?;
            let result = if self.paginated()? {
                NormalizedResult::Many(results(hash))
            } else {
                NormalizedResult::Single(hash.clone())
            };
            debug!(version = "v3", status = self.code(), records = result.len(), "classified response");
            return Ok(result);
        }

        if self.silent_errors {
            debug!(version = "v3", status = self.code(), "suppressing error response");
            return Ok(NormalizedResult::Many(Vec::new()));
        }

        self.validate()?;
        warn!(version = "v3", status = self.code(), "unsuccessful response without a known condition");
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
        ResponseError::new(kind, self.code(), self.error_data())
    }

    #[cfg(test)]
    pub(crate) fn decode_count(&self) -> usize {
        self.decodes.get()
    }
}
