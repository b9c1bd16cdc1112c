use std::fmt;

use thiserror::Error;

/// Closed set of conditions a request or response can be classified into.
///
/// - `SecureConnectionRequired`: raised before any network call
/// - `OAuthTokenRevoked` … `ExceededRateLimit`: recognised from body text
/// - `ServerError` … `OperationInProgress`: recognised from status + body when
///   the body is not usable JSON (v2) or the status is not 2xx (v3)
/// - `InvalidResponseFormat`: anything else that failed classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SecureConnectionRequired,
    OAuthTokenRevoked,
    MissingShopID,
    InvalidUserID,
    TemporaryIssue,
    ResourceUnavailable,
    ExceededRateLimit,
    ExceededOverallRateLimit,
    ServerError,
    TemporaryServerError,
    ResourceIsBusy,
    AllQuantitiesAreZero,
    ShopNotFound,
    RequestCannotBeRecognized,
    UriTooLong,
    OperationInProgress,
    InvalidResponseFormat,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SecureConnectionRequired => "SecureConnectionRequired",
            ErrorKind::OAuthTokenRevoked => "OAuthTokenRevoked",
            ErrorKind::MissingShopID => "MissingShopID",
            ErrorKind::InvalidUserID => "InvalidUserID",
            ErrorKind::TemporaryIssue => "TemporaryIssue",
            ErrorKind::ResourceUnavailable => "ResourceUnavailable",
            ErrorKind::ExceededRateLimit => "ExceededRateLimit",
            ErrorKind::ExceededOverallRateLimit => "ExceededOverallRateLimit",
            ErrorKind::ServerError => "ServerError",
            ErrorKind::TemporaryServerError => "TemporaryServerError",
            ErrorKind::ResourceIsBusy => "ResourceIsBusy",
            ErrorKind::AllQuantitiesAreZero => "AllQuantitiesAreZero",
            ErrorKind::ShopNotFound => "ShopNotFound",
            ErrorKind::RequestCannotBeRecognized => "RequestCannotBeRecognized",
            ErrorKind::UriTooLong => "UriTooLong",
            ErrorKind::OperationInProgress => "OperationInProgress",
            ErrorKind::InvalidResponseFormat => "InvalidResponseFormat",
        }
    }

    /// Kinds that signal a transient condition on the remote side.
    pub fn is_temporary(&self) -> bool {
        matches!(
            self,
            ErrorKind::TemporaryIssue | ErrorKind::ResourceUnavailable | ErrorKind::ExceededRateLimit
        )
    }

    /// Kinds derived from the status code of a response whose body could not
    /// be used as a result.
    pub fn is_invalid_format(&self) -> bool {
        matches!(
            self,
            ErrorKind::ServerError
                | ErrorKind::TemporaryServerError
                | ErrorKind::ExceededOverallRateLimit
                | ErrorKind::ResourceIsBusy
                | ErrorKind::AllQuantitiesAreZero
                | ErrorKind::ShopNotFound
                | ErrorKind::RequestCannotBeRecognized
                | ErrorKind::UriTooLong
                | ErrorKind::OperationInProgress
                | ErrorKind::InvalidResponseFormat
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure: the kind plus the status code and the (effective)
/// body text it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} (HTTP {code}): {data}")]
pub struct ResponseError {
    pub kind: ErrorKind,
    pub code: u16,
    pub data: String,
}

impl ResponseError {
    pub fn new(kind: ErrorKind, code: u16, data: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            data: data.into(),
        }
    }
}

/// Error type for Etsy API operations.
///
/// - `SecureConnectionRequired`: `require_secure` was set without token/secret
/// - `Response`: a response classified into one of the [`ErrorKind`]s
/// - `RequestFailed`: the HTTP exchange itself failed
/// - `MissingAccessToken`: a v3 call was attempted without a bearer token
/// - `MissingSigner`: a secure v2 call was attempted without a request signer
/// - `InvalidParameter`: a control parameter could not be interpreted
/// - `Api`: non-2xx status surfaced by the transport when `raise_errors` is on
#[derive(Debug, Error)]
pub enum EtsyError {
    #[error(
        "Secure connection required. Please provide your OAuth credentials via \
         access_token and access_secret in the parameters"
    )]
    SecureConnectionRequired,

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("An access token is required for v3 requests")]
    MissingAccessToken,

    #[error("No request signer configured for secure v2 requests")]
    MissingSigner,

    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter { name: String, message: String },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
}

impl EtsyError {
    pub(crate) fn invalid_parameter(name: &str, message: impl fmt::Display) -> Self {
        EtsyError::InvalidParameter {
            name: name.to_string(),
            message: message.to_string(),
        }
    }

    /// The taxonomy kind, for errors that belong to it.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            EtsyError::SecureConnectionRequired => Some(ErrorKind::SecureConnectionRequired),
            EtsyError::Response(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Status code the error originated from, if any.
    pub fn code(&self) -> Option<u16> {
        match self {
            EtsyError::Response(e) => Some(e.code),
            EtsyError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Body text the error was classified from, if any.
    pub fn data(&self) -> Option<&str> {
        match self {
            EtsyError::Response(e) => Some(&e.data),
            EtsyError::Api { message, .. } => Some(message),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtsyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_error_exposes_kind_code_and_data() {
        let err: EtsyError = ResponseError::new(ErrorKind::ServerError, 500, "Server Error").into();
        assert_eq!(err.kind(), Some(ErrorKind::ServerError));
        assert_eq!(err.code(), Some(500));
        assert_eq!(err.data(), Some("Server Error"));
        assert_eq!(err.to_string(), "ServerError (HTTP 500): Server Error");
    }

    #[test]
    fn test_secure_connection_required_has_kind_but_no_code() {
        let err = EtsyError::SecureConnectionRequired;
        assert_eq!(err.kind(), Some(ErrorKind::SecureConnectionRequired));
        assert_eq!(err.code(), None);
        assert!(err.to_string().starts_with("Secure connection required"));
    }

    #[test]
    fn test_kind_groups() {
        assert!(ErrorKind::ResourceUnavailable.is_temporary());
        assert!(ErrorKind::ExceededRateLimit.is_temporary());
        assert!(!ErrorKind::ServerError.is_temporary());
        assert!(ErrorKind::UriTooLong.is_invalid_format());
        assert!(!ErrorKind::OAuthTokenRevoked.is_invalid_format());
    }
}
