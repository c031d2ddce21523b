//! Error types for the GetResponse client, plus the error-body decoder.
//!
//! # Design
//! Callers mostly care about two cases: the API answered with a structured
//! error (`Api`, carrying the upstream numeric code), or something came back
//! that could not be read at all (`Decoding`). Transport failures are kept
//! apart because they happen before any status code exists.
//!
//! Every variant has a stable string [`code`](GetResponseError::code) so
//! callers can match on one value regardless of kind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::TransportError;
use crate::types::null_as_default;

/// Marker for an error body that could not be decoded.
pub const ERROR_DECODING_ERROR: &str = "ERROR_DECODING_ERROR";
/// Marker for a success body that could not be decoded.
pub const ERROR_DECODING_RESPONSE: &str = "ERROR_DECODING_RESPONSE";
/// Marker for a request payload that could not be serialized.
pub const ERROR_ENCODING_REQUEST: &str = "ERROR_ENCODING_REQUEST";
/// Marker for a failure before any HTTP status was received.
pub const ERROR_TRANSPORT: &str = "ERROR_TRANSPORT";
/// Marker for a client configuration rejected before any request.
pub const ERROR_CONFIG: &str = "ERROR_CONFIG";

/// Errors returned by `ContactsApi` parsers and `GetResponseClient`.
#[derive(Debug, Error)]
pub enum GetResponseError {
    /// The response body was not valid JSON or did not have the expected
    /// shape. `body` holds the raw bytes as received.
    #[error("{marker}: could not decode body {:?}", String::from_utf8_lossy(.body))]
    Decoding {
        marker: &'static str,
        body: Vec<u8>,
        #[source]
        source: serde_json::Error,
    },

    /// The API returned a well-formed error payload.
    #[error("GetResponse API error {code} (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        payload: Box<ErrorPayload>,
    },

    /// The HTTP exchange did not complete.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The request payload could not be serialized to JSON.
    #[error("could not encode request body: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GetResponseError {
    /// Upstream code for API errors, or the fixed marker for every other kind.
    pub fn code(&self) -> &str {
        match self {
            GetResponseError::Decoding { marker, .. } => *marker,
            GetResponseError::Api { code, .. } => code.as_str(),
            GetResponseError::Transport(_) => ERROR_TRANSPORT,
            GetResponseError::Serialization(_) => ERROR_ENCODING_REQUEST,
            GetResponseError::Config(_) => ERROR_CONFIG,
        }
    }

    /// The documented catalog entry for an API error, if the code is known.
    pub fn api_error_code(&self) -> Option<ApiErrorCode> {
        match self {
            GetResponseError::Api { payload, .. } => ApiErrorCode::from_code(payload.code),
            _ => None,
        }
    }

    pub fn is_decoding(&self) -> bool {
        matches!(self, GetResponseError::Decoding { .. })
    }

    pub fn is_api(&self) -> bool {
        matches!(self, GetResponseError::Api { .. })
    }

    pub(crate) fn decoding_response(body: &[u8], source: serde_json::Error) -> Self {
        GetResponseError::Decoding {
            marker: ERROR_DECODING_RESPONSE,
            body: body.to_vec(),
            source,
        }
    }
}

/// Error body returned by the API on non-success statuses.
///
/// ```json
/// {
///   "httpStatus": 400,
///   "code": 1000,
///   "codeDescription": "General error of validation process",
///   "message": "Custom field invalid",
///   "moreInfo": "https://apidocs.getresponse.com/v3/errors/1000",
///   "context": ["Empty value. ID: y8jnp"],
///   "uuid": "5a42dd48-7f57-4919-9b32-391e594ce375"
/// }
/// ```
///
/// Only `code` is mandatory; the API omits the rest on some paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub more_info: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub context: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

impl ErrorPayload {
    /// Message with the context entries appended, comma-joined.
    pub fn full_message(&self) -> String {
        if self.context.is_empty() {
            self.message.clone()
        } else {
            format!("{} | context: {}", self.message, self.context.join(", "))
        }
    }
}

/// Turn the body of a non-success response into a typed error.
pub fn decode_error(status: u16, body: &[u8]) -> GetResponseError {
    match serde_json::from_slice::<ErrorPayload>(body) {
        Ok(payload) => GetResponseError::Api {
            status,
            code: payload.code.to_string(),
            message: payload.full_message(),
            payload: Box::new(payload),
        },
        Err(source) => {
            tracing::warn!(status, error = %source, "could not decode error body");
            GetResponseError::Decoding {
                marker: ERROR_DECODING_ERROR,
                body: body.to_vec(),
                source,
            }
        }
    }
}

/// Documented API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorCode {
    InternalError,
    ValidationError,
    RelatedResourceNotFound,
    Forbidden,
    InvalidParameterFormat,
    InvalidHash,
    MissingParameter,
    InvalidParameterType,
    InvalidParameterLength,
    ResourceAlreadyExists,
    ResourceInUse,
    ExternalError,
    MessageAlreadySending,
    MessageParsing,
    ResourceNotFound,
    AuthenticationFailure,
    RequestQuotaReached,
    TemporarilyBlocked,
    PermanentlyBlocked,
    IpBlocked,
    InvalidRequestHeaders,
}

impl ApiErrorCode {
    pub fn from_code(code: i64) -> Option<Self> {
        use ApiErrorCode::*;
        let known = match code {
            1 => InternalError,
            1000 => ValidationError,
            1001 => RelatedResourceNotFound,
            1002 => Forbidden,
            1003 => InvalidParameterFormat,
            1004 => InvalidHash,
            1005 => MissingParameter,
            1006 => InvalidParameterType,
            1007 => InvalidParameterLength,
            1008 => ResourceAlreadyExists,
            1009 => ResourceInUse,
            1010 => ExternalError,
            1011 => MessageAlreadySending,
            1012 => MessageParsing,
            1013 => ResourceNotFound,
            1014 => AuthenticationFailure,
            1015 => RequestQuotaReached,
            1016 => TemporarilyBlocked,
            1017 => PermanentlyBlocked,
            1018 => IpBlocked,
            1021 => InvalidRequestHeaders,
            _ => return None,
        };
        Some(known)
    }

    pub fn as_code(self) -> i64 {
        use ApiErrorCode::*;
        match self {
            InternalError => 1,
            ValidationError => 1000,
            RelatedResourceNotFound => 1001,
            Forbidden => 1002,
            InvalidParameterFormat => 1003,
            InvalidHash => 1004,
            MissingParameter => 1005,
            InvalidParameterType => 1006,
            InvalidParameterLength => 1007,
            ResourceAlreadyExists => 1008,
            ResourceInUse => 1009,
            ExternalError => 1010,
            MessageAlreadySending => 1011,
            MessageParsing => 1012,
            ResourceNotFound => 1013,
            AuthenticationFailure => 1014,
            RequestQuotaReached => 1015,
            TemporarilyBlocked => 1016,
            PermanentlyBlocked => 1017,
            IpBlocked => 1018,
            InvalidRequestHeaders => 1021,
        }
    }
}
