use thiserror::Error;
use tsingress_core::Kind;

/// A resource document could not be turned into an entity. Nothing is
/// registered when this is returned.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} is not a JSON object")]
    NotAnObject(&'static str),
    #[error("missing required field {0}")]
    MissingField(&'static str),
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("unsupported port protocol {0:?}")]
    UnknownProtocol(String),
    #[error("expected a {expected} document, found kind {found:?}")]
    KindMismatch { expected: Kind, found: String },
    #[error("secret data {key:?} is not valid base64")]
    Base64 {
        key: String,
        #[source]
        source: base64::DecodeError,
    },
}

impl ParseError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
