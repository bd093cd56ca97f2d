use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unknown resource kind: {0}")]
    UnknownKind(String),
    #[error("unknown watch event type: {0}")]
    UnknownEventType(String),
    #[error("malformed watch event: {0}")]
    MalformedEvent(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
