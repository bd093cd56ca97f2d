use thiserror::Error;
use tsingress_resources::{ParseError, TlsError};

/// A watch event could not be applied. The cluster is unchanged.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Event(#[from] tsingress_core::Error),
    #[error("cannot parse {key}: {source}")]
    Parse {
        key: tsingress_core::ObjectKey,
        #[source]
        source: ParseError,
    },
}

#[derive(Debug, Error)]
pub enum TlsLookupError {
    #[error("secret {namespace}/{name} not found")]
    NoSecret { namespace: String, name: String },
    #[error(transparent)]
    Tls(#[from] TlsError),
}
