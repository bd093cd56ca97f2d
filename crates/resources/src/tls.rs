//! TLS server contexts built from `kubernetes.io/tls` Secrets.

use std::fmt;
use std::io;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use thiserror::Error;
use tracing::{debug, warn};

use crate::Secret;

/// Secret data key holding the PEM certificate chain.
pub const CERT_KEY: &str = "tls.crt";
/// Secret data key holding the PEM private key.
pub const PRIVATE_KEY_KEY: &str = "tls.key";

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("secret {secret} has no {key} entry")]
    MissingKey { secret: String, key: &'static str },
    #[error("secret {secret}: {key} is not valid PEM")]
    Pem {
        secret: String,
        key: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("secret {secret}: tls.crt contains no certificate")]
    NoCertificate { secret: String },
    #[error("secret {secret}: tls.key contains no private key")]
    NoPrivateKey { secret: String },
    #[error("secret {secret}: certificate and key were rejected")]
    Rejected {
        secret: String,
        #[source]
        source: rustls::Error,
    },
}

/// A server-side TLS configuration. It owns copies of the key material, so it
/// stays usable after the Secret it was built from is replaced or removed.
#[derive(Clone)]
pub struct TlsContext {
    origin: String,
    certificates: Vec<CertificateDer<'static>>,
    config: Arc<ServerConfig>,
}

impl TlsContext {
    pub fn from_secret(secret: &Secret) -> Result<Self, TlsError> {
        let origin = format!("{}/{}", secret.namespace(), secret.name());
        if !secret.is_tls() {
            warn!(secret = %origin, secret_type = %secret.secret_type, "building TLS context from a non-TLS secret");
        }
        let entry = |key: &'static str| {
            secret.data.get(key).ok_or_else(|| TlsError::MissingKey {
                secret: origin.clone(),
                key,
            })
        };
        let cert_pem = entry(CERT_KEY)?;
        let key_pem = entry(PRIVATE_KEY_KEY)?;
        Self::from_pem(origin, cert_pem, key_pem)
    }

    /// `origin` names the material's source in errors and logs.
    pub fn from_pem(origin: impl Into<String>, cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, TlsError> {
        let origin = origin.into();

        let certificates = rustls_pemfile::certs(&mut &cert_pem[..])
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| TlsError::Pem {
                secret: origin.clone(),
                key: CERT_KEY,
                source,
            })?;
        if certificates.is_empty() {
            return Err(TlsError::NoCertificate { secret: origin });
        }

        let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut &key_pem[..])
            .map_err(|source| TlsError::Pem {
                secret: origin.clone(),
                key: PRIVATE_KEY_KEY,
                source,
            })?
            .ok_or_else(|| TlsError::NoPrivateKey {
                secret: origin.clone(),
            })?;

        let rejected = |source: rustls::Error| TlsError::Rejected {
            secret: origin.clone(),
            source,
        };
        let config = ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .map_err(rejected)?
            .with_no_client_auth()
            .with_single_cert(certificates.clone(), key)
            .map_err(rejected)?;

        debug!(secret = %origin, chain = certificates.len(), "built TLS context");
        Ok(Self {
            origin,
            certificates,
            config: Arc::new(config),
        })
    }

    /// `namespace/name` of the Secret the context was built from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// DER certificate chain, leaf first.
    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.certificates
    }

    pub fn server_config(&self) -> Arc<ServerConfig> {
        Arc::clone(&self.config)
    }
}

impl fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsContext")
            .field("origin", &self.origin)
            .field("certificates", &self.certificates.len())
            .finish_non_exhaustive()
    }
}
