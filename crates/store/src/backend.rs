//! Name-based resolution of ingress references against a namespace.
//!
//! Ingresses name their Services and Secrets; nothing holds a pointer to them.
//! A reference that does not resolve right now is reported as [`Dangling`],
//! which is an ordinary state while the watch stream catches up.

use thiserror::Error;
use tsingress_resources::{EndpointAddress, IngressBackend, IngressPath, IngressTls, Service, ServicePort, TlsContext};

use crate::{Namespace, TlsLookupError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Dangling {
    #[error("service {service} not found")]
    NoService { service: String },
    #[error("service {service} has no port {port:?}")]
    NoPort { service: String, port: String },
    #[error("service {service} has no ready endpoints")]
    NoEndpoints { service: String },
    /// A `resource` backend; only Services can be routed to.
    #[error("backend {backend} is not a service")]
    NotAService { backend: String },
}

#[derive(Debug)]
pub enum Backend<'a> {
    Resolved(ResolvedBackend<'a>),
    /// An `ExternalName` service; traffic goes to `host` by DNS.
    External { service: &'a Service, host: &'a str },
    Dangling(Dangling),
}

#[derive(Debug)]
pub struct ResolvedBackend<'a> {
    pub service: &'a Service,
    pub port: &'a ServicePort,
    /// Ready addresses with the endpoint port matching `port`.
    pub addresses: Vec<(&'a EndpointAddress, u16)>,
}

impl Backend<'_> {
    pub fn is_dangling(&self) -> bool {
        matches!(self, Backend::Dangling(_))
    }
}

impl Namespace {
    pub fn resolve_backend(&self, path: &IngressPath) -> Backend<'_> {
        self.resolve(&path.backend)
    }

    /// Service by name, then its port by name or number, then the ready
    /// addresses of the same-named Endpoints.
    pub fn resolve(&self, backend: &IngressBackend) -> Backend<'_> {
        let Some((service_name, service_port)) = backend.as_service() else {
            return Backend::Dangling(Dangling::NotAService {
                backend: backend.to_string(),
            });
        };
        let Some(service) = self.get_service(service_name) else {
            return Backend::Dangling(Dangling::NoService {
                service: service_name.to_string(),
            });
        };

        if let Some(host) = service.external_name.as_deref() {
            return Backend::External { service, host };
        }

        let Some(port) = service.port_for_backend(service_port) else {
            return Backend::Dangling(Dangling::NoPort {
                service: service_name.to_string(),
                port: service_port.to_string(),
            });
        };

        let addresses: Vec<_> = self
            .get_endpoints(service_name)
            .map(|ep| ep.ready_addresses(&port.name).collect())
            .unwrap_or_default();
        if addresses.is_empty() {
            return Backend::Dangling(Dangling::NoEndpoints {
                service: service_name.to_string(),
            });
        }

        Backend::Resolved(ResolvedBackend {
            service,
            port,
            addresses,
        })
    }

    /// Builds a TLS context from the Secret an ingress TLS binding names. The
    /// Secret stays registered whatever the outcome.
    pub fn tls_context_for(&self, tls: &IngressTls) -> Result<TlsContext, TlsLookupError> {
        let secret = self
            .get_secret(&tls.secret_name)
            .ok_or_else(|| TlsLookupError::NoSecret {
                namespace: self.name().to_string(),
                name: tls.secret_name.clone(),
            })?;
        Ok(TlsContext::from_secret(secret)?)
    }
}
