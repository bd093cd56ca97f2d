//! Typed resource model for the Traffic Server ingress controller.
//!
//! Each resource kind has a parser from the Kubernetes JSON representation to a
//! typed entity. Parsers are pure: a document either yields a complete entity or
//! a [`ParseError`], never a partially filled one. Optional fields that are
//! absent take their unset value (empty string, zero, empty collection).
//!
//! On top of the entities sit the annotation [`policy`] accessors and [`tls`]
//! context construction.

#![forbid(unsafe_code)]

pub mod annotations;
mod endpoints;
mod error;
mod ingress;
mod json;
mod meta;
pub mod policy;
mod secret;
mod service;
pub mod tls;

pub use endpoints::{EndpointAddress, EndpointPort, EndpointSubset, Endpoints};
pub use error::ParseError;
pub use ingress::{Ingress, IngressBackend, IngressPath, IngressRule, IngressTls};
pub use meta::ObjectMeta;
pub use policy::{AuthSatisfy, AuthType, IngressPolicy, PolicyError};
pub use secret::Secret;
pub use service::{Protocol, Service, ServicePort, TargetPort};
pub use tls::{TlsContext, TlsError};

use serde::Serialize;
use serde_json::Value;
use tsingress_core::{Kind, ObjectKey};

/// Any entity the store holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Resource {
    Ingress(Ingress),
    Service(Service),
    Endpoints(Endpoints),
    Secret(Secret),
}

impl Resource {
    pub fn kind(&self) -> Kind {
        match self {
            Resource::Ingress(_) => Kind::Ingress,
            Resource::Service(_) => Kind::Service,
            Resource::Endpoints(_) => Kind::Endpoints,
            Resource::Secret(_) => Kind::Secret,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        match self {
            Resource::Ingress(r) => &r.meta,
            Resource::Service(r) => &r.meta,
            Resource::Endpoints(r) => &r.meta,
            Resource::Secret(r) => &r.meta,
        }
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }

    pub fn namespace(&self) -> &str {
        &self.meta().namespace
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey {
            kind: self.kind(),
            namespace: self.namespace().to_string(),
            name: self.name().to_string(),
        }
    }
}

impl From<Ingress> for Resource {
    fn from(r: Ingress) -> Self {
        Resource::Ingress(r)
    }
}

impl From<Service> for Resource {
    fn from(r: Service) -> Self {
        Resource::Service(r)
    }
}

impl From<Endpoints> for Resource {
    fn from(r: Endpoints) -> Self {
        Resource::Endpoints(r)
    }
}

impl From<Secret> for Resource {
    fn from(r: Secret) -> Self {
        Resource::Secret(r)
    }
}

/// Parses a JSON document of the given kind.
pub fn parse(kind: Kind, json: &str) -> Result<Resource, ParseError> {
    let doc: Value = serde_json::from_str(json)?;
    parse_value(kind, &doc)
}

pub fn parse_value(kind: Kind, doc: &Value) -> Result<Resource, ParseError> {
    Ok(match kind {
        Kind::Ingress => Ingress::parse(doc)?.into(),
        Kind::Service => Service::parse(doc)?.into(),
        Kind::Endpoints => Endpoints::parse(doc)?.into(),
        Kind::Secret => Secret::parse(doc)?.into(),
    })
}
