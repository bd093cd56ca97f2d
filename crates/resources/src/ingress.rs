use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tsingress_core::Kind;

use crate::json::{array, opt_str, req_str};
use crate::meta::{check_kind, ObjectMeta};
use crate::ParseError;

/// Host/path routing to Services, with TLS bindings and policy annotations.
///
/// Services and Secrets are referenced by name only and resolved against the
/// owning namespace when read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ingress {
    pub meta: ObjectMeta,
    pub tls: Box<[IngressTls]>,
    pub rules: Box<[IngressRule]>,
    pub default_backend: Option<IngressBackend>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressTls {
    pub secret_name: String,
    pub hosts: Box<[String]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngressRule {
    /// Empty matches any host.
    pub host: String,
    pub paths: Box<[IngressPath]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngressPath {
    pub path: String,
    pub backend: IngressBackend,
}

/// Where a path (or the default route) sends traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IngressBackend {
    Service {
        name: String,
        /// A port number or a port name, as written in the manifest.
        port: String,
    },
    /// A typed object reference (`backend.resource`), usually a storage bucket
    /// or another controller's CRD. Traffic Server cannot route to it.
    Resource {
        #[serde(rename = "apiGroup")]
        api_group: String,
        kind: String,
        name: String,
    },
}

impl Ingress {
    pub fn parse(doc: &Value) -> Result<Self, ParseError> {
        check_kind(doc, Kind::Ingress)?;
        let meta = ObjectMeta::parse(doc)?;
        let spec = doc.get("spec").unwrap_or(&Value::Null);

        let tls = array(spec, "tls", "spec.tls")?
            .iter()
            .map(IngressTls::parse)
            .collect::<Result<_, _>>()?;
        let rules = array(spec, "rules", "spec.rules")?
            .iter()
            .map(IngressRule::parse)
            .collect::<Result<_, _>>()?;
        let default_backend = match spec.get("defaultBackend").or_else(|| spec.get("backend")) {
            None | Some(Value::Null) => None,
            Some(b) => Some(IngressBackend::parse(b)?),
        };

        Ok(Self {
            meta,
            tls,
            rules,
            default_backend,
        })
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn namespace(&self) -> &str {
        &self.meta.namespace
    }

    /// The TLS binding covering `host`, if any.
    pub fn tls_for_host(&self, host: &str) -> Option<&IngressTls> {
        self.tls.iter().find(|t| t.hosts.iter().any(|h| h == host))
    }
}

impl IngressTls {
    fn parse(v: &Value) -> Result<Self, ParseError> {
        let hosts = array(v, "hosts", "spec.tls[].hosts")?
            .iter()
            .map(|h| {
                h.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ParseError::invalid("spec.tls[].hosts", "expected a string"))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            secret_name: opt_str(v, "secretName", "spec.tls[].secretName")?,
            hosts,
        })
    }
}

impl IngressRule {
    fn parse(v: &Value) -> Result<Self, ParseError> {
        let http = v.get("http").unwrap_or(&Value::Null);
        let paths = array(http, "paths", "spec.rules[].http.paths")?
            .iter()
            .map(IngressPath::parse)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            host: opt_str(v, "host", "spec.rules[].host")?,
            paths,
        })
    }
}

impl IngressPath {
    fn parse(v: &Value) -> Result<Self, ParseError> {
        let backend = v
            .get("backend")
            .ok_or(ParseError::MissingField("spec.rules[].http.paths[].backend"))?;
        Ok(Self {
            path: opt_str(v, "path", "spec.rules[].http.paths[].path")?,
            backend: IngressBackend::parse(backend)?,
        })
    }
}

impl IngressBackend {
    pub fn service(name: impl Into<String>, port: impl Into<String>) -> Self {
        Self::Service {
            name: name.into(),
            port: port.into(),
        }
    }

    /// The Service name and port, unless this is a resource backend.
    pub fn as_service(&self) -> Option<(&str, &str)> {
        match self {
            Self::Service { name, port } => Some((name.as_str(), port.as_str())),
            Self::Resource { .. } => None,
        }
    }

    /// Accepts `serviceName`/`servicePort`, `service: { name, port: { number | name } }`
    /// and `resource: { apiGroup, kind, name }`.
    fn parse(v: &Value) -> Result<Self, ParseError> {
        if let Some(service) = v.get("service") {
            let port = service.get("port").unwrap_or(&Value::Null);
            let service_port = match port.get("number") {
                Some(n) => port_string(n, "backend.service.port.number")?,
                None => opt_str(port, "name", "backend.service.port.name")?,
            };
            return Ok(Self::service(
                req_str(service, "name", "backend.service.name")?,
                service_port,
            ));
        }

        if let Some(resource) = v.get("resource") {
            return Ok(Self::Resource {
                api_group: opt_str(resource, "apiGroup", "backend.resource.apiGroup")?,
                kind: req_str(resource, "kind", "backend.resource.kind")?,
                name: req_str(resource, "name", "backend.resource.name")?,
            });
        }

        let service_port = match v.get("servicePort") {
            None | Some(Value::Null) => String::new(),
            Some(p) => port_string(p, "backend.servicePort")?,
        };
        Ok(Self::service(
            req_str(v, "serviceName", "backend.serviceName")?,
            service_port,
        ))
    }
}

impl fmt::Display for IngressBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service { name, port } => write!(f, "{name}:{port}"),
            Self::Resource { api_group, kind, name } if api_group.is_empty() => write!(f, "{kind}/{name}"),
            Self::Resource { api_group, kind, name } => write!(f, "{kind}.{api_group}/{name}"),
        }
    }
}

fn port_string(v: &Value, field: &'static str) -> Result<String, ParseError> {
    match v {
        Value::Number(n) if n.is_u64() => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        other => Err(ParseError::invalid(field, format!("{other} is not a port"))),
    }
}
