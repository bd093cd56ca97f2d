use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use tsingress_core::{HashTable, Kind};

use crate::json::{array, opt_str, port, string_map};
use crate::meta::{check_kind, ObjectMeta};
use crate::ParseError;

pub(crate) const TYPE_EXTERNAL_NAME: &str = "ExternalName";

/// Port protocols the proxy can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Protocol {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
}

impl FromStr for Protocol {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, ParseError> {
        match s {
            "TCP" => Ok(Protocol::Tcp),
            "UDP" => Ok(Protocol::Udp),
            other => Err(ParseError::UnknownProtocol(other.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        })
    }
}

/// Reads `protocol`, defaulting to TCP when absent.
pub(crate) fn protocol(v: &Value, field: &'static str) -> Result<Protocol, ParseError> {
    match v.get("protocol") {
        None | Some(Value::Null) => Ok(Protocol::Tcp),
        Some(Value::String(s)) => s.parse(),
        Some(_) => Err(ParseError::invalid(field, "expected a string")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TargetPort {
    Number(u16),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    pub name: String,
    pub port: u16,
    pub target_port: TargetPort,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub meta: ObjectMeta,
    pub service_type: String,
    pub cluster_ip: String,
    pub session_affinity: String,
    pub external_name: Option<String>,
    pub selector: HashTable<String>,
    /// Keyed by port name; a single unnamed port is keyed by `""`.
    pub ports: HashTable<ServicePort>,
}

impl Service {
    pub fn parse(doc: &Value) -> Result<Self, ParseError> {
        check_kind(doc, Kind::Service)?;
        let meta = ObjectMeta::parse(doc)?;
        let spec = doc.get("spec").unwrap_or(&Value::Null);

        let items = array(spec, "ports", "spec.ports")?;
        let mut ports = HashTable::new(items.len());
        for item in items {
            let p = ServicePort::parse(item)?;
            if ports.contains_key(&p.name) {
                return Err(ParseError::invalid("spec.ports[].name", format!("duplicate port name {:?}", p.name)));
            }
            ports.insert(&p.name.clone(), p);
        }

        let external_name = opt_str(spec, "externalName", "spec.externalName")?;
        let service_type = opt_str(spec, "type", "spec.type")?;
        let session_affinity = opt_str(spec, "sessionAffinity", "spec.sessionAffinity")?;

        Ok(Self {
            meta,
            service_type: if service_type.is_empty() { "ClusterIP".into() } else { service_type },
            cluster_ip: opt_str(spec, "clusterIP", "spec.clusterIP")?,
            session_affinity: if session_affinity.is_empty() { "None".into() } else { session_affinity },
            external_name: (!external_name.is_empty()).then_some(external_name),
            selector: string_map(spec, "selector", "spec.selector")?,
            ports,
        })
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn namespace(&self) -> &str {
        &self.meta.namespace
    }

    pub fn is_external_name(&self) -> bool {
        self.service_type == TYPE_EXTERNAL_NAME
    }

    pub fn find_port(&self, name: &str, protocol: Protocol) -> Option<&ServicePort> {
        self.ports.get(name).filter(|p| p.protocol == protocol)
    }

    /// Resolves an ingress `servicePort`, which is either a port name or a port number.
    pub fn port_for_backend(&self, service_port: &str) -> Option<&ServicePort> {
        if let Some(p) = self.find_port(service_port, Protocol::Tcp) {
            return Some(p);
        }
        let number: u16 = service_port.parse().ok()?;
        self.ports
            .values()
            .find(|p| p.port == number && p.protocol == Protocol::Tcp)
    }
}

impl ServicePort {
    fn parse(v: &Value) -> Result<Self, ParseError> {
        let number = port(
            v.get("port").ok_or(ParseError::MissingField("spec.ports[].port"))?,
            "spec.ports[].port",
        )?;
        let target_port = match v.get("targetPort") {
            None | Some(Value::Null) => TargetPort::Number(number),
            Some(Value::String(s)) => TargetPort::Name(s.clone()),
            Some(n) => TargetPort::Number(port(n, "spec.ports[].targetPort")?),
        };
        Ok(Self {
            name: opt_str(v, "name", "spec.ports[].name")?,
            port: number,
            target_port,
            protocol: protocol(v, "spec.ports[].protocol")?,
        })
    }
}
