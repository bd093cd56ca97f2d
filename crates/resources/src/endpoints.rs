use serde::Serialize;
use serde_json::Value;
use tsingress_core::{HashTable, Kind};

use crate::json::{array, opt_port, opt_str, req_str};
use crate::meta::{check_kind, ObjectMeta};
use crate::service::{protocol, Protocol};
use crate::ParseError;

/// The live addresses backing the same-named Service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Endpoints {
    pub meta: ObjectMeta,
    pub subsets: Box<[EndpointSubset]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSubset {
    pub addresses: Box<[EndpointAddress]>,
    pub not_ready_addresses: Box<[EndpointAddress]>,
    /// Keyed by port name.
    pub ports: HashTable<EndpointPort>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointAddress {
    pub ip: String,
    pub node_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointPort {
    pub name: String,
    pub port: u16,
    pub protocol: Protocol,
}

impl Endpoints {
    pub fn parse(doc: &Value) -> Result<Self, ParseError> {
        check_kind(doc, Kind::Endpoints)?;
        let meta = ObjectMeta::parse(doc)?;
        let subsets = array(doc, "subsets", "subsets")?
            .iter()
            .map(EndpointSubset::parse)
            .collect::<Result<_, _>>()?;
        Ok(Self { meta, subsets })
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn namespace(&self) -> &str {
        &self.meta.namespace
    }

    /// Ready `(address, port)` pairs for the named port, across all subsets.
    pub fn ready_addresses<'a>(&'a self, port_name: &'a str) -> impl Iterator<Item = (&'a EndpointAddress, u16)> + 'a {
        self.subsets.iter().flat_map(move |s| {
            let port = s.ports.get(port_name).map(|p| p.port);
            s.addresses.iter().filter_map(move |a| port.map(|p| (a, p)))
        })
    }
}

impl EndpointSubset {
    fn parse(v: &Value) -> Result<Self, ParseError> {
        let addresses = |key: &str, field: &'static str| -> Result<Box<[EndpointAddress]>, ParseError> {
            array(v, key, field)?
                .iter()
                .map(EndpointAddress::parse)
                .collect()
        };

        let items = array(v, "ports", "subsets[].ports")?;
        let mut ports = HashTable::new(items.len());
        for item in items {
            let p = EndpointPort {
                name: opt_str(item, "name", "subsets[].ports[].name")?,
                port: opt_port(item, "port", "subsets[].ports[].port")?,
                protocol: protocol(item, "subsets[].ports[].protocol")?,
            };
            if ports.contains_key(&p.name) {
                return Err(ParseError::invalid(
                    "subsets[].ports[].name",
                    format!("duplicate port name {:?}", p.name),
                ));
            }
            ports.insert(&p.name.clone(), p);
        }

        Ok(Self {
            addresses: addresses("addresses", "subsets[].addresses")?,
            not_ready_addresses: addresses("notReadyAddresses", "subsets[].notReadyAddresses")?,
            ports,
        })
    }
}

impl EndpointAddress {
    fn parse(v: &Value) -> Result<Self, ParseError> {
        let node_name = opt_str(v, "nodeName", "subsets[].addresses[].nodeName")?;
        Ok(Self {
            ip: req_str(v, "ip", "subsets[].addresses[].ip")?,
            node_name: (!node_name.is_empty()).then_some(node_name),
        })
    }
}
