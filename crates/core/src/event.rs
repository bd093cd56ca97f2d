use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Resource kinds tracked by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    Ingress,
    Service,
    Endpoints,
    Secret,
}

impl Kind {
    pub const ALL: [Kind; 4] = [Kind::Ingress, Kind::Service, Kind::Endpoints, Kind::Secret];

    /// The Kubernetes `kind` string.
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Ingress => "Ingress",
            Kind::Service => "Service",
            Kind::Endpoints => "Endpoints",
            Kind::Secret => "Secret",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Kind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::UnknownKind(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventKind {
    Applied,
    Deleted,
}

/// Identity of an object within the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub kind: Kind,
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// One observation from the watch stream: the full object on add/modify, or
/// just its identity on delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEvent {
    pub key: ObjectKey,
    pub kind: EventKind,
    /// Complete object state for `Applied`; `Value::Null` for `Deleted`.
    pub raw: Value,
}

impl WatchEvent {
    /// Builds an `Applied` event, reading the object's identity from its metadata.
    pub fn applied(kind: Kind, raw: Value) -> Result<Self> {
        let meta = raw
            .get("metadata")
            .ok_or(Error::MalformedEvent("object has no metadata"))?;
        let field = |name: &'static str, missing: &'static str| {
            meta.get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(Error::MalformedEvent(missing))
        };
        let key = ObjectKey {
            kind,
            namespace: field("namespace", "object has no metadata.namespace")?,
            name: field("name", "object has no metadata.name")?,
        };
        Ok(Self {
            key,
            kind: EventKind::Applied,
            raw,
        })
    }

    pub fn deleted(kind: Kind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: ObjectKey {
                kind,
                namespace: namespace.into(),
                name: name.into(),
            },
            kind: EventKind::Deleted,
            raw: Value::Null,
        }
    }

    /// Decodes a Kubernetes watch envelope: `{"type": "ADDED", "object": {...}}`.
    /// The resource kind is taken from the object's own `kind` field.
    pub fn from_wire(envelope: &Value) -> Result<Self> {
        let ty = envelope
            .get("type")
            .and_then(Value::as_str)
            .ok_or(Error::MalformedEvent("envelope has no type"))?;
        let object = envelope
            .get("object")
            .ok_or(Error::MalformedEvent("envelope has no object"))?;
        let kind: Kind = object
            .get("kind")
            .and_then(Value::as_str)
            .ok_or(Error::MalformedEvent("object has no kind"))?
            .parse()?;

        match ty {
            "ADDED" | "MODIFIED" => Self::applied(kind, object.clone()),
            "DELETED" => {
                let Self { key, .. } = Self::applied(kind, object.clone())?;
                Ok(Self::deleted(kind, key.namespace, key.name))
            }
            other => Err(Error::UnknownEventType(other.to_string())),
        }
    }
}
