use serde::Serialize;
use serde_json::Value;
use tsingress_core::{HashTable, Kind};

use crate::json::{object, opt_str, req_str, string_map};
use crate::ParseError;

/// Object metadata common to every resource kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    pub resource_version: String,
    /// Unix seconds; 0 when absent or unparsable.
    pub creation_ts: i64,
    pub labels: HashTable<String>,
    pub annotations: HashTable<String>,
}

impl ObjectMeta {
    pub(crate) fn parse(doc: &Value) -> Result<Self, ParseError> {
        let meta = doc.get("metadata").ok_or(ParseError::MissingField("metadata"))?;
        object(meta, "metadata")?;

        let creation_ts = meta
            .get("creationTimestamp")
            .and_then(Value::as_str)
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.timestamp())
            .unwrap_or(0);

        Ok(Self {
            name: req_str(meta, "name", "metadata.name")?,
            namespace: req_str(meta, "namespace", "metadata.namespace")?,
            resource_version: opt_str(meta, "resourceVersion", "metadata.resourceVersion")?,
            creation_ts,
            labels: string_map(meta, "labels", "metadata.labels")?,
            annotations: string_map(meta, "annotations", "metadata.annotations")?,
        })
    }
}

/// Rejects documents whose own `kind` names a different resource. Documents
/// without a `kind` (list items, for instance) are accepted.
pub(crate) fn check_kind(doc: &Value, expected: Kind) -> Result<(), ParseError> {
    object(doc, "document")?;
    match doc.get("kind").and_then(Value::as_str) {
        Some(found) if found != expected.as_str() => Err(ParseError::KindMismatch {
            expected,
            found: found.to_string(),
        }),
        _ => Ok(()),
    }
}
