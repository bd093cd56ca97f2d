use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tsingress_core::{HashTable, Kind};

use crate::json::{object, opt_str};
use crate::meta::{check_kind, ObjectMeta};
use crate::ParseError;

pub(crate) const TYPE_TLS: &str = "kubernetes.io/tls";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    pub meta: ObjectMeta,
    pub secret_type: String,
    /// Decoded values. Only the key names are serialized.
    #[serde(serialize_with = "data_keys")]
    pub data: HashTable<Vec<u8>>,
}

impl Secret {
    pub fn parse(doc: &Value) -> Result<Self, ParseError> {
        check_kind(doc, Kind::Secret)?;
        let meta = ObjectMeta::parse(doc)?;

        let data = match doc.get("data") {
            None | Some(Value::Null) => HashTable::new(1),
            Some(d) => {
                let map = object(d, "data")?;
                let mut data = HashTable::new(map.len());
                for (key, v) in map {
                    let encoded = v
                        .as_str()
                        .ok_or_else(|| ParseError::invalid("data", format!("value of {key:?} is not a string")))?;
                    let decoded = STANDARD.decode(encoded).map_err(|source| ParseError::Base64 {
                        key: key.clone(),
                        source,
                    })?;
                    data.insert(key, decoded);
                }
                data
            }
        };

        Ok(Self {
            meta,
            secret_type: opt_str(doc, "type", "type")?,
            data,
        })
    }

    /// Whether the Secret is declared as `kubernetes.io/tls`.
    pub fn is_tls(&self) -> bool {
        self.secret_type == TYPE_TLS
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn namespace(&self) -> &str {
        &self.meta.namespace
    }
}

fn data_keys<S: Serializer>(data: &HashTable<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(data.keys())
}
