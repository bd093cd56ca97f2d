use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, trace};
use tsingress_core::{EventKind, HashTable, Kind, StoreConfig, WatchEvent};
use tsingress_resources::{parse_value, Resource};

use crate::{ApplyError, Namespace};

/// What applying one watch event did to the cluster.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Created,
    Replaced,
    Removed(Resource),
    /// A delete for something the cluster never held.
    Absent,
}

/// The root aggregate: every namespace the controller has seen.
///
/// Namespaces are created on first reference and are never dropped before
/// the cluster itself; [`Cluster::teardown`] releases everything at shutdown.
#[derive(Debug)]
pub struct Cluster {
    namespaces: HashTable<Namespace>,
    resource_buckets: usize,
}

impl Default for Cluster {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}

impl Cluster {
    pub fn new(config: &StoreConfig) -> Self {
        let config = config.clamped();
        let destructor = Arc::new(|name: &str, ns: Namespace| {
            trace!(ns = %name, resources = ns.len(), "namespace released");
        });
        Self {
            namespaces: HashTable::with_destructor(config.cluster_buckets, destructor),
            resource_buckets: config.resource_buckets,
        }
    }

    /// Returns the namespace called `name`, registering an empty one if none
    /// exists yet. Repeated calls return the same instance.
    pub fn namespace(&mut self, name: &str) -> &mut Namespace {
        let buckets = self.resource_buckets;
        self.namespaces.get_or_insert_with(name, || {
            debug!(ns = %name, "namespace created");
            Namespace::new(name, buckets)
        })
    }

    /// Lookup without creation.
    pub fn get_namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    pub fn namespaces(&self) -> &HashTable<Namespace> {
        &self.namespaces
    }

    /// Number of namespaces.
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Stores `resource` in the namespace named by its metadata. Returns
    /// whether an entity of the same kind and name was replaced.
    pub fn put(&mut self, resource: impl Into<Resource>) -> bool {
        let resource = resource.into();
        let ns = resource.namespace().to_string();
        self.namespace(&ns).put(resource)
    }

    /// Detaches and returns the entity. Deleting from an unknown namespace
    /// does not create it.
    pub fn delete(&mut self, namespace: &str, kind: Kind, name: &str) -> Option<Resource> {
        self.namespaces.get_mut(namespace)?.remove(kind, name)
    }

    /// Applies one watch event. A document that fails to parse leaves the
    /// cluster exactly as it was.
    pub fn apply(&mut self, event: WatchEvent) -> Result<Change, ApplyError> {
        let WatchEvent { key, kind, raw } = event;
        match kind {
            EventKind::Applied => {
                let resource = parse_value(key.kind, &raw).map_err(|source| ApplyError::Parse {
                    key: key.clone(),
                    source,
                })?;
                if self.put(resource) {
                    Ok(Change::Replaced)
                } else {
                    Ok(Change::Created)
                }
            }
            EventKind::Deleted => Ok(match self.delete(&key.namespace, key.kind, &key.name) {
                Some(old) => Change::Removed(old),
                None => Change::Absent,
            }),
        }
    }

    /// Decodes a Kubernetes watch envelope and applies it.
    pub fn apply_wire(&mut self, envelope: &Value) -> Result<Change, ApplyError> {
        let event = WatchEvent::from_wire(envelope)?;
        self.apply(event)
    }

    /// Releases every namespace and the entities they own. Returns how many
    /// namespaces there were.
    pub fn teardown(self) -> usize {
        let namespaces = self.namespaces.len();
        let resources: usize = self.namespaces.values().map(Namespace::len).sum();
        drop(self);
        info!(namespaces, resources, "cluster torn down");
        namespaces
    }
}
