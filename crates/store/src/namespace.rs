use std::sync::Arc;

use tracing::{debug, trace};
use tsingress_core::{Destructor, HashTable, Kind};
use tsingress_resources::{Endpoints, Ingress, Resource, Secret, Service};

/// Every observed resource of one Kubernetes namespace, one table per kind,
/// each keyed by resource name.
///
/// Putting a resource under a name that is already taken replaces the old
/// entity, which is released. Removing hands the entity back to the caller.
#[derive(Debug)]
pub struct Namespace {
    name: String,
    ingresses: HashTable<Ingress>,
    services: HashTable<Service>,
    endpoints: HashTable<Endpoints>,
    secrets: HashTable<Secret>,
}

fn released<V: 'static>(namespace: &str, kind: Kind) -> Destructor<V> {
    let namespace = namespace.to_string();
    Arc::new(move |name: &str, value: V| {
        trace!(%kind, ns = %namespace, %name, "released");
        drop(value);
    })
}

macro_rules! per_kind {
    ($kind:expr, $ty:ty, $table:ident, $put:ident, $get:ident, $remove:ident) => {
        pub fn $put(&mut self, value: $ty) -> bool {
            let name = value.meta.name.clone();
            let replaced = self.$table.contains_key(&name);
            debug!(kind = %$kind, ns = %self.name, %name, replaced, "put");
            self.$table.insert(&name, value);
            replaced
        }

        pub fn $get(&self, name: &str) -> Option<&$ty> {
            self.$table.get(name)
        }

        pub fn $remove(&mut self, name: &str) -> Option<$ty> {
            let removed = self.$table.remove(name);
            debug!(kind = %$kind, ns = %self.name, %name, found = removed.is_some(), "remove");
            removed
        }

        pub fn $table(&self) -> &HashTable<$ty> {
            &self.$table
        }
    };
}

// === impl Namespace ===

impl Namespace {
    /// `buckets` sizes each of the four per-kind tables.
    pub fn new(name: impl Into<String>, buckets: usize) -> Self {
        let name = name.into();
        Self {
            ingresses: HashTable::with_destructor(buckets, released(&name, Kind::Ingress)),
            services: HashTable::with_destructor(buckets, released(&name, Kind::Service)),
            endpoints: HashTable::with_destructor(buckets, released(&name, Kind::Endpoints)),
            secrets: HashTable::with_destructor(buckets, released(&name, Kind::Secret)),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    per_kind!(Kind::Ingress, Ingress, ingresses, put_ingress, get_ingress, remove_ingress);
    per_kind!(Kind::Service, Service, services, put_service, get_service, remove_service);
    per_kind!(Kind::Endpoints, Endpoints, endpoints, put_endpoints, get_endpoints, remove_endpoints);
    per_kind!(Kind::Secret, Secret, secrets, put_secret, get_secret, remove_secret);

    /// Stores `resource` in the table for its kind. Returns whether an entity
    /// of the same kind and name was replaced.
    pub fn put(&mut self, resource: impl Into<Resource>) -> bool {
        match resource.into() {
            Resource::Ingress(r) => self.put_ingress(r),
            Resource::Service(r) => self.put_service(r),
            Resource::Endpoints(r) => self.put_endpoints(r),
            Resource::Secret(r) => self.put_secret(r),
        }
    }

    pub fn remove(&mut self, kind: Kind, name: &str) -> Option<Resource> {
        match kind {
            Kind::Ingress => self.remove_ingress(name).map(Resource::from),
            Kind::Service => self.remove_service(name).map(Resource::from),
            Kind::Endpoints => self.remove_endpoints(name).map(Resource::from),
            Kind::Secret => self.remove_secret(name).map(Resource::from),
        }
    }

    pub fn contains(&self, kind: Kind, name: &str) -> bool {
        match kind {
            Kind::Ingress => self.ingresses.contains_key(name),
            Kind::Service => self.services.contains_key(name),
            Kind::Endpoints => self.endpoints.contains_key(name),
            Kind::Secret => self.secrets.contains_key(name),
        }
    }

    /// Number of entities of `kind`.
    pub fn count(&self, kind: Kind) -> usize {
        match kind {
            Kind::Ingress => self.ingresses.len(),
            Kind::Service => self.services.len(),
            Kind::Endpoints => self.endpoints.len(),
            Kind::Secret => self.secrets.len(),
        }
    }

    /// Number of entities across all kinds.
    pub fn len(&self) -> usize {
        Kind::ALL.into_iter().map(|k| self.count(k)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
