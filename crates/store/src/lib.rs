//! In-memory cluster state for the Traffic Server ingress controller.
//!
//! A [`Cluster`] owns [`Namespace`]s, which own the parsed entities. The store
//! has no threading of its own: one writer applies watch events (see
//! [`spawn_ingest`]) and readers share the cluster through [`SharedCluster`].

#![forbid(unsafe_code)]

mod backend;
mod cluster;
mod error;
mod ingest;
mod namespace;

pub use backend::{Backend, Dangling, ResolvedBackend};
pub use cluster::{Change, Cluster};
pub use error::{ApplyError, TlsLookupError};
pub use ingest::{apply_batch, spawn_ingest, BatchStats, Coalescer, IngestHandle, SharedCluster};
pub use namespace::Namespace;
