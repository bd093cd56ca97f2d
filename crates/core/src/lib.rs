//! Core primitives for the Traffic Server ingress state store.
//!
//! - [`HashTable`]: the string-keyed container every resource collection is built on.
//! - [`Kind`], [`ObjectKey`], [`WatchEvent`]: identities and observations arriving
//!   from the Kubernetes watch stream.
//! - [`StoreConfig`]: sizing and pacing knobs.

#![forbid(unsafe_code)]

mod config;
mod error;
mod event;
pub mod table;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use event::{EventKind, Kind, ObjectKey, WatchEvent};
pub use table::{Cursor, Destructor, HashTable};

pub mod prelude {
    pub use super::{Cursor, EventKind, HashTable, Kind, ObjectKey, StoreConfig, WatchEvent};
}
