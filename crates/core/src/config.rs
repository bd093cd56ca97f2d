use serde::{Deserialize, Serialize};

/// Sizing and pacing knobs for the store and its ingest loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Bucket count of a cluster's namespace table.
    pub cluster_buckets: usize,
    /// Bucket count of each per-kind table in a namespace.
    pub resource_buckets: usize,
    /// Capacity of the ingest channel and of the coalescer.
    pub ingest_queue: usize,
    /// Interval between coalescer flushes, in milliseconds.
    pub ingest_tick_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cluster_buckets: 127,
            resource_buckets: 127,
            ingest_queue: 1024,
            ingest_tick_ms: 8,
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by `TSI_CLUSTER_BUCKETS`, `TSI_RESOURCE_BUCKETS`,
    /// `TSI_INGEST_QUEUE` and `TSI_INGEST_TICK_MS`. Unparsable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let read = |name: &str, default: usize| {
            lookup(name).and_then(|s| s.trim().parse().ok()).unwrap_or(default)
        };
        Self {
            cluster_buckets: read("TSI_CLUSTER_BUCKETS", d.cluster_buckets),
            resource_buckets: read("TSI_RESOURCE_BUCKETS", d.resource_buckets),
            ingest_queue: read("TSI_INGEST_QUEUE", d.ingest_queue),
            ingest_tick_ms: read("TSI_INGEST_TICK_MS", d.ingest_tick_ms as usize) as u64,
        }
        .clamped()
    }

    /// Raises every field to at least one.
    pub fn clamped(self) -> Self {
        Self {
            cluster_buckets: self.cluster_buckets.max(1),
            resource_buckets: self.resource_buckets.max(1),
            ingest_queue: self.ingest_queue.max(1),
            ingest_tick_ms: self.ingest_tick_ms.max(1),
        }
    }
}
