//! Single-writer ingest: watch events are coalesced per object and applied to
//! a shared [`Cluster`] in batches.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tsingress_core::{ObjectKey, StoreConfig, WatchEvent};

use crate::{Change, Cluster};

/// Coalescing queue keyed by object with FIFO order by first arrival. A later
/// event for a queued object replaces the earlier one in place.
pub struct Coalescer {
    map: FxHashMap<ObjectKey, WatchEvent>,
    order: VecDeque<ObjectKey>,
    cap: usize,
}

impl Coalescer {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            map: FxHashMap::default(),
            order: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Queues `ev`. Returns `true` once the queue is at capacity; the caller
    /// must drain before pushing more. Nothing is ever dropped.
    pub fn push(&mut self, ev: WatchEvent) -> bool {
        if !self.map.contains_key(&ev.key) {
            self.order.push_back(ev.key.clone());
        }
        self.map.insert(ev.key.clone(), ev);
        self.map.len() >= self.cap
    }

    pub fn drain_ready(&mut self) -> Vec<WatchEvent> {
        let mut out = Vec::with_capacity(self.order.len());
        while let Some(key) = self.order.pop_front() {
            if let Some(ev) = self.map.remove(&key) {
                out.push(ev);
            }
        }
        out
    }
}

/// A [`Cluster`] behind one reader/writer lock. Readers never observe a
/// half-applied batch.
#[derive(Debug, Clone, Default)]
pub struct SharedCluster(Arc<RwLock<Cluster>>);

impl SharedCluster {
    pub fn new(cluster: Cluster) -> Self {
        Self(Arc::new(RwLock::new(cluster)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Cluster> {
        self.0.read().unwrap_or_else(|poisoned| {
            warn!("cluster lock poisoned; continuing with inner state");
            poisoned.into_inner()
        })
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Cluster> {
        self.0.write().unwrap_or_else(|poisoned| {
            warn!("cluster lock poisoned; continuing with inner state");
            poisoned.into_inner()
        })
    }

    /// Takes the cluster back when this is the last handle to it.
    pub fn try_unwrap(self) -> Result<Cluster, Self> {
        match Arc::try_unwrap(self.0) {
            Ok(lock) => Ok(lock.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())),
            Err(shared) => Err(Self(shared)),
        }
    }
}

/// Counts from applying one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub applied: u64,
    pub deleted: u64,
    pub rejected: u64,
}

/// Applies `batch` under a single write lock. Rejected events are logged and
/// skipped.
pub fn apply_batch(cluster: &SharedCluster, batch: Vec<WatchEvent>) -> BatchStats {
    let started = Instant::now();
    let mut stats = BatchStats::default();
    let mut guard = cluster.write();
    for ev in batch {
        let key = ev.key.clone();
        match guard.apply(ev) {
            Ok(Change::Created | Change::Replaced) => stats.applied += 1,
            Ok(Change::Removed(_) | Change::Absent) => stats.deleted += 1,
            Err(e) => {
                warn!(key = %key, error = %e, "rejected watch event");
                stats.rejected += 1;
            }
        }
    }
    let namespaces = guard.len();
    drop(guard);

    counter!("tsi_ingest_applied_total", stats.applied);
    counter!("tsi_ingest_deleted_total", stats.deleted);
    counter!("tsi_ingest_rejected_total", stats.rejected);
    histogram!("tsi_ingest_batch_ms", started.elapsed().as_secs_f64() * 1000.0);
    gauge!("tsi_cluster_namespaces", namespaces as f64);
    stats
}

/// Handle for readers of the cluster fed by [`spawn_ingest`].
pub struct IngestHandle {
    cluster: SharedCluster,
    generation_rx: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl IngestHandle {
    pub fn cluster(&self) -> &SharedCluster {
        &self.cluster
    }

    /// Bumped once per applied batch.
    pub fn generation(&self) -> u64 {
        *self.generation_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation_rx.clone()
    }

    /// Waits for the loop to drain and stop. The loop stops once every sender
    /// has been dropped.
    pub async fn join(self) -> SharedCluster {
        if let Err(e) = self.task.await {
            warn!(error = %e, "ingest task failed");
        }
        self.cluster
    }
}

/// Spawns the ingest loop on the current tokio runtime. Returns the event
/// sender and a handle for readers.
pub fn spawn_ingest(config: StoreConfig) -> (mpsc::Sender<WatchEvent>, IngestHandle) {
    let config = config.clamped();
    let (tx, mut rx) = mpsc::channel::<WatchEvent>(config.ingest_queue);
    let cluster = SharedCluster::new(Cluster::new(&config));
    let (generation_tx, generation_rx) = watch::channel(0u64);
    let writer = cluster.clone();

    let task = tokio::spawn(async move {
        info!(queue = config.ingest_queue, tick_ms = config.ingest_tick_ms, "ingest loop started");
        let mut coalescer = Coalescer::with_capacity(config.ingest_queue);
        let mut generation = 0u64;
        let mut flush = |coalescer: &mut Coalescer| {
            let batch = coalescer.drain_ready();
            if batch.is_empty() {
                return;
            }
            let stats = apply_batch(&writer, batch);
            generation = generation.saturating_add(1);
            debug!(generation, ?stats, "batch applied");
            let _ = generation_tx.send(generation);
        };

        let mut ticker = tokio::time::interval(Duration::from_millis(config.ingest_tick_ms));
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    match maybe {
                        Some(ev) => {
                            if coalescer.push(ev) {
                                flush(&mut coalescer);
                            }
                        }
                        None => {
                            debug!("event channel closed; draining and exiting ingest loop");
                            flush(&mut coalescer);
                            break;
                        }
                    }
                }
                _ = ticker.tick() => flush(&mut coalescer),
            }
        }
        info!(generation, "ingest loop stopped");
    });

    (
        tx,
        IngestHandle {
            cluster,
            generation_rx,
            task,
        },
    )
}
