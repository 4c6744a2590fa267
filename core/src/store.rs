use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::index::InvertedIndex;
use crate::persist::load_snapshot;
use crate::record::DatasetSnapshot;

/// A snapshot together with the index built from it.
#[derive(Debug)]
pub struct ActivePair {
    pub snapshot: Arc<DatasetSnapshot>,
    pub index: Arc<InvertedIndex>,
    /// Increases by one on every successful replace.
    pub generation: u64,
}

/// Owner of the active (snapshot, index) pair.
///
/// Readers take the whole pair with a single atomic load and keep it alive
/// for as long as they hold the `Arc`; a replace publishes a new pair
/// without waiting for them and the old one is freed when the last reader
/// drops it.
pub struct DatasetStore {
    active: ArcSwap<ActivePair>,
    /// Last published generation; held while publishing so swaps apply in order.
    generation: Mutex<u64>,
    reload_lock: Mutex<()>,
}

impl DatasetStore {
    pub fn new(snapshot: DatasetSnapshot, index: InvertedIndex) -> Result<Self> {
        check_pair(&snapshot, &index)?;
        let pair = ActivePair { snapshot: Arc::new(snapshot), index: Arc::new(index), generation: 0 };
        Ok(Self {
            active: ArcSwap::from_pointee(pair),
            generation: Mutex::new(0),
            reload_lock: Mutex::new(()),
        })
    }

    /// Load the dataset at `path`, index it and make it the first active pair.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let snapshot = Self::load(path)?;
        let index = InvertedIndex::build(&snapshot);
        Self::new(snapshot, index)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<DatasetSnapshot> {
        load_snapshot(path)
    }

    /// The active pair. Never blocks.
    pub fn current(&self) -> Arc<ActivePair> {
        self.active.load_full()
    }

    /// Publish a new pair in one pointer swap and return its generation.
    pub fn replace(&self, snapshot: DatasetSnapshot, index: InvertedIndex) -> Result<u64> {
        check_pair(&snapshot, &index)?;
        let records = snapshot.len();
        let fingerprint = snapshot.fingerprint().to_string();
        let mut last = self.generation.lock();
        let generation = *last + 1;
        self.active.store(Arc::new(ActivePair {
            snapshot: Arc::new(snapshot),
            index: Arc::new(index),
            generation,
        }));
        *last = generation;
        drop(last);
        tracing::info!(generation, records, %fingerprint, "active dataset replaced");
        Ok(generation)
    }

    /// Load, index and publish the dataset at `path`.
    ///
    /// Reloads are serialized so that two concurrent calls publish in the
    /// order they loaded. On any error the previous pair stays active.
    pub fn reload<P: AsRef<Path>>(&self, path: P) -> Result<u64> {
        let _guard = self.reload_lock.lock();
        let snapshot = Self::load(path)?;
        let index = InvertedIndex::build(&snapshot);
        self.replace(snapshot, index)
    }
}

fn check_pair(snapshot: &DatasetSnapshot, index: &InvertedIndex) -> Result<()> {
    if snapshot.fingerprint() != index.snapshot_fingerprint() || snapshot.len() != index.num_docs() as usize {
        return Err(Error::IndexMismatch {
            snapshot: snapshot.fingerprint().to_string(),
            index: index.snapshot_fingerprint().to_string(),
        });
    }
    Ok(())
}
