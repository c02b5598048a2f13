use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant, SystemTime};

use wiiproxy_command::{MspRecord, Result as CommandResult, Values};

/// The latest decoded reply for one command.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub code: u8,
    pub values: Values,
    /// Starts at 1 and increases with every update of this code.
    pub version: u64,
    pub updated_at: Instant,
    pub updated_at_wall: SystemTime,
}

impl SnapshotEntry {
    /// Time since the entry was published.
    pub fn age(&self) -> Duration {
        self.updated_at.elapsed()
    }

    /// Interpret the values as a typed record.
    pub fn record<R: MspRecord>(&self) -> CommandResult<R> {
        R::from_values(&self.values)
    }
}

/// Latest reply per command code.
///
/// Only the link worker writes. Readers get a shared, immutable entry and
/// never see a half-written update.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    entries: RwLock<HashMap<u8, Arc<SnapshotEntry>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn publish(&self, code: u8, values: Values) -> Arc<SnapshotEntry> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let version = entries.get(&code).map_or(0, |entry| entry.version) + 1;
        let entry = Arc::new(SnapshotEntry {
            code,
            values,
            version,
            updated_at: Instant::now(),
            updated_at_wall: SystemTime::now(),
        });
        entries.insert(code, Arc::clone(&entry));
        entry
    }

    pub fn get(&self, code: u8) -> Option<Arc<SnapshotEntry>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&code)
            .cloned()
    }

    /// Version of the entry for `code`, or 0 if none has been published.
    pub fn version(&self, code: u8) -> u64 {
        self.get(code).map_or(0, |entry| entry.version)
    }

    /// Every entry, ordered by code.
    pub fn all(&self) -> Vec<Arc<SnapshotEntry>> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.code);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
