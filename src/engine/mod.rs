mod availability;
mod conflict;
mod dependents;
mod error;
mod mutations;
mod queries;
mod store;
mod validate;

pub use error::{DependencyConflict, EngineError};
pub use store::{Record, Store, Table};

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

use tokio::sync::{Mutex, MutexGuard};
use ulid::Ulid;

use crate::limits::MAX_RECORDS_PER_COLLECTION;
use crate::model::*;
use crate::observability;
use crate::wal::Wal;

/// In-memory allocation graph backed by a write-ahead log.
///
/// Reads go straight to the store's maps. Every mutation holds the WAL mutex
/// from its first check until the event is applied, so writers are
/// serialized and no check can be invalidated before its write lands.
pub struct Engine {
    pub store: Store,
    wal: Mutex<Wal>,
    replayed: usize,
}

impl Engine {
    pub fn new(wal_path: PathBuf) -> io::Result<Self> {
        let events = Wal::recover(&wal_path)?;
        let store = Store::new();
        for event in &events {
            store.apply(event);
        }
        tracing::debug!(path = %wal_path.display(), events = events.len(), "replayed wal");

        let wal = Wal::open(&wal_path, events.len() as u64)?;
        Ok(Self {
            store,
            wal: Mutex::new(wal),
            replayed: events.len(),
        })
    }

    /// Number of events read back from the log when the engine was opened.
    pub fn replayed_events(&self) -> usize {
        self.replayed
    }

    /// Events currently in the log file.
    pub async fn wal_entries(&self) -> u64 {
        self.wal.lock().await.entries()
    }

    /// Rewrite the log as the minimal event list for the current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut wal = self.wal.lock().await;
        let events = self.store.snapshot();
        let before = wal.entries();
        wal.compact(&events).map_err(|e| {
            tracing::error!(error = %e, "wal compaction failed");
            EngineError::wal(e)
        })?;
        tracing::info!(before, after = events.len(), "wal compacted");
        Ok(())
    }

    /// Take the write gate. Held for the whole check-then-act sequence.
    pub(super) async fn write_gate(&self) -> MutexGuard<'_, Wal> {
        self.wal.lock().await
    }

    /// Durably log `event`, then make it visible to readers.
    pub(super) fn commit(&self, wal: &mut Wal, event: Event) -> Result<(), EngineError> {
        let start = Instant::now();
        if let Err(e) = wal.append(&event) {
            tracing::error!(error = %e, "wal append failed");
            return Err(EngineError::wal(e));
        }
        metrics::histogram!(observability::WAL_APPEND_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());
        self.store.apply(&event);
        Ok(())
    }

    /// Checks shared by every create: fresh id, room in the collection, free unique key.
    pub(super) fn admit_new<T: Record>(&self, table: &Table<T>, record: &T) -> Result<(), EngineError> {
        self.admit_id(table, record)?;
        table.ensure_unique(record)
    }

    /// Fresh id and room in the collection.
    pub(super) fn admit_id<T: Record>(&self, table: &Table<T>, record: &T) -> Result<(), EngineError> {
        if table.contains(&record.id()) {
            return Err(EngineError::AlreadyExists(record.id()));
        }
        if table.len() >= MAX_RECORDS_PER_COLLECTION {
            return Err(EngineError::LimitExceeded("too many records in collection"));
        }
        Ok(())
    }
}

/// Resolve a reference held by another record. A dangling reference is bad
/// input, not a missing resource.
pub(super) fn reference<T: Record>(table: &Table<T>, id: &Ulid) -> Result<T, EngineError> {
    table.get(id).ok_or_else(|| {
        EngineError::Validation(format!("referenced {} {id} does not exist", T::KIND))
    })
}

/// Run one engine operation, recording its outcome and latency.
pub(super) async fn timed<T>(
    op: &'static str,
    fut: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    let start = Instant::now();
    let result = fut.await;
    observability::record(op, result.as_ref().err(), start);
    result
}
