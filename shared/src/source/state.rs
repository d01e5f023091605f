use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::remote::QueryError;
use super::Strategy;
use crate::config::CatalogConfig;
use crate::model::RawRecord;
use crate::SourceError;

/// Monotonic tag for one acquisition request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(u64);

impl Generation {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Issues generations and decides which responses may still be applied.
///
/// A response is applied only if no newer generation has been applied
/// already; a slow older response can never overwrite a faster newer one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationTracker {
    issued: u64,
    applied: u64,
}

impl GenerationTracker {
    pub fn issue(&mut self) -> Generation {
        self.issued += 1;
        Generation(self.issued)
    }

    /// Marks `generation` applied. False means the response is stale.
    pub fn settle(&mut self, generation: Generation) -> bool {
        if generation.0 <= self.applied || generation.0 > self.issued {
            return false;
        }
        self.applied = generation.0;
        true
    }

    /// True while the newest issued request has not resolved.
    pub fn in_flight(&self) -> bool {
        self.applied < self.issued
    }

    pub fn latest(&self) -> Generation {
        Generation(self.issued)
    }
}

/// The last non-empty remote result, used to paper over an empty response
/// after a transient re-mount. Bounded by age and by how many times it may
/// stand in for an empty response.
#[derive(Clone, Debug)]
pub struct LastGoodCache {
    entry: Option<CachedRecords>,
    max_age: Duration,
    max_serves: u32,
}

#[derive(Clone, Debug)]
struct CachedRecords {
    records: Arc<[RawRecord]>,
    stored_at: Instant,
    serves: u32,
}

impl LastGoodCache {
    pub fn new(max_age: Duration, max_serves: u32) -> Self {
        Self {
            entry: None,
            max_age,
            max_serves,
        }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(config.last_good_max_age(), config.last_good_max_serves)
    }

    pub fn store(&mut self, records: Arc<[RawRecord]>, now: Instant) {
        if records.is_empty() {
            return;
        }
        self.entry = Some(CachedRecords {
            records,
            stored_at: now,
            serves: 0,
        });
    }

    /// Hands out the cached records if they are still within bounds; an
    /// out-of-bounds entry is dropped.
    pub fn serve(&mut self, now: Instant) -> Option<Arc<[RawRecord]>> {
        let entry = self.entry.as_mut()?;
        let age = now.saturating_duration_since(entry.stored_at);
        if age > self.max_age || entry.serves >= self.max_serves {
            debug!(?age, serves = entry.serves, "last-good cache expired");
            self.entry = None;
            return None;
        }
        entry.serves += 1;
        Some(Arc::clone(&entry.records))
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}

/// Result of one acquisition attempt, whatever produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Acquisition {
    /// Records read synchronously from the embedded snapshot.
    Snapshot(Vec<RawRecord>),
    /// Response of the remote query service.
    Remote(Result<Vec<RawRecord>, QueryError>),
    /// No data exists and none will arrive (snapshot-only with no snapshot).
    Unavailable(SourceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    ServedLastGood,
    Discarded,
}

/// Point-in-time view of the source, cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSnapshot {
    pub strategy: Strategy,
    pub records: Arc<[RawRecord]>,
    /// Bumped whenever `records` is replaced; downstream caches key on it.
    pub revision: u64,
    pub is_loading: bool,
    pub error: Option<SourceError>,
}

/// Mutable state behind the uniform `{records, is_loading, error}` surface.
#[derive(Debug, Clone)]
pub struct SourceState {
    strategy: Strategy,
    generations: GenerationTracker,
    records: Arc<[RawRecord]>,
    revision: u64,
    error: Option<SourceError>,
    last_good: LastGoodCache,
}

impl SourceState {
    pub fn new(strategy: Strategy, last_good: LastGoodCache) -> Self {
        Self {
            strategy,
            generations: GenerationTracker::default(),
            records: Arc::from(Vec::new()),
            revision: 0,
            error: None,
            last_good,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn is_loading(&self) -> bool {
        self.generations.in_flight()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn records(&self) -> &Arc<[RawRecord]> {
        &self.records
    }

    pub fn error(&self) -> Option<&SourceError> {
        self.error.as_ref()
    }

    pub fn snapshot(&self) -> SourceSnapshot {
        SourceSnapshot {
            strategy: self.strategy,
            records: Arc::clone(&self.records),
            revision: self.revision,
            is_loading: self.is_loading(),
            error: self.error.clone(),
        }
    }

    /// Starts a request; its response must come back through [`Self::apply`]
    /// with the returned generation.
    pub fn begin_request(&mut self) -> Generation {
        self.generations.issue()
    }

    /// Applies a response if `generation` is still current. `clock` is only
    /// read on the last-good path, which never runs on web.
    pub fn apply(
        &mut self,
        generation: Generation,
        outcome: Acquisition,
        clock: impl Fn() -> Instant,
    ) -> ApplyOutcome {
        if !self.generations.settle(generation) {
            warn!(
                generation = generation.get(),
                latest = self.generations.latest().get(),
                "discarding stale acquisition response"
            );
            return ApplyOutcome::Discarded;
        }

        match outcome {
            Acquisition::Snapshot(records) => {
                self.error = None;
                self.replace_records(Arc::from(records));
                ApplyOutcome::Applied
            }
            Acquisition::Unavailable(error) => {
                self.error = Some(error);
                self.replace_records(Arc::from(Vec::new()));
                ApplyOutcome::Applied
            }
            Acquisition::Remote(Ok(records)) => {
                self.error = None;
                if !self.strategy.serves_last_good() {
                    self.replace_records(Arc::from(records));
                    return ApplyOutcome::Applied;
                }
                let now = clock();
                if records.is_empty() && !self.is_loading() {
                    if let Some(cached) = self.last_good.serve(now) {
                        debug!(records = cached.len(), "empty response, serving last good records");
                        self.replace_records(cached);
                        return ApplyOutcome::ServedLastGood;
                    }
                }
                let records: Arc<[RawRecord]> = Arc::from(records);
                self.last_good.store(Arc::clone(&records), now);
                self.replace_records(records);
                ApplyOutcome::Applied
            }
            Acquisition::Remote(Err(e)) => {
                warn!(error = %e, "remote query failed");
                // Previously loaded records stay visible next to the error.
                self.error = Some(e.into());
                ApplyOutcome::Applied
            }
        }
    }

    fn replace_records(&mut self, records: Arc<[RawRecord]>) {
        if Arc::ptr_eq(&self.records, &records) {
            return;
        }
        self.records = records;
        self.revision += 1;
    }

    pub fn clear_last_good(&mut self) {
        self.last_good.clear();
    }
}
