use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{RawRecord, Route};

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SnapshotError {
    #[error("no snapshot was generated for this route")]
    Missing,

    #[error("snapshot is empty")]
    Empty,

    #[error("snapshot is malformed: {reason}")]
    Malformed { reason: String },
}

/// Build-time snapshot data. All reads are synchronous and pure.
pub trait SnapshotProvider: Send + Sync {
    fn is_snapshot_authoritative(&self, route: &Route) -> bool;
    fn is_snapshot_present(&self, route: &Route) -> bool;
    fn read_snapshot(&self, route: &Route) -> Result<Vec<RawRecord>, SnapshotError>;
}

/// Reads a snapshot and rejects the empty one: an empty snapshot is never
/// usable data, whatever the strategy does about it.
pub fn read_usable(
    provider: &dyn SnapshotProvider,
    route: &Route,
) -> Result<Vec<RawRecord>, SnapshotError> {
    let records = provider.read_snapshot(route)?;
    if records.is_empty() {
        return Err(SnapshotError::Empty);
    }
    Ok(records)
}

/// Parses a JSON snapshot payload: either a bare array of records or an
/// object with a `records` (or `data`) array.
pub fn parse_snapshot(payload: &str) -> Result<Vec<RawRecord>, SnapshotError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Payload {
        Bare(Vec<RawRecord>),
        Wrapped {
            #[serde(alias = "data")]
            records: Vec<RawRecord>,
        },
    }

    if payload.trim().is_empty() {
        return Err(SnapshotError::Empty);
    }

    match serde_json::from_str::<Payload>(payload) {
        Ok(Payload::Bare(records) | Payload::Wrapped { records }) => Ok(records),
        Err(e) => Err(SnapshotError::Malformed {
            reason: e.to_string(),
        }),
    }
}

/// One route's embedded snapshot, usually `include_str!`-ed by the web build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedSnapshot {
    pub authoritative: bool,
    pub payload: String,
}

/// In-memory [`SnapshotProvider`] over embedded JSON payloads keyed by route.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedSnapshots {
    routes: HashMap<Route, EmbeddedSnapshot>,
}

impl EmbeddedSnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_route(
        mut self,
        route: impl Into<String>,
        authoritative: bool,
        payload: impl Into<String>,
    ) -> Self {
        self.routes.insert(
            Route::new(route),
            EmbeddedSnapshot {
                authoritative,
                payload: payload.into(),
            },
        );
        self
    }
}

impl SnapshotProvider for EmbeddedSnapshots {
    fn is_snapshot_authoritative(&self, route: &Route) -> bool {
        self.routes.get(route).is_some_and(|s| s.authoritative)
    }

    fn is_snapshot_present(&self, route: &Route) -> bool {
        self.routes.contains_key(route)
    }

    fn read_snapshot(&self, route: &Route) -> Result<Vec<RawRecord>, SnapshotError> {
        let snapshot = self.routes.get(route).ok_or(SnapshotError::Missing)?;
        parse_snapshot(&snapshot.payload)
    }
}

/// Snapshot facts for the single route a shell mounted, as handed over in
/// the mount event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFacts {
    pub authoritative: bool,
    pub payload: Option<String>,
}

impl SnapshotProvider for SnapshotFacts {
    /// The build marks the route authoritative whether or not the payload
    /// made it into the bundle; a missing payload is then a snapshot to
    /// regenerate, not a reason to go to the network.
    fn is_snapshot_authoritative(&self, _route: &Route) -> bool {
        self.authoritative
    }

    fn is_snapshot_present(&self, _route: &Route) -> bool {
        self.payload.is_some()
    }

    fn read_snapshot(&self, _route: &Route) -> Result<Vec<RawRecord>, SnapshotError> {
        self.payload
            .as_deref()
            .map_or(Err(SnapshotError::Missing), parse_snapshot)
    }
}
