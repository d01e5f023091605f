use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::remote::{QueryParams, RemoteQuery};
use super::snapshot::{read_usable, SnapshotError, SnapshotProvider};
use super::state::Acquisition;
use super::Strategy;
use crate::model::Route;
use crate::SourceError;

/// One way of acquiring records. Selected once per mount; the data source
/// drives it without knowing which variant it holds.
#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    fn strategy(&self) -> Strategy;

    /// True when `load` never touches the remote service. Refetching a
    /// synchronous strategy is a no-op.
    fn is_synchronous(&self) -> bool;

    async fn load(&self, params: &QueryParams) -> Acquisition;

    async fn refetch(&self, params: &QueryParams) -> Acquisition {
        self.load(params).await
    }
}

/// Native platforms: the remote query is mandatory.
pub struct MobileApi {
    remote: Arc<dyn RemoteQuery>,
}

/// Desktop web without any snapshot.
pub struct ApiOnly {
    remote: Arc<dyn RemoteQuery>,
}

/// Authoritative snapshot; never queries.
pub struct SsgOnly {
    ready: Acquisition,
}

/// Snapshot first, remote query if the snapshot turns out unusable.
pub struct StaticWithFallback {
    ready: Option<Acquisition>,
    remote: Arc<dyn RemoteQuery>,
}

#[async_trait]
impl AcquisitionStrategy for MobileApi {
    fn strategy(&self) -> Strategy {
        Strategy::MobileApi
    }

    fn is_synchronous(&self) -> bool {
        false
    }

    async fn load(&self, params: &QueryParams) -> Acquisition {
        Acquisition::Remote(self.remote.query_records(params).await)
    }
}

#[async_trait]
impl AcquisitionStrategy for ApiOnly {
    fn strategy(&self) -> Strategy {
        Strategy::ApiOnly
    }

    fn is_synchronous(&self) -> bool {
        false
    }

    async fn load(&self, params: &QueryParams) -> Acquisition {
        Acquisition::Remote(self.remote.query_records(params).await)
    }
}

impl SsgOnly {
    pub fn new(snapshots: &dyn SnapshotProvider, route: &Route) -> Self {
        let ready = read_synchronously(Strategy::SsgOnly, snapshots, route)
            .unwrap_or_else(|| Acquisition::Snapshot(Vec::new()));
        Self { ready }
    }
}

#[async_trait]
impl AcquisitionStrategy for SsgOnly {
    fn strategy(&self) -> Strategy {
        Strategy::SsgOnly
    }

    fn is_synchronous(&self) -> bool {
        true
    }

    async fn load(&self, _params: &QueryParams) -> Acquisition {
        self.ready.clone()
    }
}

impl StaticWithFallback {
    pub fn new(snapshots: &dyn SnapshotProvider, route: &Route, remote: Arc<dyn RemoteQuery>) -> Self {
        let ready = read_synchronously(Strategy::StaticWithFallback, snapshots, route);
        Self { ready, remote }
    }
}

/// The part of a strategy that runs without suspending: the snapshot read.
///
/// `None` means the strategy needs the remote query. `SsgOnly` always
/// yields a result, turning an unusable snapshot into
/// [`SourceError::SnapshotUnavailable`].
pub fn read_synchronously(
    strategy: Strategy,
    snapshots: &dyn SnapshotProvider,
    route: &Route,
) -> Option<Acquisition> {
    match strategy {
        Strategy::MobileApi | Strategy::ApiOnly => None,
        Strategy::SsgOnly => Some(match read_usable(snapshots, route) {
            Ok(records) => Acquisition::Snapshot(records),
            Err(e) => {
                warn!(%route, error = %e, "authoritative snapshot unusable");
                Acquisition::Unavailable(SourceError::SnapshotUnavailable {
                    route: route.to_string(),
                    reason: e.to_string(),
                })
            }
        }),
        Strategy::StaticWithFallback => match read_usable(snapshots, route) {
            Ok(records) => Some(Acquisition::Snapshot(records)),
            Err(e) => {
                log_fallback(route, &e);
                None
            }
        },
    }
}

fn log_fallback(route: &Route, error: &SnapshotError) {
    warn!(%route, error = %error, "snapshot unusable, falling back to remote query");
}

#[async_trait]
impl AcquisitionStrategy for StaticWithFallback {
    fn strategy(&self) -> Strategy {
        Strategy::StaticWithFallback
    }

    fn is_synchronous(&self) -> bool {
        self.ready.is_some()
    }

    async fn load(&self, params: &QueryParams) -> Acquisition {
        match &self.ready {
            Some(ready) => ready.clone(),
            None => Acquisition::Remote(self.remote.query_records(params).await),
        }
    }
}

/// Builds the variant for an already selected [`Strategy`].
pub fn build_strategy(
    strategy: Strategy,
    route: &Route,
    remote: Arc<dyn RemoteQuery>,
    snapshots: &dyn SnapshotProvider,
) -> Box<dyn AcquisitionStrategy> {
    match strategy {
        Strategy::MobileApi => Box::new(MobileApi { remote }),
        Strategy::ApiOnly => Box::new(ApiOnly { remote }),
        Strategy::SsgOnly => Box::new(SsgOnly::new(snapshots, route)),
        Strategy::StaticWithFallback => {
            Box::new(StaticWithFallback::new(snapshots, route, remote))
        }
    }
}
