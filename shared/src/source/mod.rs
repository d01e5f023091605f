//! Data acquisition: which strategy supplies records for a mount, and the
//! uniform `{records, is_loading, error, refetch}` surface over it.

mod data_source;
pub mod remote;
pub mod snapshot;
pub mod state;
pub mod strategy;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::Route;
use crate::platform::PlatformFacts;

pub use data_source::DataSource;
pub use remote::{QueryError, QueryParams, RemoteQuery};
pub use snapshot::{EmbeddedSnapshots, SnapshotError, SnapshotFacts, SnapshotProvider};
pub use state::{Acquisition, ApplyOutcome, Generation, LastGoodCache, SourceSnapshot, SourceState};
pub use strategy::{build_strategy, read_synchronously, AcquisitionStrategy};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    MobileApi,
    SsgOnly,
    StaticWithFallback,
    ApiOnly,
}

impl Strategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MobileApi => "mobile_api",
            Self::SsgOnly => "ssg_only",
            Self::StaticWithFallback => "static_with_fallback",
            Self::ApiOnly => "api_only",
        }
    }

    /// Only the native path papers over empty responses with the last
    /// good result.
    pub const fn serves_last_good(self) -> bool {
        matches!(self, Self::MobileApi)
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the strategy for one mount. Evaluated once; the result is fixed
/// for the life of the session.
pub fn select_strategy(
    platform: &dyn PlatformFacts,
    snapshots: &dyn SnapshotProvider,
    route: &Route,
) -> Strategy {
    let strategy = if !platform.is_desktop_web() {
        Strategy::MobileApi
    } else if snapshots.is_snapshot_authoritative(route) {
        Strategy::SsgOnly
    } else if snapshots.is_snapshot_present(route) {
        Strategy::StaticWithFallback
    } else {
        Strategy::ApiOnly
    };
    info!(%route, platform = ?platform.platform(), %strategy, "selected acquisition strategy");
    strategy
}
