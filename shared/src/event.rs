use serde::{Deserialize, Serialize};

use crate::config::CatalogConfig;
use crate::filter::FilterQuery;
use crate::group::OrderBy;
use crate::model::{RawRecord, Route};
use crate::paginate::AdvanceTicket;
use crate::platform::PlatformInfo;
use crate::source::{Generation, QueryError, SnapshotFacts};

/// Everything the shell knows when it mounts the catalog view.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MountContext {
    pub route: Route,
    pub platform: PlatformInfo,
    pub snapshot: SnapshotFacts,
    pub config: CatalogConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Lifecycle
    Mounted(Box<MountContext>),
    Remounted,
    FocusChanged { focused: bool },
    TornDown,

    // Acquisition
    RefetchRequested,
    #[serde(skip)]
    RecordsFetched {
        mount: u64,
        generation: Generation,
        result: Result<Vec<RawRecord>, QueryError>,
    },

    // Query & paging
    QueryChanged(FilterQuery),
    OrderChanged { order: OrderBy, grouped: bool },
    LoadMoreRequested,
    ResetRequested,
    #[serde(skip)]
    LoadMoreSettled(AdvanceTicket),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mounted(_) => "mounted",
            Self::Remounted => "remounted",
            Self::FocusChanged { .. } => "focus_changed",
            Self::TornDown => "torn_down",
            Self::RefetchRequested => "refetch_requested",
            Self::RecordsFetched { .. } => "records_fetched",
            Self::QueryChanged(_) => "query_changed",
            Self::OrderChanged { .. } => "order_changed",
            Self::LoadMoreRequested => "load_more_requested",
            Self::ResetRequested => "reset_requested",
            Self::LoadMoreSettled(_) => "load_more_settled",
        }
    }
}
