#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]

pub mod app;
pub mod capabilities;
pub mod collate;
pub mod config;
pub mod event;
pub mod filter;
pub mod group;
pub mod model;
pub mod normalize;
pub mod paginate;
pub mod pipeline;
pub mod platform;
pub mod preload;
pub mod session;
pub mod source;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::CatalogConfig;
pub use crux_core::{render::Render, App as CruxApp};
pub use event::{Event, MountContext};
pub use filter::{EmptyState, FilterFacets, FilterQuery};
pub use group::{Group, OrderBy};
pub use model::{CatalogItem, ItemKind, RawRecord, Route};
pub use pipeline::ReadModel;
pub use session::{CatalogSession, Collaborators};
pub use source::Strategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    AcquisitionFailed,
    SnapshotUnavailable,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::AcquisitionFailed => "ACQUISITION_FAILED",
            Self::SnapshotUnavailable => "SNAPSHOT_UNAVAILABLE",
        }
    }

    #[must_use]
    pub const fn user_facing_message(self) -> &'static str {
        match self {
            Self::AcquisitionFailed => "Couldn't load the catalog. Check your connection and try again.",
            Self::SnapshotUnavailable => {
                "The catalog data for this page is missing and has to be regenerated."
            }
        }
    }
}

/// The only error that reaches the read model.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceError {
    /// The remote query failed. Recoverable through refetch.
    #[error("acquisition failed: {message}")]
    Acquisition { message: String, retryable: bool },

    /// Snapshot-only route with no usable snapshot. There is no fallback;
    /// render a failure, never a spinner.
    #[error("snapshot unavailable for route '{route}': {reason}")]
    SnapshotUnavailable { route: String, reason: String },
}

impl SourceError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Acquisition { .. } => ErrorKind::AcquisitionFailed,
            Self::SnapshotUnavailable { .. } => ErrorKind::SnapshotUnavailable,
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind().code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Acquisition { retryable, .. } => *retryable,
            Self::SnapshotUnavailable { .. } => false,
        }
    }

    #[must_use]
    pub const fn user_facing_message(&self) -> &'static str {
        self.kind().user_facing_message()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} = {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid URL in {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_errors_carry_stable_codes() {
        let err = SourceError::SnapshotUnavailable {
            route: "brands".into(),
            reason: "snapshot is empty".into(),
        };
        assert_eq!(err.code(), "SNAPSHOT_UNAVAILABLE");
        assert!(!err.is_retryable());

        let err = SourceError::Acquisition {
            message: "timeout".into(),
            retryable: true,
        };
        assert_eq!(err.code(), "ACQUISITION_FAILED");
        assert!(err.is_retryable());
    }

    #[test]
    fn source_error_round_trips_across_the_shell_boundary() {
        let err = SourceError::Acquisition {
            message: "offline".into(),
            retryable: true,
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains(r#""kind":"acquisition""#));
        assert_eq!(serde_json::from_str::<SourceError>(&json).unwrap(), err);
    }
}
