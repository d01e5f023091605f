use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{RawRecord, Route};
use crate::SourceError;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum QueryError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("server responded with status {status}")]
    Status { status: u16 },

    #[error("response body could not be decoded: {reason}")]
    Decode { reason: String },

    #[error("response had no body")]
    EmptyBody,

    #[error("request timed out")]
    Timeout,
}

impl QueryError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout => true,
            Self::Status { status } => *status >= 500 || *status == 429 || *status == 408,
            Self::Decode { .. } | Self::EmptyBody => false,
        }
    }
}

impl From<QueryError> for SourceError {
    fn from(e: QueryError) -> Self {
        SourceError::Acquisition {
            retryable: e.is_retryable(),
            message: e.to_string(),
        }
    }
}

/// Parameters for one remote query. `enabled` mirrors view focus; the data
/// source never issues a query while it is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    pub route: Route,
    pub enabled: bool,
}

/// The remote query service. Timeout and retry policy belong to the
/// implementation, not to the catalog core.
#[async_trait]
pub trait RemoteQuery: Send + Sync {
    async fn query_records(&self, params: &QueryParams) -> Result<Vec<RawRecord>, QueryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_retryable_acquisition_error() {
        let err: SourceError = QueryError::Status { status: 503 }.into();
        assert!(matches!(err, SourceError::Acquisition { retryable: true, .. }));

        let err: SourceError = QueryError::Status { status: 404 }.into();
        assert!(matches!(err, SourceError::Acquisition { retryable: false, .. }));
    }
}
