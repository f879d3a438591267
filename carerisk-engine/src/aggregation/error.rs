//! Aggregation error types

use carerisk_common::RiskTier;
use thiserror::Error;

/// Failure of a whole rollup; partial results are never returned
#[derive(Debug, Error)]
pub enum AggregationError {
    /// Underlying store query failed
    #[error("Aggregation query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// Caller supplied an unusable parameter
    #[error("Invalid aggregation input: {0}")]
    InvalidInput(String),

    /// A stored row violates the store's value ranges
    #[error("Invalid stored row: {0}")]
    InvalidRow(String),
}

impl AggregationError {
    pub fn kind(&self) -> &'static str {
        match self {
            AggregationError::Query(_) => "AggregationQueryError",
            AggregationError::InvalidInput(_) => "ValidationError",
            AggregationError::InvalidRow(_) => "AggregationQueryError",
        }
    }
}

/// Decode a stored tier column
pub(crate) fn stored_tier(value: i64) -> Result<RiskTier, AggregationError> {
    RiskTier::try_from(value).map_err(|e| AggregationError::InvalidRow(e.to_string()))
}
