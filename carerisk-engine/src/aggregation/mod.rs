//! Tier aggregation engine
//!
//! Read-only rollups over the prediction store, always scoped to one
//! [`PredictionWindow`](carerisk_common::PredictionWindow) except for the
//! cross-window trend. Rows are never mutated here.

mod error;
pub mod members;
pub mod rollups;

pub use error::AggregationError;
pub use members::{
    list_department_members, list_members, priority_members, MemberQuery, MemberRecord,
};
pub use rollups::{
    department_analytics, department_summary, roi_financial_impact, summary, tier_counts,
    tier_financials, tier_statistics, trend, DepartmentAnalytics, DepartmentSummary,
    RoiFinancialImpact, TierBreakdown, TierCount, TierFinancials, TierStatistics, TrendPoint,
    WindowSummary,
};

use carerisk_common::{Error, RiskTier};
use std::collections::BTreeSet;

/// Parse a comma-separated tier list (`"4,5"`); blank input means all tiers
pub fn parse_tier_set(raw: Option<&str>) -> Result<BTreeSet<RiskTier>, AggregationError> {
    let Some(raw) = raw else {
        return Ok(BTreeSet::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<RiskTier>()
                .map_err(|e: Error| AggregationError::InvalidInput(e.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tier_set() {
        assert!(parse_tier_set(None).unwrap().is_empty());
        assert!(parse_tier_set(Some("")).unwrap().is_empty());
        assert!(parse_tier_set(Some(" , ")).unwrap().is_empty());

        let tiers = parse_tier_set(Some("5, 4,4")).unwrap();
        assert_eq!(
            tiers.into_iter().collect::<Vec<_>>(),
            vec![RiskTier::High, RiskTier::Critical]
        );
    }

    #[test]
    fn test_parse_tier_set_rejects_out_of_range() {
        assert!(matches!(
            parse_tier_set(Some("3,6")),
            Err(AggregationError::InvalidInput(_))
        ));
        assert!(parse_tier_set(Some("high")).is_err());
    }
}
