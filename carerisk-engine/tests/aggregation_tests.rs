//! Integration tests for the tier aggregation engine against a seeded store

mod helpers;

use carerisk_common::{PredictionWindow, RiskTier, RoiCategory};
use carerisk_engine::aggregation::{self, AggregationError, MemberQuery};
use carerisk_engine::pagination::{Paging, DEPARTMENT_PAGE_SIZE, MEMBER_PAGE_SIZE};
use helpers::{assert_close, empty_pool, fixture_pool, CARDIOLOGY, ONCOLOGY};
use std::collections::BTreeSet;

fn all_members(window: PredictionWindow) -> MemberQuery {
    MemberQuery::new(window, Paging::new(None, None, MEMBER_PAGE_SIZE))
}

// =============================================================================
// Summary
// =============================================================================

#[tokio::test]
async fn test_summary_counts_active_members_only() {
    let pool = fixture_pool().await;

    let summary = aggregation::summary(&pool, PredictionWindow::Day30).await.unwrap();

    assert_eq!(summary.total_members, 6);
    assert_eq!(summary.tier_counts.critical, 1);
    assert_eq!(summary.tier_counts.high, 2);
    assert_eq!(summary.tier_counts.moderate, 1);
    assert_eq!(summary.tier_counts.low, 1);
    assert_eq!(summary.tier_counts.normal, 1);
    assert_close(summary.total_projected_cost, 27000.0);
    assert_close(summary.total_intervention_cost, 6300.0);
    assert_close(summary.total_potential_savings, 10300.0);
    assert_close(summary.total_net_benefit, 4000.0);
    assert_close(summary.avg_roi_percent, 63.49);
    assert_eq!(summary.high_risk_count, 3);
    assert_close(summary.high_risk_percentage, 50.0);
}

#[tokio::test]
async fn test_summary_empty_window_is_all_zero() {
    let pool = fixture_pool().await;

    let summary = aggregation::summary(&pool, PredictionWindow::Day90).await.unwrap();

    assert_eq!(summary.total_members, 0);
    for tier in RiskTier::ALL {
        assert_eq!(summary.tier_counts.count(tier), 0);
    }
    assert_eq!(summary.total_projected_cost, 0.0);
    assert_eq!(summary.total_intervention_cost, 0.0);
    assert_eq!(summary.avg_roi_percent, 0.0);
    assert_eq!(summary.high_risk_count, 0);
    assert_eq!(summary.high_risk_percentage, 0.0);
}

#[tokio::test]
async fn test_summary_on_empty_store() {
    let pool = empty_pool().await;

    let summary = aggregation::summary(&pool, PredictionWindow::Day30).await.unwrap();

    assert_eq!(summary.total_members, 0);
    assert_eq!(summary.avg_roi_percent, 0.0);
}

// =============================================================================
// Per-tier and per-department rollups
// =============================================================================

#[tokio::test]
async fn test_tier_statistics_ordered_highest_first() {
    let pool = fixture_pool().await;

    let stats = aggregation::tier_statistics(&pool, PredictionWindow::Day30).await.unwrap();

    let tiers: Vec<_> = stats.iter().map(|s| s.risk_tier).collect();
    assert_eq!(
        tiers,
        vec![
            RiskTier::Critical,
            RiskTier::High,
            RiskTier::Moderate,
            RiskTier::Low,
            RiskTier::Normal
        ]
    );

    let high = &stats[1];
    assert_eq!(high.tier_label, "High Risk");
    assert_eq!(high.member_count, 2);
    assert_close(high.avg_risk_score, 0.78);
    assert_close(high.min_risk_score, 0.75);
    assert_close(high.max_risk_score, 0.81);
    assert_close(high.total_net_benefit, 500.0);
    assert_close(high.avg_roi.unwrap(), 16.67);

    // Only member of tier 1 has no ROI
    assert_eq!(stats[4].avg_roi, None);
}

#[tokio::test]
async fn test_department_summary_ordered_by_high_risk_count() {
    let pool = fixture_pool().await;

    let departments = aggregation::department_summary(&pool, PredictionWindow::Day30)
        .await
        .unwrap();

    let names: Vec<_> = departments.iter().map(|d| d.department_name.as_str()).collect();
    assert_eq!(names, vec![CARDIOLOGY, ONCOLOGY]);

    let cardiology = &departments[0];
    assert_eq!(cardiology.total_members, 2);
    assert_eq!(cardiology.high_risk_count, 2);
    assert_close(cardiology.total_potential_savings, 7500.0);
    assert_eq!(cardiology.specialty_type.as_deref(), Some("Cardiac"));

    let oncology = &departments[1];
    assert_eq!(oncology.total_members, 3);
    assert_eq!(oncology.high_risk_count, 1);
    assert_close(oncology.avg_risk_score, 0.5);
}

// =============================================================================
// Priority ranking
// =============================================================================

#[tokio::test]
async fn test_priority_members_high_tier_positive_roi_only() {
    let pool = fixture_pool().await;

    let priority = aggregation::priority_members(&pool, PredictionWindow::Day30, 10)
        .await
        .unwrap();

    let ids: Vec<_> = priority.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 2]);

    for member in &priority {
        assert!(member.risk_tier >= RiskTier::High);
        assert!(member.roi_percent.unwrap() > 0.0);
    }
    for pair in priority.windows(2) {
        assert!(pair[0].net_benefit > pair[1].net_benefit);
    }

    assert_eq!(priority[0].roi_category, RoiCategory::Excellent);
    assert_eq!(priority[0].name, "Patient MBR0001");
    assert_eq!(priority[0].department.as_deref(), Some(CARDIOLOGY));
}

#[tokio::test]
async fn test_priority_members_respects_limit() {
    let pool = fixture_pool().await;

    let priority = aggregation::priority_members(&pool, PredictionWindow::Day30, 1)
        .await
        .unwrap();

    assert_eq!(priority.len(), 1);
    assert_eq!(priority[0].id, 1);
}

// =============================================================================
// Trend across windows
// =============================================================================

#[tokio::test]
async fn test_trend_has_one_row_per_window_in_order() {
    let pool = fixture_pool().await;

    let trend = aggregation::trend(&pool).await.unwrap();

    let windows: Vec<_> = trend.iter().map(|t| t.window).collect();
    assert_eq!(windows, PredictionWindow::ALL.to_vec());

    assert_eq!(trend[0].total_members, 6);
    assert_eq!(trend[0].high_risk_count, 3);
    assert_close(trend[0].avg_roi_percent, 63.49);

    assert_eq!(trend[1].total_members, 2);
    assert_close(trend[1].avg_risk_score, 0.75);
    assert_close(trend[1].total_cost, 29000.0);

    assert_eq!(trend[2].total_members, 0);
    assert_eq!(trend[2].days, 90);
    assert_eq!(trend[2].window_label, "Months 1-3 (0-90 days)");
    assert_eq!(trend[2].avg_roi_percent, 0.0);
}

// =============================================================================
// Member listings
// =============================================================================

#[tokio::test]
async fn test_members_tier_filter_is_exact_set() {
    let pool = fixture_pool().await;

    let query = all_members(PredictionWindow::Day30).with_tiers([RiskTier::High, RiskTier::Critical]);
    let page = aggregation::list_members(&pool, &query).await.unwrap();

    let ids: Vec<_> = page.rows.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(page
        .rows
        .iter()
        .all(|m| matches!(m.risk_tier, RiskTier::High | RiskTier::Critical)));

    // Non-contiguous set, not a range
    let query = all_members(PredictionWindow::Day30).with_tiers([RiskTier::Normal, RiskTier::Critical]);
    let page = aggregation::list_members(&pool, &query).await.unwrap();
    let ids: Vec<_> = page.rows.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 5]);
}

#[tokio::test]
async fn test_members_empty_tier_set_returns_all_tiers() {
    let pool = fixture_pool().await;

    let page = aggregation::list_members(&pool, &all_members(PredictionWindow::Day30))
        .await
        .unwrap();

    assert_eq!(page.count, 6);
    let scores: Vec<_> = page.rows.iter().map(|m| m.risk_score).collect();
    let mut sorted = scores.clone();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
    assert_eq!(scores, sorted);

    let tiers: BTreeSet<_> = page.rows.iter().map(|m| m.risk_tier).collect();
    assert_eq!(tiers.len(), 5);
}

#[tokio::test]
async fn test_members_excludes_inactive_and_superseded() {
    let pool = fixture_pool().await;

    let query = all_members(PredictionWindow::Day30).with_tiers([RiskTier::Critical]);
    let page = aggregation::list_members(&pool, &query).await.unwrap();

    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0].id, 1);
}

#[tokio::test]
async fn test_members_pagination() {
    let pool = fixture_pool().await;

    let query = MemberQuery::new(
        PredictionWindow::Day30,
        Paging::new(Some(2), Some(1), MEMBER_PAGE_SIZE),
    );
    let page = aggregation::list_members(&pool, &query).await.unwrap();

    assert_eq!(page.limit, 2);
    assert_eq!(page.offset, 1);
    assert_eq!(page.count, 2);
    let ids: Vec<_> = page.rows.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![2, 3]);
}

#[tokio::test]
async fn test_member_without_roi_is_null_and_no_roi_category() {
    let pool = fixture_pool().await;

    let query = all_members(PredictionWindow::Day30).with_tiers([RiskTier::Normal]);
    let page = aggregation::list_members(&pool, &query).await.unwrap();

    let member = &page.rows[0];
    assert_eq!(member.id, 5);
    assert_eq!(member.roi_percent, None);
    assert_eq!(member.roi_category, RoiCategory::NoRoi);
    assert_eq!(member.department, None);
}

#[tokio::test]
async fn test_department_members() {
    let pool = fixture_pool().await;
    let paging = Paging::new(None, None, DEPARTMENT_PAGE_SIZE);

    let page = aggregation::list_department_members(
        &pool,
        ONCOLOGY,
        PredictionWindow::Day30,
        BTreeSet::new(),
        paging,
    )
    .await
    .unwrap();
    assert_eq!(page.limit, 1000);
    let ids: Vec<_> = page.rows.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![3, 4, 7]);

    let page = aggregation::list_department_members(
        &pool,
        ONCOLOGY,
        PredictionWindow::Day30,
        BTreeSet::from([RiskTier::Moderate]),
        paging,
    )
    .await
    .unwrap();
    let ids: Vec<_> = page.rows.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![4]);

    let page = aggregation::list_department_members(
        &pool,
        "Neurology",
        PredictionWindow::Day30,
        BTreeSet::new(),
        paging,
    )
    .await
    .unwrap();
    assert_eq!(page.count, 0);
}

#[tokio::test]
async fn test_department_members_requires_name() {
    let pool = fixture_pool().await;

    let result = aggregation::list_department_members(
        &pool,
        "  ",
        PredictionWindow::Day30,
        BTreeSet::new(),
        Paging::new(None, None, DEPARTMENT_PAGE_SIZE),
    )
    .await;

    assert!(matches!(result, Err(AggregationError::InvalidInput(_))));
}

// =============================================================================
// Tier counts, ROI impact and department analytics
// =============================================================================

#[tokio::test]
async fn test_tier_counts() {
    let pool = fixture_pool().await;

    let counts = aggregation::tier_counts(&pool, PredictionWindow::Day30).await.unwrap();

    assert_eq!(counts.len(), 5);
    assert_eq!(counts[0].risk_tier, RiskTier::Critical);
    assert_eq!(counts[0].patient_count, 1);
    assert_close(counts[0].avg_success_rate, 35.0);
    assert_eq!(counts[1].patient_count, 2);
    assert_close(counts[1].avg_success_rate, 30.0);
}

#[tokio::test]
async fn test_tier_financials_ordered_lowest_first() {
    let pool = fixture_pool().await;

    let tiers = aggregation::tier_financials(&pool, PredictionWindow::Day30)
        .await
        .unwrap();

    assert_eq!(
        tiers.iter().map(|t| t.risk_tier).collect::<Vec<_>>(),
        RiskTier::ALL.to_vec()
    );

    let high = &tiers[3];
    assert_eq!(high.tier_name, "High Risk");
    assert_eq!(high.window, PredictionWindow::Day30);
    assert_eq!(high.patient_count, 2);
    assert_close(high.avg_risk_score, 0.78);
    assert_close(high.total_projected_cost, 11000.0);
    assert_close(high.total_intervention_cost, 3000.0);
    assert_close(high.total_expected_savings, 3500.0);
    assert_close(high.total_net_benefit, 500.0);
    // Pooled: 500 / 3000
    assert_close(high.tier_roi_percent.unwrap(), 16.67);
    assert_close(high.avg_success_rate, 30.0);

    assert_close(tiers[4].tier_roi_percent.unwrap(), 150.0);

    // Tier 1 projects no intervention cost
    assert_eq!(tiers[0].tier_roi_percent, None);
    assert_close(tiers[0].avg_success_rate, 10.0);

    let empty = aggregation::tier_financials(&pool, PredictionWindow::Day90)
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_roi_financial_impact() {
    let pool = fixture_pool().await;

    let impact = aggregation::roi_financial_impact(&pool, PredictionWindow::Day30)
        .await
        .unwrap();

    assert_close(impact.projected_costs, 27000.0);
    assert_close(impact.intervention_costs, 6300.0);
    assert_close(impact.total_savings, 10300.0);
    assert_close(impact.actual_costs, 16700.0);
    assert_close(impact.savings_percentage, 38.15);
    assert_eq!(impact.high_risk_members, 3);

    let empty = aggregation::roi_financial_impact(&pool, PredictionWindow::Day90)
        .await
        .unwrap();
    assert_eq!(empty.savings_percentage, 0.0);
}

#[tokio::test]
async fn test_department_analytics() {
    let pool = fixture_pool().await;

    let analytics = aggregation::department_analytics(&pool, PredictionWindow::Day30)
        .await
        .unwrap();

    // Geriatrics has no members and is omitted
    assert_eq!(analytics.len(), 2);

    let oncology = &analytics[0];
    assert_eq!(oncology.department_name, ONCOLOGY);
    assert_eq!(oncology.total_patients, 3);
    assert_eq!(oncology.critical_count, 0);
    assert_eq!(oncology.high_count, 1);
    assert_eq!(oncology.medium_count, 1);
    assert_eq!(oncology.low_count, 1);
    assert_eq!(oncology.tier_counts.low, 1);
    assert_close(oncology.avg_risk_score, 0.5);
    assert_close(oncology.max_risk_score, 0.75);
    assert_close(oncology.avg_roi_percent.unwrap(), 0.0);

    let cardiology = &analytics[1];
    assert_eq!(cardiology.total_patients, 2);
    assert_close(cardiology.avg_roi_percent.unwrap(), 114.29);
}
