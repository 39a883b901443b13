use onboarding_core::{
    dataset::{
        AggregateTable, CategoryAggregateRow, Column, LiveStatus, ReportDataset, SegmentRow,
        TableKind,
    },
    error::ReportError,
    views::{
        bucket_counts, bucket_label_for, compute_share_percent, compute_share_percent_by,
        rank_descending, rank_table_descending, DAY_BINS,
    },
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn dataset() -> ReportDataset {
    ReportDataset::builtin().unwrap()
}

fn short_erp(category: &str) -> &str {
    category.split_whitespace().next().unwrap_or(category)
}

// ── Share percent ────────────────────────────────────────────────────────────

/// 72 of the 270 non-live customers (excluding the two never onboarded)
/// is round(26.67) = 27%.
#[test]
fn at_risk_share_of_not_live_subset() {
    let dataset = dataset();
    let subset: Vec<SegmentRow> = dataset
        .segments()
        .iter()
        .filter(|s| s.live_status == LiveStatus::NotLive && s.category != "Never Onboarded")
        .cloned()
        .collect();
    assert_eq!(subset.iter().map(|s| s.count).sum::<i64>(), 270);

    let shared = compute_share_percent("not_live", &subset).unwrap();
    let at_risk = shared.iter().find(|s| s.row.category == "At Risk").unwrap();
    assert_eq!(at_risk.share_pct, 27);
}

/// Share columns sum to 100 within rounding, for every counted table.
#[test]
fn shares_sum_to_100_within_rounding() {
    let dataset = dataset();
    let tables = [
        dataset.erp(),
        dataset.distribution(),
        dataset.acv_bands(),
        dataset.non_live(),
        dataset.at_risk(),
    ];

    for table in tables {
        let shared = compute_share_percent(table.kind().name(), table.rows()).unwrap();
        let total: i64 = shared.iter().map(|s| s.share_pct).sum();
        assert!(
            (total - 100).abs() <= 1,
            "{} shares sum to {total}",
            table.kind().name()
        );
    }

    let segments = compute_share_percent("segmentation", dataset.segments()).unwrap();
    let total: i64 = segments.iter().map(|s| s.share_pct).sum();
    assert!((total - 100).abs() <= 1, "segmentation shares sum to {total}");
}

/// Recomputed distribution shares land within one point of the stored ones.
#[test]
fn recomputed_distribution_matches_stored() {
    let dataset = dataset();
    let table = dataset.distribution();
    let shared = compute_share_percent("distribution", table.rows()).unwrap();

    for s in &shared {
        assert!(
            (s.share_pct as f64 - s.row.metric).abs() <= 1.0,
            "bin {}: computed {} vs stored {}",
            s.row.category,
            s.share_pct,
            s.row.metric
        );
    }
}

#[test]
fn share_over_zero_total_fails() {
    let empty: Vec<SegmentRow> = Vec::new();
    let err = compute_share_percent("empty", &empty).unwrap_err();
    assert!(matches!(err, ReportError::DivideByZero { ref table } if table == "empty"));

    let dataset = dataset();
    let err = compute_share_percent("cohort", dataset.cohort().rows()).unwrap_err();
    assert!(matches!(err, ReportError::DivideByZero { .. }));
}

/// Share can also be taken over a value column, e.g. ACV per category.
#[test]
fn share_by_named_column() {
    let dataset = dataset();
    let shared = compute_share_percent_by(dataset.non_live(), "ACV").unwrap();
    let low_risk = shared.iter().find(|s| s.row.category == "Low Risk").unwrap();
    // 3.3 / 6.923
    assert_eq!(low_risk.share_pct, 48);

    let err = compute_share_percent_by(dataset.non_live(), "Median").unwrap_err();
    assert!(matches!(err, ReportError::UnknownColumn { .. }));
}

/// A row missing the requested column fails instead of counting as zero.
#[test]
fn share_by_column_missing_on_a_row_fails() {
    let table = AggregateTable::new(
        TableKind::Erp,
        vec![
            CategoryAggregateRow::new("a", 3, 40.0).with_secondary(50.0),
            CategoryAggregateRow::new("b", 2, 30.0),
        ],
    );

    let err = compute_share_percent_by(&table, "Median").unwrap_err();
    match err {
        ReportError::DataIntegrity { table, reason } => {
            assert_eq!(table, "erp");
            assert!(reason.contains("'b'"), "row not named: {reason}");
        }
        other => panic!("Expected DataIntegrity, got {other}"),
    }

    // Columns every row carries still work on the same table.
    let shared = compute_share_percent_by(&table, "Average").unwrap();
    assert_eq!(shared.iter().map(|s| s.share_pct).collect::<Vec<_>>(), [57, 43]);
}

// ── Ranking ──────────────────────────────────────────────────────────────────

#[test]
fn erp_ranked_by_average() {
    let dataset = dataset();
    let ranked = rank_table_descending(dataset.erp(), "Average").unwrap();
    let order: Vec<&str> = ranked.rows().iter().map(|r| short_erp(&r.category)).collect();
    assert_eq!(order, ["so", "mb", "eo", "xo", "at"]);
}

#[test]
fn erp_ranked_by_median_and_count() {
    let dataset = dataset();

    let by_median = rank_table_descending(dataset.erp(), "Median").unwrap();
    let order: Vec<&str> = by_median.rows().iter().map(|r| short_erp(&r.category)).collect();
    assert_eq!(order, ["so", "eo", "mb", "xo", "at"]);

    let by_count = rank_table_descending(dataset.erp(), "N").unwrap();
    let order: Vec<&str> = by_count.rows().iter().map(|r| short_erp(&r.category)).collect();
    assert_eq!(order, ["mb", "so", "at", "xo", "eo"]);
}

/// Stable: ties keep input order, and ranking twice changes nothing.
#[test]
fn rank_is_stable_and_idempotent() {
    let dataset = dataset();
    // Distribution has two bins with 28 and two bins with 29%.
    let once = rank_descending(dataset.distribution().rows(), Column::Count);
    let labels: Vec<&str> = once.iter().map(|r| r.category.as_str()).collect();
    assert_eq!(labels, ["0-20", "100+", "40-60", "20-40", "60-80", "80-100"]);

    let twice = rank_descending(&once, Column::Count);
    assert_eq!(once, twice);
}

#[test]
fn rank_by_unknown_column_fails() {
    let dataset = dataset();
    let err = rank_table_descending(dataset.erp(), "Colour").unwrap_err();
    assert!(
        matches!(err, ReportError::UnknownColumn { ref column, .. } if column == "Colour"),
        "got {err}"
    );
}

// ── Binning ──────────────────────────────────────────────────────────────────

#[test]
fn bin_edges() {
    assert_eq!(bucket_label_for(19.0).unwrap(), "0-20");
    assert_eq!(bucket_label_for(20.0).unwrap(), "20-40");
    assert_eq!(bucket_label_for(99.5).unwrap(), "80-100");
    assert_eq!(bucket_label_for(150.0).unwrap(), "100+");
}

/// Raw day counts bucket into the same six bins, empty bins included.
#[test]
fn bucket_counts_builds_distribution() {
    let days = [3.0, 19.0, 20.0, 45.0, 101.0, 250.0, 12.0, 61.0];
    let table = bucket_counts(&days).unwrap();

    let labels: Vec<&str> = table.rows().iter().map(|r| r.category.as_str()).collect();
    let expected: Vec<&str> = DAY_BINS.iter().map(|b| b.label).collect();
    assert_eq!(labels, expected);

    let counts: Vec<i64> = table.rows().iter().map(|r| r.count).collect();
    assert_eq!(counts, [3, 1, 1, 1, 0, 2]);
    assert_eq!(table.total_count(), days.len() as i64);
    // 3 of 8 = 37.5 -> 38
    assert_eq!(table.get("0-20").unwrap().metric, 38.0);
}

#[test]
fn bucket_counts_rejects_empty_and_negative() {
    assert!(matches!(
        bucket_counts(&[]),
        Err(ReportError::DivideByZero { .. })
    ));
    assert!(matches!(
        bucket_counts(&[10.0, -4.0]),
        Err(ReportError::DataIntegrity { .. })
    ));
}
