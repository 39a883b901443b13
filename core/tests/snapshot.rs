use onboarding_core::{
    config::ReportConfig,
    dataset::ReportDataset,
    error::ReportError,
    panels::{
        acv_bands, at_risk_breakdown, cohort_trend, distribution, erp_breakdown, kpi_cards,
        non_live_pipeline,
    },
    snapshot::{view_json, DashboardSnapshot, ViewName},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn dataset() -> ReportDataset {
    ReportDataset::builtin().unwrap()
}

// ── Panels ───────────────────────────────────────────────────────────────────

#[test]
fn kpi_cards_carry_unit_suffixes() {
    let cards = kpi_cards(&dataset(), &ReportConfig::default_test());
    let displays: Vec<&str> = cards.iter().map(|c| c.display.as_str()).collect();
    assert_eq!(
        displays,
        ["73 days", "49 days", "29%", "11%", "72 customers", "$1.3M"]
    );
}

#[test]
fn erp_bars_slowest_first_with_counts_in_labels() {
    let erp = erp_breakdown(&dataset()).unwrap();
    assert_eq!(erp.bars[0].label, "so (Syspro) N=23");
    assert_eq!(erp.bars[0].median_days, Some(75.0));
    assert_eq!(erp.bars.last().unwrap().label, "at (Acumatica) N=11");
}

/// The listed ERPs cover 90 of the 96 live & active customers.
#[test]
fn erp_headline_counts() {
    let erp = erp_breakdown(&dataset()).unwrap();
    assert_eq!(erp.total, 90, "sum of listed ERP counts");
    assert_eq!(erp.population, 96, "live & active segment count");
}

#[test]
fn distribution_headline_total() {
    let view = distribution(&dataset()).unwrap();
    assert_eq!(view.total, 95);
    assert_eq!(view.bars.len(), 6);
    assert_eq!(view.bars[0].bin, "0-20");
}

/// Onboarding time grew from 65 to 88 days across the cohorts: +35%.
#[test]
fn cohort_change_is_first_to_last() {
    let trend = cohort_trend(&dataset()).unwrap();
    assert_eq!(trend.points.len(), 4);
    assert_eq!(trend.change_pct, Some(35));
    assert!(trend.points.windows(2).all(|w| w[0].starts < w[1].starts));
}

#[test]
fn acv_band_shares_match_report() {
    let view = acv_bands(&dataset()).unwrap();
    let shares: Vec<i64> = view.bars.iter().map(|b| b.share_pct).collect();
    assert_eq!(shares, [12, 22, 46, 15, 5]);
    assert_eq!(view.bars[0].label, "12% (42 days)");
    assert_eq!(view.bars[4].avg_acv, Some(69058.0));
}

/// Band chart headline: N=95, r = 0.25 between ACV and days.
#[test]
fn acv_band_headline() {
    let view = acv_bands(&dataset()).unwrap();
    assert_eq!(view.total, 95);
    assert_eq!(view.acv_days_correlation, Some(0.25));
}

/// $2.3M on hold plus $1.3M at risk is the $3.6M headline.
#[test]
fn non_live_stuck_acv() {
    let pipeline = non_live_pipeline(&dataset(), &ReportConfig::default_test()).unwrap();
    assert!(
        (pipeline.stuck_acv_millions - 3.6).abs() < 1e-9,
        "stuck ACV = {}",
        pipeline.stuck_acv_millions
    );
    assert_eq!(pipeline.total_count, 261);
    assert_eq!(pipeline.bars[0].label, "Low Risk (N=97)");
    assert_eq!(pipeline.bars[0].acv_label, "$3.3M");
    assert_eq!(pipeline.bars[3].acv_label, "$0.02M");
}

#[test]
fn non_live_unknown_stuck_category_fails() {
    let mut config = ReportConfig::default_test();
    config.stuck_categories = vec!["Frozen".into()];
    let err = non_live_pipeline(&dataset(), &config).unwrap_err();
    assert!(matches!(err, ReportError::DataIntegrity { .. }), "got {err}");
}

#[test]
fn at_risk_reasons_split_75_25() {
    let breakdown = at_risk_breakdown(&dataset()).unwrap();
    assert_eq!(breakdown.total, 72);
    let labels: Vec<&str> = breakdown.reasons.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, ["54 (75%)", "18 (25%)"]);
}

// ── Snapshot ─────────────────────────────────────────────────────────────────

#[test]
fn snapshot_builds_and_serializes() {
    init_logging();
    let config = ReportConfig::default_test();
    let snapshot = DashboardSnapshot::build(&dataset(), &config).unwrap();

    assert_eq!(snapshot.title, config.title);
    assert_eq!(snapshot.segmentation.count, 369);

    let json: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
    for key in [
        "kpis",
        "segmentation",
        "erp",
        "cohort",
        "distribution",
        "acv_bands",
        "non_live",
        "at_risk",
    ] {
        assert!(json.get(key).is_some(), "snapshot JSON missing '{key}'");
    }
    assert_eq!(json["cohort"]["points"][0]["starts"], "2024-10-01");
}

/// Building twice from the same dataset gives identical snapshots.
#[test]
fn snapshot_is_deterministic() {
    let dataset = dataset();
    let config = ReportConfig::default_test();
    let a = DashboardSnapshot::build(&dataset, &config).unwrap();
    let b = DashboardSnapshot::build(&dataset, &config).unwrap();
    assert_eq!(a, b);
}

/// Every named view renders, and matches the same part of the full snapshot.
#[test]
fn each_view_matches_snapshot_section() {
    let dataset = dataset();
    let config = ReportConfig::default_test();
    let full = serde_json::to_value(DashboardSnapshot::build(&dataset, &config).unwrap()).unwrap();

    for view in ViewName::ALL {
        let parsed: ViewName = view.as_str().parse().unwrap();
        assert_eq!(parsed, view);

        let section = match view {
            ViewName::AcvBands => "acv_bands",
            other => other.as_str(),
        };
        let value = view_json(&dataset, &config, view).unwrap();
        assert_eq!(value, full[section], "view '{}' differs", view.as_str());
    }
}

#[test]
fn unknown_view_name_rejected() {
    assert!("treemap".parse::<ViewName>().is_err());
}
