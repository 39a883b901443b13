//! Per-chart views of the report.
//!
//! Each builder reads one or two dataset tables and returns the rows a chart
//! draws, already ordered and labelled. Colors and layout are left to the
//! presentation layer.

use crate::{
    config::ReportConfig,
    dataset::{parse_cohort_month, AccountStatus, Column, LiveStatus, ReportDataset},
    error::{ReportError, ReportResult},
    format,
    types::{AcvMillions, Count, SharePct},
    views::{compute_share_percent, rank_descending, rank_table_descending, share_of},
};
use chrono::NaiveDate;
use serde::Serialize;

// ── KPI cards ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiCard {
    pub key: String,
    pub title: String,
    pub value: f64,
    pub display: String,
}

pub fn kpi_cards(dataset: &ReportDataset, config: &ReportConfig) -> Vec<KpiCard> {
    dataset
        .kpis()
        .iter()
        .map(|k| KpiCard {
            key: k.key.clone(),
            title: k.label.clone(),
            value: k.value,
            display: format::metric(k, &config.labels),
        })
        .collect()
}

// ── ERP ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErpBar {
    pub erp: String,
    /// "mb (MYOB) N=45"
    pub label: String,
    pub count: Count,
    pub average_days: f64,
    pub median_days: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErpBreakdown {
    /// Customers covered by the listed ERPs.
    pub total: Count,
    /// Live & active customers the ERP split is drawn from.
    pub population: Count,
    pub bars: Vec<ErpBar>,
}

/// ERP rows, slowest average first.
pub fn erp_breakdown(dataset: &ReportDataset) -> ReportResult<ErpBreakdown> {
    let ranked = rank_table_descending(dataset.erp(), "Average")?;
    let bars = ranked
        .rows()
        .iter()
        .map(|r| ErpBar {
            erp: r.category.clone(),
            label: format!("{} N={}", r.category, r.count),
            count: r.count,
            average_days: r.metric,
            median_days: r.secondary,
        })
        .collect();

    let population = dataset
        .segments()
        .iter()
        .filter(|s| s.live_status == LiveStatus::Live && s.status == AccountStatus::Active)
        .map(|s| s.count)
        .sum();

    Ok(ErpBreakdown {
        total: ranked.total_count(),
        population,
        bars,
    })
}

// ── Cohort trend ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortPoint {
    pub month: String,
    pub starts: NaiveDate,
    pub avg_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortTrend {
    pub points: Vec<CohortPoint>,
    /// First-to-last change in average days, in whole percent.
    /// None with fewer than two cohorts.
    pub change_pct: Option<SharePct>,
}

pub fn cohort_trend(dataset: &ReportDataset) -> ReportResult<CohortTrend> {
    let points = dataset
        .cohort()
        .rows()
        .iter()
        .map(|r| {
            Ok(CohortPoint {
                month: r.category.clone(),
                starts: parse_cohort_month(&r.category)?,
                avg_days: r.metric,
            })
        })
        .collect::<ReportResult<Vec<_>>>()?;

    let change_pct = match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() > 1 => {
            if first.avg_days == 0.0 {
                return Err(ReportError::DivideByZero {
                    table: "cohort".into(),
                });
            }
            Some((100.0 * (last.avg_days - first.avg_days) / first.avg_days).round() as SharePct)
        }
        _ => None,
    };

    Ok(CohortTrend { points, change_pct })
}

// ── Distribution ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionBar {
    pub bin: String,
    pub count: Count,
    /// Percentage as published in the extract.
    pub stored_pct: SharePct,
    /// Percentage recomputed from the counts.
    pub computed_pct: SharePct,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionView {
    pub total: Count,
    pub bars: Vec<DistributionBar>,
}

pub fn distribution(dataset: &ReportDataset) -> ReportResult<DistributionView> {
    let table = dataset.distribution();
    let shared = compute_share_percent(table.kind().name(), table.rows())?;
    let bars: Vec<DistributionBar> = shared
        .into_iter()
        .map(|s| DistributionBar {
            stored_pct: s.row.metric.round() as SharePct,
            computed_pct: s.share_pct,
            count: s.row.count,
            bin: s.row.category,
        })
        .collect();

    for bar in &bars {
        if (bar.stored_pct - bar.computed_pct).abs() > 1 {
            log::warn!(
                "distribution: bin {} stores {}% but counts give {}%",
                bar.bin,
                bar.stored_pct,
                bar.computed_pct
            );
        }
    }
    Ok(DistributionView {
        total: table.total_count(),
        bars,
    })
}

// ── ACV bands ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcvBandBar {
    pub band: String,
    pub count: Count,
    pub share_pct: SharePct,
    pub avg_days: f64,
    pub avg_acv: Option<f64>,
    /// "12% (42 days)"
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcvBandsView {
    pub total: Count,
    /// Correlation between ACV and onboarding days, when the extract has it.
    pub acv_days_correlation: Option<f64>,
    pub bars: Vec<AcvBandBar>,
}

/// Share of customers per ACV band, in band order.
pub fn acv_bands(dataset: &ReportDataset) -> ReportResult<AcvBandsView> {
    let table = dataset.acv_bands();
    let shared = compute_share_percent(table.kind().name(), table.rows())?;
    let bars = shared
        .into_iter()
        .map(|s| AcvBandBar {
            label: format!(
                "{} ({} days)",
                format::percent(s.share_pct),
                format::number(s.row.metric)
            ),
            band: s.row.category,
            count: s.row.count,
            share_pct: s.share_pct,
            avg_days: s.row.metric,
            avg_acv: s.row.secondary,
        })
        .collect();

    Ok(AcvBandsView {
        total: table.total_count(),
        acv_days_correlation: dataset.acv_days_correlation(),
        bars,
    })
}

// ── Non-live pipeline ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NonLiveBar {
    pub category: String,
    /// "At Risk (N=72)"
    pub label: String,
    pub count: Count,
    pub acv_millions: AcvMillions,
    pub acv_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NonLivePipeline {
    pub bars: Vec<NonLiveBar>,
    pub total_count: Count,
    pub total_acv_millions: AcvMillions,
    /// ACV held in the configured "stuck" categories.
    pub stuck_acv_millions: AcvMillions,
    pub stuck_categories: Vec<String>,
}

/// Non-live categories, largest ACV first.
pub fn non_live_pipeline(
    dataset: &ReportDataset,
    config: &ReportConfig,
) -> ReportResult<NonLivePipeline> {
    let table = dataset.non_live();

    let mut stuck_acv_millions = 0.0;
    for name in &config.stuck_categories {
        let row = table.get(name).ok_or_else(|| {
            ReportError::integrity(
                table.kind().name(),
                format!("stuck category '{name}' is not in the table"),
            )
        })?;
        stuck_acv_millions += row.metric;
    }

    let bars = rank_descending(table.rows(), Column::Metric)
        .into_iter()
        .map(|r| NonLiveBar {
            label: format!("{} (N={})", r.category, r.count),
            acv_label: format::acv_millions(r.metric, &config.labels),
            count: r.count,
            acv_millions: r.metric,
            category: r.category,
        })
        .collect();

    Ok(NonLivePipeline {
        bars,
        total_count: table.total_count(),
        total_acv_millions: table.total_metric(),
        stuck_acv_millions,
        stuck_categories: config.stuck_categories.clone(),
    })
}

// ── At-risk breakdown ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtRiskReason {
    pub reason: String,
    pub count: Count,
    pub share_pct: SharePct,
    /// "54 (75%)"
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtRiskBreakdown {
    pub total: Count,
    pub reasons: Vec<AtRiskReason>,
}

pub fn at_risk_breakdown(dataset: &ReportDataset) -> ReportResult<AtRiskBreakdown> {
    let table = dataset.at_risk();
    let counts: Vec<f64> = table.rows().iter().map(|r| r.count as f64).collect();
    let shares = share_of(table.kind().name(), &counts)?;

    let total = table.total_count();
    if let Some(kpi) = dataset.kpi("at_risk_customers") {
        if kpi.value != total as f64 {
            log::warn!(
                "at_risk: breakdown totals {total} but KPI reports {}",
                kpi.value
            );
        }
    }

    let reasons = table
        .rows()
        .iter()
        .zip(shares)
        .map(|(r, share_pct)| AtRiskReason {
            reason: r.category.clone(),
            count: r.count,
            share_pct,
            label: format!("{} ({})", r.count, format::percent(share_pct)),
        })
        .collect();

    Ok(AtRiskBreakdown { total, reasons })
}
