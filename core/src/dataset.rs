//! Report dataset — the fixed tables behind every chart.
//!
//! A `ReportDataset` is built once from `ReportTables`, validated, and then
//! only ever read. Nothing hands out `&mut` access to a table; a different
//! view of the data means building a new derived structure, not editing rows.
//!
//! VALIDATION (fail-fast, at construction):
//!   - category / label / key values are unique and non-empty per table
//!   - counts are non-negative, numeric values are finite and non-negative
//!   - each aggregate table is tagged with the kind its slot expects
//!   - the distribution table's stored percentages sum to 100 ± 1
//!   - cohort labels parse as `Mon-YY` and run strictly forward in time

use crate::{
    error::{ReportError, ReportResult},
    types::{AcvMillions, Count, Label},
    views::DAY_BINS,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ── Row types ────────────────────────────────────────────────────────────────

/// A single named headline figure, e.g. average onboarding days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub key: String,
    pub label: String,
    pub value: f64,
    pub unit: String,
}

impl MetricRow {
    pub fn new(key: &str, label: &str, value: f64, unit: &str) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            value,
            unit: unit.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveStatus {
    Live,
    NotLive,
}

impl LiveStatus {
    pub fn name(&self) -> &'static str {
        match self {
            LiveStatus::Live => "Live",
            LiveStatus::NotLive => "Not Live",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Churned,
}

impl AccountStatus {
    pub fn name(&self) -> &'static str {
        match self {
            AccountStatus::Active => "Active",
            AccountStatus::Churned => "Churned",
        }
    }
}

/// One customer segment. The treemap hierarchy is implied by
/// (live_status, status) and rebuilt by `hierarchy::build_segmentation_hierarchy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRow {
    pub live_status: LiveStatus,
    pub status: AccountStatus,
    pub category: Label,
    pub count: Count,
    pub acv_millions: AcvMillions,
}

impl SegmentRow {
    pub fn new(
        live_status: LiveStatus,
        status: AccountStatus,
        category: &str,
        count: Count,
        acv_millions: AcvMillions,
    ) -> Self {
        Self {
            live_status,
            status,
            category: category.into(),
            count,
            acv_millions,
        }
    }
}

/// Shared `(category, count, metric)` shape used by every breakdown table.
/// What the columns mean is decided by the table's `TableKind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAggregateRow {
    pub category: Label,
    pub count: Count,
    pub metric: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<f64>,
}

impl CategoryAggregateRow {
    pub fn new(category: &str, count: Count, metric: f64) -> Self {
        Self {
            category: category.into(),
            count,
            metric,
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, secondary: f64) -> Self {
        self.secondary = Some(secondary);
        self
    }
}

// ── Table kinds and columns ──────────────────────────────────────────────────

/// Addressable numeric columns of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Count,
    Metric,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Erp,
    Cohort,
    Distribution,
    AcvBand,
    NonLive,
    AtRisk,
}

impl TableKind {
    pub fn name(&self) -> &'static str {
        match self {
            TableKind::Erp => "erp",
            TableKind::Cohort => "cohort",
            TableKind::Distribution => "distribution",
            TableKind::AcvBand => "acv_band",
            TableKind::NonLive => "non_live",
            TableKind::AtRisk => "at_risk",
        }
    }

    /// Display name of the category column.
    pub fn category_column(&self) -> &'static str {
        match self {
            TableKind::Erp => "ERP",
            TableKind::Cohort => "Month",
            TableKind::Distribution => "Bin",
            TableKind::AcvBand => "ACV_Band",
            TableKind::NonLive => "Category",
            TableKind::AtRisk => "Reason",
        }
    }

    /// Display name of a numeric column, or None if this table has no such column.
    pub fn column_name(&self, column: Column) -> Option<&'static str> {
        match (self, column) {
            (TableKind::Erp, Column::Count) => Some("N"),
            (TableKind::Erp, Column::Metric) => Some("Average"),
            (TableKind::Erp, Column::Secondary) => Some("Median"),
            (TableKind::Cohort, Column::Metric) => Some("Avg_Days"),
            (TableKind::Distribution, Column::Count) => Some("Count"),
            (TableKind::Distribution, Column::Metric) => Some("Pct"),
            (TableKind::AcvBand, Column::Count) => Some("N"),
            (TableKind::AcvBand, Column::Metric) => Some("Avg_Days"),
            (TableKind::AcvBand, Column::Secondary) => Some("Avg_ACV"),
            (TableKind::NonLive, Column::Count) => Some("N"),
            (TableKind::NonLive, Column::Metric) => Some("ACV"),
            (TableKind::AtRisk, Column::Count) => Some("Count"),
            _ => None,
        }
    }

    /// Resolve a display column name (case-insensitive) to a `Column`.
    pub fn resolve(&self, name: &str) -> ReportResult<Column> {
        [Column::Count, Column::Metric, Column::Secondary]
            .into_iter()
            .find(|c| {
                self.column_name(*c)
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
            .ok_or_else(|| ReportError::UnknownColumn {
                table: self.name().into(),
                column: name.into(),
            })
    }
}

/// A tagged, ordered breakdown table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateTable {
    kind: TableKind,
    rows: Vec<CategoryAggregateRow>,
}

impl AggregateTable {
    pub fn new(kind: TableKind, rows: Vec<CategoryAggregateRow>) -> Self {
        Self { kind, rows }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn rows(&self) -> &[CategoryAggregateRow] {
        &self.rows
    }

    pub fn get(&self, category: &str) -> Option<&CategoryAggregateRow> {
        self.rows.iter().find(|r| r.category == category)
    }

    pub fn total_count(&self) -> Count {
        self.rows.iter().map(|r| r.count).sum()
    }

    pub fn total_metric(&self) -> f64 {
        self.rows.iter().map(|r| r.metric).sum()
    }
}

// ── Dataset ──────────────────────────────────────────────────────────────────

/// Raw input to `ReportDataset::new`. Fields are public so callers (and
/// tests) can assemble or tweak tables before validation.
#[derive(Debug, Clone)]
pub struct ReportTables {
    pub kpis: Vec<MetricRow>,
    pub segments: Vec<SegmentRow>,
    pub erp: AggregateTable,
    pub cohort: AggregateTable,
    pub distribution: AggregateTable,
    pub acv_bands: AggregateTable,
    pub non_live: AggregateTable,
    pub at_risk: AggregateTable,
    /// Pearson r between customer ACV and onboarding days, from the raw extract.
    pub acv_days_correlation: Option<f64>,
}

/// The validated, read-only analytics snapshot.
#[derive(Debug, Clone)]
pub struct ReportDataset {
    kpis: Vec<MetricRow>,
    segments: Vec<SegmentRow>,
    erp: AggregateTable,
    cohort: AggregateTable,
    distribution: AggregateTable,
    acv_bands: AggregateTable,
    non_live: AggregateTable,
    at_risk: AggregateTable,
    acv_days_correlation: Option<f64>,
}

impl ReportDataset {
    /// Validate and freeze a set of tables.
    pub fn new(tables: ReportTables) -> ReportResult<Self> {
        validate_kpis(&tables.kpis)?;
        validate_segments(&tables.segments)?;

        let slots = [
            (&tables.erp, TableKind::Erp),
            (&tables.cohort, TableKind::Cohort),
            (&tables.distribution, TableKind::Distribution),
            (&tables.acv_bands, TableKind::AcvBand),
            (&tables.non_live, TableKind::NonLive),
            (&tables.at_risk, TableKind::AtRisk),
        ];
        for (table, expected) in slots {
            validate_aggregate(table, expected)?;
        }
        validate_distribution(&tables.distribution)?;
        validate_cohort(&tables.cohort)?;
        if let Some(r) = tables.acv_days_correlation {
            if !(-1.0..=1.0).contains(&r) {
                return Err(ReportError::integrity(
                    "acv_band",
                    format!("correlation {r} is outside [-1, 1]"),
                ));
            }
        }

        log::debug!(
            "dataset: validated {} kpis, {} segments, {} breakdown tables",
            tables.kpis.len(),
            tables.segments.len(),
            slots.len()
        );

        Ok(Self {
            kpis: tables.kpis,
            segments: tables.segments,
            erp: tables.erp,
            cohort: tables.cohort,
            distribution: tables.distribution,
            acv_bands: tables.acv_bands,
            non_live: tables.non_live,
            at_risk: tables.at_risk,
            acv_days_correlation: tables.acv_days_correlation,
        })
    }

    /// The compiled-in Traild onboarding snapshot.
    pub fn builtin() -> ReportResult<Self> {
        Self::new(builtin_tables())
    }

    pub fn kpis(&self) -> &[MetricRow] {
        &self.kpis
    }

    pub fn kpi(&self, key: &str) -> Option<&MetricRow> {
        self.kpis.iter().find(|k| k.key == key)
    }

    pub fn segments(&self) -> &[SegmentRow] {
        &self.segments
    }

    pub fn erp(&self) -> &AggregateTable {
        &self.erp
    }

    pub fn cohort(&self) -> &AggregateTable {
        &self.cohort
    }

    pub fn distribution(&self) -> &AggregateTable {
        &self.distribution
    }

    pub fn acv_bands(&self) -> &AggregateTable {
        &self.acv_bands
    }

    pub fn non_live(&self) -> &AggregateTable {
        &self.non_live
    }

    pub fn at_risk(&self) -> &AggregateTable {
        &self.at_risk
    }

    pub fn acv_days_correlation(&self) -> Option<f64> {
        self.acv_days_correlation
    }
}

// ── Validation ───────────────────────────────────────────────────────────────

fn check_amount(table: &str, what: &str, label: &str, value: f64) -> ReportResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ReportError::integrity(
            table,
            format!("{what} for '{label}' must be finite and non-negative, got {value}"),
        ));
    }
    Ok(())
}

fn check_unique<'a>(
    table: &str,
    seen: &mut HashSet<&'a str>,
    label: &'a str,
) -> ReportResult<()> {
    if label.trim().is_empty() {
        return Err(ReportError::integrity(table, "empty label"));
    }
    if !seen.insert(label) {
        return Err(ReportError::integrity(
            table,
            format!("duplicate label '{label}'"),
        ));
    }
    Ok(())
}

fn validate_kpis(kpis: &[MetricRow]) -> ReportResult<()> {
    let mut keys = HashSet::new();
    let mut labels = HashSet::new();
    for kpi in kpis {
        check_unique("kpi", &mut keys, &kpi.key)?;
        check_unique("kpi", &mut labels, &kpi.label)?;
        check_amount("kpi", "value", &kpi.label, kpi.value)?;
    }
    Ok(())
}

fn validate_segments(segments: &[SegmentRow]) -> ReportResult<()> {
    let mut seen = HashSet::new();
    for row in segments {
        check_unique("segmentation", &mut seen, &row.category)?;
        if row.count < 0 {
            return Err(ReportError::integrity(
                "segmentation",
                format!("negative count {} for '{}'", row.count, row.category),
            ));
        }
        check_amount("segmentation", "ACV", &row.category, row.acv_millions)?;
    }
    Ok(())
}

fn validate_aggregate(table: &AggregateTable, expected: TableKind) -> ReportResult<()> {
    let name = expected.name();
    if table.kind != expected {
        return Err(ReportError::integrity(
            name,
            format!("table tagged as '{}'", table.kind.name()),
        ));
    }

    let mut seen = HashSet::new();
    for row in &table.rows {
        check_unique(name, &mut seen, &row.category)?;
        if row.count < 0 {
            return Err(ReportError::integrity(
                name,
                format!("negative count {} for '{}'", row.count, row.category),
            ));
        }
        check_amount(name, "metric", &row.category, row.metric)?;
        if let Some(secondary) = row.secondary {
            if expected.column_name(Column::Secondary).is_none() {
                return Err(ReportError::integrity(
                    name,
                    format!("'{}' carries a secondary value but the table has none", row.category),
                ));
            }
            check_amount(name, "secondary", &row.category, secondary)?;
        }
    }
    Ok(())
}

fn validate_distribution(table: &AggregateTable) -> ReportResult<()> {
    for row in &table.rows {
        if !DAY_BINS.iter().any(|b| b.label == row.category) {
            return Err(ReportError::integrity(
                "distribution",
                format!("'{}' is not a day bin", row.category),
            ));
        }
    }
    if table.rows.is_empty() {
        return Ok(());
    }
    let pct_total = table.total_metric();
    if (pct_total - 100.0).abs() > 1.0 {
        return Err(ReportError::integrity(
            "distribution",
            format!("percentages sum to {pct_total}, expected 100 ± 1"),
        ));
    }
    Ok(())
}

/// Parse a cohort label such as "Oct-24" into the first day of that month.
pub fn parse_cohort_month(label: &str) -> ReportResult<NaiveDate> {
    NaiveDate::parse_from_str(&format!("01-{label}"), "%d-%b-%y").map_err(|e| {
        ReportError::integrity("cohort", format!("'{label}' is not a Mon-YY month: {e}"))
    })
}

fn validate_cohort(table: &AggregateTable) -> ReportResult<()> {
    let mut prev: Option<NaiveDate> = None;
    for row in &table.rows {
        let month = parse_cohort_month(&row.category)?;
        if let Some(p) = prev {
            if month <= p {
                return Err(ReportError::integrity(
                    "cohort",
                    format!("'{}' is not after the previous cohort", row.category),
                ));
            }
        }
        prev = Some(month);
    }
    Ok(())
}

// ── Compiled-in data ─────────────────────────────────────────────────────────

/// Tables from the Oct 2024 – Jan 2025 CRM extract.
pub fn builtin_tables() -> ReportTables {
    use AccountStatus::{Active, Churned};
    use LiveStatus::{Live, NotLive};

    ReportTables {
        kpis: vec![
            MetricRow::new("avg_onboarding", "Avg Onboarding", 73.0, "days"),
            MetricRow::new("median_onboarding", "Median Onboarding", 49.0, "days"),
            MetricRow::new("pct_under_20", "% Onboarded <20 Days", 29.0, "%"),
            MetricRow::new("pct_20_to_40", "% Onboarded 20-40 Days", 11.0, "%"),
            MetricRow::new("at_risk_customers", "At Risk Customers", 72.0, "customers"),
            MetricRow::new("at_risk_acv", "At Risk ACV", 1.3, "$M"),
        ],
        segments: vec![
            SegmentRow::new(Live, Active, "Live-Active", 96, 1.7),
            SegmentRow::new(Live, Churned, "Live-Churned", 1, 0.02),
            SegmentRow::new(NotLive, Active, "Never Onboarded", 2, 0.02),
            SegmentRow::new(NotLive, Active, "On Hold", 90, 2.3),
            SegmentRow::new(NotLive, Active, "At Risk", 72, 1.3),
            SegmentRow::new(NotLive, Active, "Low Risk", 97, 3.3),
            SegmentRow::new(NotLive, Churned, "Not Live-Churned", 11, 0.3),
        ],
        erp: AggregateTable::new(
            TableKind::Erp,
            vec![
                CategoryAggregateRow::new("mb (MYOB)", 45, 79.0).with_secondary(43.0),
                CategoryAggregateRow::new("so (Syspro)", 23, 96.0).with_secondary(75.0),
                CategoryAggregateRow::new("at (Acumatica)", 11, 19.0).with_secondary(10.0),
                CategoryAggregateRow::new("xo (Xero)", 6, 29.0).with_secondary(29.0),
                CategoryAggregateRow::new("eo", 5, 60.0).with_secondary(48.0),
            ],
        ),
        // The extract records cohort averages only, so counts are zero.
        cohort: AggregateTable::new(
            TableKind::Cohort,
            vec![
                CategoryAggregateRow::new("Oct-24", 0, 65.0),
                CategoryAggregateRow::new("Nov-24", 0, 68.0),
                CategoryAggregateRow::new("Dec-24", 0, 74.0),
                CategoryAggregateRow::new("Jan-25", 0, 88.0),
            ],
        ),
        distribution: AggregateTable::new(
            TableKind::Distribution,
            vec![
                CategoryAggregateRow::new("0-20", 28, 29.0),
                CategoryAggregateRow::new("20-40", 10, 11.0),
                CategoryAggregateRow::new("40-60", 15, 16.0),
                CategoryAggregateRow::new("60-80", 8, 8.0),
                CategoryAggregateRow::new("80-100", 6, 6.0),
                CategoryAggregateRow::new("100+", 28, 29.0),
            ],
        ),
        acv_bands: AggregateTable::new(
            TableKind::AcvBand,
            vec![
                CategoryAggregateRow::new("<$5K", 11, 42.0).with_secondary(3864.0),
                CategoryAggregateRow::new("$5K-$10K", 21, 62.0).with_secondary(6911.0),
                CategoryAggregateRow::new("$10K-$25K", 44, 68.0).with_secondary(15294.0),
                CategoryAggregateRow::new("$25K-$50K", 14, 115.0).with_secondary(36667.0),
                CategoryAggregateRow::new("$50K+", 5, 116.0).with_secondary(69058.0),
            ],
        ),
        non_live: AggregateTable::new(
            TableKind::NonLive,
            vec![
                CategoryAggregateRow::new("Never Onboarded", 2, 0.023),
                CategoryAggregateRow::new("On Hold", 90, 2.3),
                CategoryAggregateRow::new("At Risk", 72, 1.3),
                CategoryAggregateRow::new("Low Risk", 97, 3.3),
            ],
        ),
        at_risk: AggregateTable::new(
            TableKind::AtRisk,
            vec![
                CategoryAggregateRow::new("No incoming comms", 54, 0.0),
                CategoryAggregateRow::new("Low response / other risk", 18, 0.0),
            ],
        ),
        acv_days_correlation: Some(0.25),
    }
}
