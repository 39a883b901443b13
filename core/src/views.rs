//! Derived-view operations over dataset tables.
//!
//! Every function here is pure: same input, same output, no caching.
//! The dataset is a few dozen rows, so recomputing per view is free.

use crate::{
    dataset::{AggregateTable, CategoryAggregateRow, Column, SegmentRow, TableKind},
    error::{ReportError, ReportResult},
    types::{Count, SharePct},
};
use serde::Serialize;

// ── Row traits ───────────────────────────────────────────────────────────────

/// Rows that carry a count and can contribute to a share column.
pub trait Counted {
    fn label(&self) -> &str;
    fn count(&self) -> Count;
}

/// Rows with addressable numeric columns, used for ranking.
pub trait Ranked {
    fn value(&self, column: Column) -> Option<f64>;
}

impl Counted for SegmentRow {
    fn label(&self) -> &str {
        &self.category
    }
    fn count(&self) -> Count {
        self.count
    }
}

impl Counted for CategoryAggregateRow {
    fn label(&self) -> &str {
        &self.category
    }
    fn count(&self) -> Count {
        self.count
    }
}

impl Ranked for CategoryAggregateRow {
    fn value(&self, column: Column) -> Option<f64> {
        match column {
            Column::Count => Some(self.count as f64),
            Column::Metric => Some(self.metric),
            Column::Secondary => self.secondary,
        }
    }
}

// ── Share percent ────────────────────────────────────────────────────────────

/// A row with its whole-number share of the table total appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shared<R> {
    #[serde(flatten)]
    pub row: R,
    pub share_pct: SharePct,
}

/// `round(100 * value / total)` for each value, half away from zero.
pub fn share_of(table: &str, values: &[f64]) -> ReportResult<Vec<SharePct>> {
    let total: f64 = values.iter().sum();
    if total == 0.0 {
        return Err(ReportError::DivideByZero {
            table: table.into(),
        });
    }
    Ok(values
        .iter()
        .map(|v| (100.0 * v / total).round() as SharePct)
        .collect())
}

/// Append a share column computed from each row's count.
pub fn compute_share_percent<R: Counted + Clone>(
    table: &str,
    rows: &[R],
) -> ReportResult<Vec<Shared<R>>> {
    let counts: Vec<f64> = rows.iter().map(|r| r.count() as f64).collect();
    let shares = share_of(table, &counts)?;
    Ok(rows
        .iter()
        .cloned()
        .zip(shares)
        .map(|(row, share_pct)| Shared { row, share_pct })
        .collect())
}

/// Append a share column computed from a named column of a tagged table,
/// e.g. the "ACV" column of the non-live table. Every row must carry the
/// column; a row without it fails rather than counting as zero.
pub fn compute_share_percent_by(
    table: &AggregateTable,
    column_name: &str,
) -> ReportResult<Vec<Shared<CategoryAggregateRow>>> {
    let column = table.kind().resolve(column_name)?;
    let values = table
        .rows()
        .iter()
        .map(|r| {
            r.value(column).ok_or_else(|| {
                ReportError::integrity(
                    table.kind().name(),
                    format!("'{}' has no {column_name} value", r.category),
                )
            })
        })
        .collect::<ReportResult<Vec<f64>>>()?;
    let shares = share_of(table.kind().name(), &values)?;
    Ok(table
        .rows()
        .iter()
        .cloned()
        .zip(shares)
        .map(|(row, share_pct)| Shared { row, share_pct })
        .collect())
}

// ── Ranking ──────────────────────────────────────────────────────────────────

/// Stable descending sort on one column. Ties keep their input order;
/// rows without the column sort last.
pub fn rank_descending<R: Ranked + Clone>(rows: &[R], column: Column) -> Vec<R> {
    let key = |r: &R| r.value(column).unwrap_or(f64::NEG_INFINITY);
    let mut ranked = rows.to_vec();
    ranked.sort_by(|a, b| key(b).total_cmp(&key(a)));
    ranked
}

/// Rank a tagged table by display column name, e.g. `"Average"` for ERP.
pub fn rank_table_descending(
    table: &AggregateTable,
    column_name: &str,
) -> ReportResult<AggregateTable> {
    let column = table.kind().resolve(column_name)?;
    Ok(AggregateTable::new(
        table.kind(),
        rank_descending(table.rows(), column),
    ))
}

// ── Day bins ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayBin {
    pub label: &'static str,
    pub low: f64,
    /// Exclusive upper edge; None for the final open-ended bin.
    pub high: Option<f64>,
}

impl DayBin {
    pub fn contains(&self, days: f64) -> bool {
        days >= self.low && self.high.is_none_or(|h| days < h)
    }
}

/// Onboarding-day bins, half-open `[low, high)`, last bin unbounded.
pub const DAY_BINS: [DayBin; 6] = [
    DayBin { label: "0-20", low: 0.0, high: Some(20.0) },
    DayBin { label: "20-40", low: 20.0, high: Some(40.0) },
    DayBin { label: "40-60", low: 40.0, high: Some(60.0) },
    DayBin { label: "60-80", low: 60.0, high: Some(80.0) },
    DayBin { label: "80-100", low: 80.0, high: Some(100.0) },
    DayBin { label: "100+", low: 100.0, high: None },
];

/// Map a raw onboarding-day count to its bin label.
pub fn bucket_label_for(days: f64) -> ReportResult<&'static str> {
    if !days.is_finite() || days < 0.0 {
        return Err(ReportError::integrity(
            "distribution",
            format!("onboarding days must be finite and non-negative, got {days}"),
        ));
    }
    DAY_BINS
        .iter()
        .find(|b| b.contains(days))
        .map(|b| b.label)
        .ok_or_else(|| ReportError::integrity("distribution", format!("no bin for {days}")))
}

/// Histogram raw per-customer day counts into a distribution table whose
/// metric column holds each bin's share. Empty bins are kept so the table
/// always lists all six bins in order.
pub fn bucket_counts(days: &[f64]) -> ReportResult<AggregateTable> {
    let mut counts = [0 as Count; DAY_BINS.len()];
    for &d in days {
        let label = bucket_label_for(d)?;
        if let Some(idx) = DAY_BINS.iter().position(|b| b.label == label) {
            counts[idx] += 1;
        }
    }

    let as_f64: Vec<f64> = counts.iter().map(|c| *c as f64).collect();
    let shares = share_of("distribution", &as_f64)?;

    let rows = DAY_BINS
        .iter()
        .zip(counts)
        .zip(shares)
        .map(|((bin, count), pct)| CategoryAggregateRow::new(bin.label, count, pct as f64))
        .collect();

    log::debug!("views: bucketed {} onboarding records", days.len());
    Ok(AggregateTable::new(TableKind::Distribution, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bins_are_half_open() {
        assert_eq!(bucket_label_for(0.0).unwrap(), "0-20");
        assert_eq!(bucket_label_for(39.9).unwrap(), "20-40");
        assert_eq!(bucket_label_for(100.0).unwrap(), "100+");
    }

    #[test]
    fn negative_days_rejected() {
        assert!(matches!(
            bucket_label_for(-1.0),
            Err(ReportError::DataIntegrity { .. })
        ));
        assert!(bucket_label_for(f64::NAN).is_err());
    }

    #[test]
    fn share_of_zero_total_fails() {
        let err = share_of("empty", &[0.0, 0.0]).unwrap_err();
        assert!(matches!(err, ReportError::DivideByZero { .. }));
    }
}
