//! Display-label formatting shared by every view.
//!
//! One ACV policy for the whole report: "$xM" with `acv_decimals`, plus one
//! extra decimal below `small_acv_threshold`. Percentages are whole numbers.

use crate::{config::LabelPolicy, dataset::MetricRow, types::SharePct};

pub fn acv_millions(value: f64, policy: &LabelPolicy) -> String {
    let decimals = if value != 0.0 && value.abs() < policy.small_acv_threshold {
        policy.acv_decimals + 1
    } else {
        policy.acv_decimals
    };
    format!("${:.*}M", decimals, value)
}

pub fn percent(share: SharePct) -> String {
    format!("{share}%")
}

/// Whole numbers print without a fractional part.
pub fn number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

/// Render a KPI with its unit suffix: "73 days", "29%", "$1.3M".
pub fn metric(row: &MetricRow, policy: &LabelPolicy) -> String {
    match row.unit.as_str() {
        "%" => format!("{}%", number(row.value)),
        "$M" => acv_millions(row.value, policy),
        "" => number(row.value),
        unit => format!("{} {unit}", number(row.value)),
    }
}

/// "Not Live (N=272, $7.3M)"
pub fn count_and_acv(name: &str, count: i64, acv: f64, policy: &LabelPolicy) -> String {
    format!("{name} (N={count}, {})", acv_millions(acv, policy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_acv_gets_extra_decimal() {
        let policy = LabelPolicy::default();
        assert_eq!(acv_millions(1.72, &policy), "$1.7M");
        assert_eq!(acv_millions(0.02, &policy), "$0.02M");
        assert_eq!(acv_millions(0.0, &policy), "$0.0M");
    }

    #[test]
    fn metric_uses_unit_suffix() {
        let policy = LabelPolicy::default();
        let days = MetricRow::new("avg", "Avg", 73.0, "days");
        let pct = MetricRow::new("pct", "Pct", 29.0, "%");
        let acv = MetricRow::new("acv", "ACV", 1.3, "$M");
        assert_eq!(metric(&days, &policy), "73 days");
        assert_eq!(metric(&pct, &policy), "29%");
        assert_eq!(metric(&acv, &policy), "$1.3M");
    }
}
