//! Dashboard snapshot — every derived view of a dataset in one payload.
//!
//! This is the only structure handed to a presentation layer. It is built
//! fresh from an immutable dataset; a data refresh means building a new
//! dataset and a new snapshot, never patching one in place.

use crate::{
    config::ReportConfig,
    dataset::ReportDataset,
    error::{ReportError, ReportResult},
    hierarchy::{build_segmentation_hierarchy, TreeNode},
    panels::{
        acv_bands, at_risk_breakdown, cohort_trend, distribution, erp_breakdown, kpi_cards,
        non_live_pipeline, AcvBandsView, AtRiskBreakdown, CohortTrend, DistributionView,
        ErpBreakdown, KpiCard, NonLivePipeline,
    },
};
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub title: String,
    pub subtitle: String,
    pub kpis: Vec<KpiCard>,
    pub segmentation: TreeNode,
    pub erp: ErpBreakdown,
    pub cohort: CohortTrend,
    pub distribution: DistributionView,
    pub acv_bands: AcvBandsView,
    pub non_live: NonLivePipeline,
    pub at_risk: AtRiskBreakdown,
}

impl DashboardSnapshot {
    pub fn build(dataset: &ReportDataset, config: &ReportConfig) -> ReportResult<Self> {
        let snapshot = Self {
            title: config.title.clone(),
            subtitle: config.subtitle.clone(),
            kpis: kpi_cards(dataset, config),
            segmentation: build_segmentation_hierarchy(dataset.segments(), &config.labels)?,
            erp: erp_breakdown(dataset)?,
            cohort: cohort_trend(dataset)?,
            distribution: distribution(dataset)?,
            acv_bands: acv_bands(dataset)?,
            non_live: non_live_pipeline(dataset, config)?,
            at_risk: at_risk_breakdown(dataset)?,
        };
        log::info!(
            "snapshot: built '{}' ({} customers segmented)",
            snapshot.title,
            snapshot.segmentation.count
        );
        Ok(snapshot)
    }

    pub fn to_json(&self) -> ReportResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A single chart's view, addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewName {
    Kpis,
    Segmentation,
    Erp,
    Cohort,
    Distribution,
    AcvBands,
    NonLive,
    AtRisk,
}

impl ViewName {
    pub const ALL: [ViewName; 8] = [
        ViewName::Kpis,
        ViewName::Segmentation,
        ViewName::Erp,
        ViewName::Cohort,
        ViewName::Distribution,
        ViewName::AcvBands,
        ViewName::NonLive,
        ViewName::AtRisk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewName::Kpis => "kpis",
            ViewName::Segmentation => "segmentation",
            ViewName::Erp => "erp",
            ViewName::Cohort => "cohort",
            ViewName::Distribution => "distribution",
            ViewName::AcvBands => "acv",
            ViewName::NonLive => "non_live",
            ViewName::AtRisk => "at_risk",
        }
    }
}

impl FromStr for ViewName {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewName::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ReportError::Other(anyhow::anyhow!("unknown view '{s}'")))
    }
}

/// Build only the requested view, as JSON.
pub fn view_json(
    dataset: &ReportDataset,
    config: &ReportConfig,
    view: ViewName,
) -> ReportResult<serde_json::Value> {
    let value = match view {
        ViewName::Kpis => serde_json::to_value(kpi_cards(dataset, config))?,
        ViewName::Segmentation => serde_json::to_value(build_segmentation_hierarchy(
            dataset.segments(),
            &config.labels,
        )?)?,
        ViewName::Erp => serde_json::to_value(erp_breakdown(dataset)?)?,
        ViewName::Cohort => serde_json::to_value(cohort_trend(dataset)?)?,
        ViewName::Distribution => serde_json::to_value(distribution(dataset)?)?,
        ViewName::AcvBands => serde_json::to_value(acv_bands(dataset)?)?,
        ViewName::NonLive => serde_json::to_value(non_live_pipeline(dataset, config)?)?,
        ViewName::AtRisk => serde_json::to_value(at_risk_breakdown(dataset)?)?,
    };
    Ok(value)
}
