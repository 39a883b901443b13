//! Report configuration — titles and the formatting policy for labels.
//!
//! Nothing here changes the dataset; it only tunes how derived views are
//! labelled and which non-live categories count as "stuck" pipeline.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub title: String,
    pub subtitle: String,
    #[serde(default)]
    pub labels: LabelPolicy,
    #[serde(default = "default_stuck_categories")]
    pub stuck_categories: Vec<String>,
}

/// One rounding policy for the whole ACV family of labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelPolicy {
    /// Decimals used for "$xM" labels.
    pub acv_decimals: usize,
    /// Values below this (in $M) get one extra decimal so that
    /// small segments never print as "$0.0M".
    pub small_acv_threshold: f64,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self {
            acv_decimals: 1,
            small_acv_threshold: 0.1,
        }
    }
}

fn default_stuck_categories() -> Vec<String> {
    vec!["At Risk".into(), "On Hold".into()]
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Traild Customer Onboarding Analysis".into(),
            subtitle: "RevOps Case Study | CRM data extract for records created Oct 2024 - Jan 2025"
                .into(),
            labels: LabelPolicy::default(),
            stuck_categories: default_stuck_categories(),
        }
    }
}

impl ReportConfig {
    /// Load from a JSON file. Missing optional sections fall back to defaults.
    /// In tests, use ReportConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: ReportConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        if config.labels.small_acv_threshold < 0.0 {
            anyhow::bail!("{path}: small_acv_threshold must be non-negative");
        }
        log::debug!("Loaded report config from {path}");
        Ok(config)
    }

    pub fn default_test() -> Self {
        Self {
            title: "Test Onboarding Report".into(),
            subtitle: "test".into(),
            ..Self::default()
        }
    }
}
