//! Customer-onboarding report: a validated, read-only dataset and the pure
//! view builders that shape it for charts.

pub mod config;
pub mod dataset;
pub mod error;
pub mod format;
pub mod hierarchy;
pub mod panels;
pub mod snapshot;
pub mod types;
pub mod views;
