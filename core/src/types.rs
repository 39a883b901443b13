//! Shared primitive types used across the entire report.

/// A number of customers (or records) in a row. Signed so that malformed
/// authoring can be caught by validation instead of by the type system.
pub type Count = i64;

/// Annual contract value, expressed in millions of dollars.
pub type AcvMillions = f64;

/// A whole-number percentage, already rounded.
pub type SharePct = i64;

/// A category or label value, unique within its table.
pub type Label = String;
