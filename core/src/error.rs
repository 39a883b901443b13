use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Data integrity error in table '{table}': {reason}")]
    DataIntegrity { table: String, reason: String },

    #[error("Hierarchy error: {reason}")]
    Hierarchy { reason: String },

    #[error("Division by zero: '{table}' has a zero total")]
    DivideByZero { table: String },

    #[error("Unknown column '{column}' for table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReportError {
    pub(crate) fn integrity(table: impl Into<String>, reason: impl Into<String>) -> Self {
        ReportError::DataIntegrity {
            table: table.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn hierarchy(reason: impl Into<String>) -> Self {
        ReportError::Hierarchy {
            reason: reason.into(),
        }
    }
}

pub type ReportResult<T> = Result<T, ReportError>;
