use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Student not found")]
    NotFound,

    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("{0}")]
    Internal(String),

    #[error("Import failed: {0}")]
    Import(String),

    #[error("Export failed: {0}")]
    Export(String),
}

/// Successful result of a store operation: a human-readable message plus payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T = ()> {
    pub message: String,
    pub value: T,
}

impl Outcome<()> {
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            value: (),
        }
    }
}

impl<T> Outcome<T> {
    pub fn with_value(message: impl Into<String>, value: T) -> Self {
        Self {
            message: message.into(),
            value,
        }
    }
}

pub type StoreResult<T = ()> = Result<Outcome<T>, StoreError>;
