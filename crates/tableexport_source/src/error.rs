//! Table-source error taxonomy.

use thiserror::Error;

use crate::spec::ColumnId;

/// Errors raised while reading a table source.
///
/// None of these are retryable within one export pass: callers abort the
/// whole export, since a partially exported table is not a meaningful result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableSourceError {
    /// The underlying data provider is unreachable or failed during a fetch.
    #[error("data access failed: {message}")]
    DataAccess {
        /// Provider-side failure text.
        message: String,
    },

    /// A hierarchical lookup was given an item the provider does not know.
    #[error("unknown item: {0}")]
    InvalidItem(String),

    /// The concrete source does not offer the requested capability.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A column identifier that is not part of the source.
    #[error("unknown column: {0}")]
    UnknownColumn(ColumnId),

    /// The same column identifier appears twice.
    #[error("duplicate column: {0}")]
    DuplicateColumn(ColumnId),

    /// The same item was added twice to a hierarchical provider.
    #[error("duplicate item: {0}")]
    DuplicateItem(String),
}

impl TableSourceError {
    /// Shorthand for [`TableSourceError::DataAccess`].
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess {
            message: message.into(),
        }
    }

    /// Stable label of the error kind, used verbatim in export reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataAccess { .. } => "DataAccessError",
            Self::InvalidItem(_) => "InvalidItemError",
            Self::UnsupportedOperation(_) => "UnsupportedOperationError",
            Self::UnknownColumn(_) => "UnknownColumnError",
            Self::DuplicateColumn(_) => "DuplicateColumnError",
            Self::DuplicateItem(_) => "DuplicateItemError",
        }
    }
}
