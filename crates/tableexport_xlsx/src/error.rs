//! Export error types.

use rust_xlsxwriter::XlsxError;
use tableexport_source::TableSourceError;
use thiserror::Error;

/// "Export call failed" errors. Any of these aborts the current table.
#[derive(Error, Debug)]
pub enum XlsxExportError {
    /// Reading the table source failed.
    #[error("export of table {table:?} failed with {kind}: {source}", kind = .source.kind())]
    Source {
        /// Table name as passed by the caller.
        table: String,
        /// Originating source error.
        source: TableSourceError,
    },

    /// Invalid per-call or writer options.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// The writer was already closed.
    #[error("cannot write after close()")]
    Closed,

    /// Row or column index does not fit Excel's index types.
    #[error("index overflow: {0}")]
    IndexOverflow(String),

    /// Workbook-level failure from the XLSX backend.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] XlsxError),
}

impl XlsxExportError {
    /// Wrap a table-source error with the table it came from.
    pub fn with_table(table: impl Into<String>, source: TableSourceError) -> Self {
        Self::Source {
            table: table.into(),
            source,
        }
    }
}
