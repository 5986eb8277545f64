//! `tableexport_xlsx` v1:
//! XLSX sink for any `TableSource`.
//!
//! Modules:
//! - `conf`   : Excel limits and default format presets
//! - `spec`   : format, option and report models
//! - `error`  : export error type
//! - `util`   : value conversion, sheet naming and slicing, outline planning
//! - `writer` : stateful `XlsxWriter`
pub mod conf;
pub mod error;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{EnumFmtKey, derive_default_xlsx_formats};
pub use error::XlsxExportError;
pub use spec::{
    EnumAutofitColumnsRule, EnumIntegerCoerceMode, EnumXlsxCellValue, SpecAutofitCellsPolicy,
    SpecCellFormat, SpecRowOutlineGroup, SpecSheetSlice, SpecTableSheetWriteOptions,
    SpecXlsxFormatSet, SpecXlsxReport, SpecXlsxValuePolicy, SpecXlsxWriteOptions,
};
pub use writer::XlsxWriter;
