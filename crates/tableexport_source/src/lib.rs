//! `tableexport_source` v1:
//! Read contract between tabular data providers and spreadsheet sinks.
//!
//! Modules:
//! - `spec`     : identifiers, cell values, value types, alignment
//! - `error`    : table-source error taxonomy
//! - `source`   : the `TableSource` trait and traversal helpers
//! - `provider` : flat and hierarchical data providers
//! - `grid`     : grid model and its `TableSource` adapter
//! - `frame`    : Polars `DataFrame` adapter
pub mod error;
pub mod frame;
pub mod grid;
pub mod provider;
pub mod source;
pub mod spec;

pub use error::TableSourceError;
pub use frame::{DataFrameTableSource, derive_value_type_from_dtype};
pub use grid::{Column, Grid, GridTableSource};
pub use provider::{DataProvider, HierarchicalDataProvider, ListDataProvider, TreeData};
pub use source::{
    SpecSourceRow, TableSource, collect_rows_depth_first, select_visible_column_ids,
    validate_unique_column_ids,
};
pub use spec::{
    ColumnId, EnumCellAlignment, EnumCellValue, EnumRendererKind, EnumTypeResolution,
    EnumValueType,
};
