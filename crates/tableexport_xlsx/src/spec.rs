//! Shared XLSX specification models.

use crate::conf::{EnumFmtKey, derive_default_xlsx_formats};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification.
///
/// Only what typed cells need: number format, bold header, alignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Bold style.
    pub bold: Option<bool>,
    /// Horizontal alignment (`left`, `center`, `right`).
    pub align: Option<String>,
    /// Number format code.
    pub num_format: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            bold: other.bold.or(self.bold),
            align: other.align.clone().or_else(|| self.align.clone()),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
        }
    }
}

/// Named presets the writer picks from per cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxFormatSet {
    /// Text and blank cells.
    pub text: SpecCellFormat,
    /// Integer cells.
    pub integer: SpecCellFormat,
    /// Decimal cells.
    pub decimal: SpecCellFormat,
    /// Boolean cells.
    pub boolean: SpecCellFormat,
    /// Header row.
    pub header: SpecCellFormat,
}

impl SpecXlsxFormatSet {
    /// Preset by key.
    pub fn get(&self, key: EnumFmtKey) -> &SpecCellFormat {
        match key {
            EnumFmtKey::Text => &self.text,
            EnumFmtKey::Integer => &self.integer,
            EnumFmtKey::Decimal => &self.decimal,
            EnumFmtKey::Boolean => &self.boolean,
            EnumFmtKey::Header => &self.header,
        }
    }
}

impl Default for SpecXlsxFormatSet {
    fn default() -> Self {
        derive_default_xlsx_formats()
    }
}

/// Cell value normalized for the workbook.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumXlsxCellValue {
    /// Blank cell.
    None,
    /// Text cell.
    String(String),
    /// Numeric cell.
    Number(f64),
    /// Boolean cell.
    Boolean(bool),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Integer conversion policy for non-integral numbers in integer-typed cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumIntegerCoerceMode {
    /// Truncate numeric values to integer representation.
    Coerce,
    /// Keep non-integer numeric values as text.
    #[default]
    Strict,
}

/// Value conversion policy for missing/NaN/Inf and integer coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxValuePolicy {
    /// Replacement text for missing value when keep-missing is enabled.
    pub missing_value_str: String,
    /// Replacement text for NaN.
    pub nan_str: String,
    /// Replacement text for positive infinity.
    pub posinf_str: String,
    /// Replacement text for negative infinity.
    pub neginf_str: String,
    /// Integer conversion mode.
    pub integer_coerce: EnumIntegerCoerceMode,
}

impl Default for SpecXlsxValuePolicy {
    fn default() -> Self {
        Self {
            missing_value_str: "NA".to_string(),
            nan_str: "NaN".to_string(),
            posinf_str: "Inf".to_string(),
            neginf_str: "-Inf".to_string(),
            integer_coerce: EnumIntegerCoerceMode::Strict,
        }
    }
}

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    /// Disable autofit.
    None,
    /// Infer width from header cells only (default).
    #[default]
    Header,
    /// Infer width from body cells only.
    Body,
    /// Infer width from both header and body cells.
    All,
}

/// Autofit policy for per-table write call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Max body rows inspected when body-based inference is active.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::Header,
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Writer-wide options controlling value conversion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxWriteOptions {
    /// Value conversion policy.
    pub value_policy: SpecXlsxValuePolicy,
    /// Keep missing/NaN/Inf as text instead of blank.
    pub keep_missing_values: bool,
}

/// Per-table call options for [`crate::writer::XlsxWriter::write_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTableSheetWriteOptions {
    /// Number of frozen columns.
    pub col_freeze: usize,
    /// Frozen row index; defaults to below the header when `None`.
    pub row_freeze: Option<usize>,
    /// Override writer-level keep-missing behavior.
    pub if_keep_missing_values: Option<bool>,
    /// Export hidden columns as well.
    pub if_include_hidden_columns: bool,
    /// Outline-group child rows of hierarchical sources.
    pub if_group_hierarchy: bool,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
}

impl Default for SpecTableSheetWriteOptions {
    fn default() -> Self {
        Self {
            col_freeze: 0,
            row_freeze: None,
            if_keep_missing_values: None,
            if_include_hidden_columns: false,
            if_group_hierarchy: true,
            policy_autofit: SpecAutofitCellsPolicy::default(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetSpecification

/// Concrete sheet part emitted to workbook (after Excel-limit slicing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetSlice {
    /// Actual unique sheet name in workbook.
    pub sheet_name: String,
    /// Inclusive source row start.
    pub row_start_inclusive: usize,
    /// Exclusive source row end.
    pub row_end_exclusive: usize,
    /// Inclusive source column start.
    pub col_start_inclusive: usize,
    /// Exclusive source column end.
    pub col_end_exclusive: usize,
    /// Row outline groups applied to this sheet (slice-local body rows).
    pub row_outline_groups: Vec<SpecRowOutlineGroup>,
}

/// One outline group over body rows (slice-local, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecRowOutlineGroup {
    /// Outline level, starting at 1.
    pub level: usize,
    /// First grouped row.
    pub row_idx_start: usize,
    /// Last grouped row.
    pub row_idx_end: usize,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-table write report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Table name as passed by the caller.
    pub table_name: String,
    /// Exported body rows.
    pub n_rows: usize,
    /// Exported (visible) columns.
    pub n_columns: usize,
    /// Sheet slices produced by the write call.
    pub sheets: Vec<SpecSheetSlice>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
