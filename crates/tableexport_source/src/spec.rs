//! Shared table-source data model: identifiers, cell values and types.

use std::fmt;

////////////////////////////////////////////////////////////////////////////////
// #region Identifiers

/// Stable token naming one column of an exported table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(String);

impl ColumnId {
    /// Create a column identifier from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColumnId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ColumnId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ColumnId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValues

/// Resolved type descriptor of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnumValueType {
    /// Generic text (also the fallback when nothing better is known).
    #[default]
    Text,
    /// Whole number.
    Integer,
    /// Floating point number.
    Decimal,
    /// True/false flag.
    Boolean,
}

impl EnumValueType {
    /// Whether values of this type are numeric (integer or floating point).
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Decimal)
    }
}

/// Cell value as produced by a column's value-extraction function.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/null value.
    #[default]
    None,
    /// Text value.
    String(String),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
}

impl EnumCellValue {
    /// Whether this is the null value.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Own type of a non-null value; `None` for the null value.
    pub fn value_type(&self) -> Option<EnumValueType> {
        match self {
            Self::None => None,
            Self::String(_) => Some(EnumValueType::Text),
            Self::Integer(_) => Some(EnumValueType::Integer),
            Self::Number(_) => Some(EnumValueType::Decimal),
            Self::Boolean(_) => Some(EnumValueType::Boolean),
        }
    }

    /// Plain display text; empty for the null value.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::String(val) => val.clone(),
            Self::Integer(val) => val.to_string(),
            Self::Number(val) => val.to_string(),
            Self::Boolean(val) => val.to_string(),
        }
    }
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for EnumCellValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for EnumCellValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for EnumCellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for EnumCellValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl<V: Into<EnumCellValue>> From<Option<V>> for EnumCellValue {
    fn from(value: Option<V>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Presentation

/// Horizontal cell alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum EnumCellAlignment {
    /// Left aligned (text and unknown types).
    #[default]
    Left,
    /// Right aligned (numeric types).
    Right,
}

impl EnumCellAlignment {
    /// Alignment for an optional resolved type: numeric is right, everything else left.
    pub fn from_value_type(value_type: Option<EnumValueType>) -> Self {
        match value_type {
            Some(val) if val.is_numeric() => Self::Right,
            _ => Self::Left,
        }
    }
}

/// Kind of renderer a grid column uses to display its cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnumRendererKind {
    /// Plain text.
    #[default]
    Text,
    /// Markup output (icons, checkboxes, rich labels).
    Html,
    /// Formatted number.
    Number,
    /// Formatted date/time.
    Date,
    /// Boolean widget.
    Boolean,
    /// Embedded component.
    Component,
}

impl EnumRendererKind {
    /// Whether the renderer's presentation output is markup unsuitable for a spreadsheet cell.
    pub fn is_markup(self) -> bool {
        matches!(self, Self::Html)
    }
}

/// How a grid adapter resolves cell value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumTypeResolution {
    /// Inspect each item's raw value first, then fall back to the column's declared type.
    #[default]
    PerItem,
    /// Use the column's declared type only.
    Column,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_follows_numeric_types_only() {
        assert_eq!(
            EnumCellAlignment::from_value_type(Some(EnumValueType::Integer)),
            EnumCellAlignment::Right
        );
        assert_eq!(
            EnumCellAlignment::from_value_type(Some(EnumValueType::Decimal)),
            EnumCellAlignment::Right
        );
        assert_eq!(
            EnumCellAlignment::from_value_type(Some(EnumValueType::Boolean)),
            EnumCellAlignment::Left
        );
        assert_eq!(
            EnumCellAlignment::from_value_type(None),
            EnumCellAlignment::Left
        );
    }

    #[test]
    fn test_cell_value_from_option_maps_missing_to_none() {
        assert_eq!(EnumCellValue::from(None::<i64>), EnumCellValue::None);
        assert_eq!(EnumCellValue::from(Some(3_i64)), EnumCellValue::Integer(3));
        assert_eq!(EnumCellValue::None.value_type(), None);
        assert_eq!(
            EnumCellValue::from(1.5_f64).value_type(),
            Some(EnumValueType::Decimal)
        );
    }
}
