//! Flat, column-typed `TableSource` over a Polars `DataFrame`.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;

use polars::prelude::{AnyValue, Column as PlColumn, DataFrame, DataType, IpcReader, SerReader};
use tracing::debug;

use crate::error::TableSourceError;
use crate::source::{TableSource, validate_unique_column_ids};
use crate::spec::{ColumnId, EnumCellAlignment, EnumCellValue, EnumValueType};

/// [`TableSource`] over a DataFrame; item ids are row indices.
#[derive(Debug, Clone)]
pub struct DataFrameTableSource<'a> {
    df: Cow<'a, DataFrame>,
    column_ids: Vec<ColumnId>,
    dict_headers: BTreeMap<ColumnId, String>,
    set_hidden: BTreeSet<ColumnId>,
}

impl<'a> DataFrameTableSource<'a> {
    /// Borrow an in-memory dataframe.
    pub fn new(df: &'a DataFrame) -> Result<Self, TableSourceError> {
        Self::from_cow(Cow::Borrowed(df))
    }

    fn from_cow(df: Cow<'a, DataFrame>) -> Result<Self, TableSourceError> {
        let column_ids: Vec<ColumnId> = df
            .get_column_names_str()
            .into_iter()
            .map(ColumnId::from)
            .collect();
        validate_unique_column_ids(&column_ids)?;

        debug!(
            n_columns = column_ids.len(),
            n_rows = df.height(),
            "dataframe table source created"
        );

        Ok(Self {
            df,
            column_ids,
            dict_headers: BTreeMap::new(),
            set_hidden: BTreeSet::new(),
        })
    }

    /// Override header labels; unknown column ids are rejected.
    pub fn with_headers<K, V>(
        mut self,
        headers: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, TableSourceError>
    where
        K: Into<ColumnId>,
        V: Into<String>,
    {
        for (key, label) in headers {
            let column_id = self.validate_column_id(key.into())?;
            self.dict_headers.insert(column_id, label.into());
        }
        Ok(self)
    }

    /// Mark columns as hidden; unknown column ids are rejected.
    pub fn with_hidden_columns<K>(
        mut self,
        columns: impl IntoIterator<Item = K>,
    ) -> Result<Self, TableSourceError>
    where
        K: Into<ColumnId>,
    {
        for key in columns {
            let column_id = self.validate_column_id(key.into())?;
            self.set_hidden.insert(column_id);
        }
        Ok(self)
    }

    /// Borrow the wrapped dataframe.
    pub fn dataframe(&self) -> &DataFrame {
        self.df.as_ref()
    }

    fn validate_column_id(&self, column_id: ColumnId) -> Result<ColumnId, TableSourceError> {
        if self.column_ids.contains(&column_id) {
            Ok(column_id)
        } else {
            Err(TableSourceError::UnknownColumn(column_id))
        }
    }

    fn column(&self, column_id: &ColumnId) -> Result<&PlColumn, TableSourceError> {
        if !self.column_ids.contains(column_id) {
            return Err(TableSourceError::UnknownColumn(column_id.clone()));
        }
        self.df
            .column(column_id.as_str())
            .map_err(|err| TableSourceError::data_access(format!("{err}")))
    }

    fn validate_row(&self, item_id: usize) -> Result<(), TableSourceError> {
        if item_id < self.df.height() {
            Ok(())
        } else {
            Err(TableSourceError::InvalidItem(format!(
                "row {item_id} (height {})",
                self.df.height()
            )))
        }
    }
}

impl DataFrameTableSource<'static> {
    /// Decode a Polars IPC payload into an owned source.
    pub fn from_ipc_bytes(v_ipc_df: &[u8]) -> Result<Self, TableSourceError> {
        let df = IpcReader::new(Cursor::new(v_ipc_df))
            .finish()
            .map_err(|err| {
                TableSourceError::data_access(format!("Failed to read IPC DataFrame bytes: {err}"))
            })?;
        Self::from_cow(Cow::Owned(df))
    }
}

impl TableSource for DataFrameTableSource<'_> {
    type ItemId = usize;

    fn column_ids(&self) -> &[ColumnId] {
        &self.column_ids
    }

    fn is_hierarchical(&self) -> bool {
        false
    }

    fn root_item_ids(&self) -> Result<Vec<usize>, TableSourceError> {
        self.item_ids()
    }

    fn item_ids(&self) -> Result<Vec<usize>, TableSourceError> {
        Ok((0..self.df.height()).collect())
    }

    fn children(&self, _item_id: &usize) -> Result<Vec<usize>, TableSourceError> {
        Ok(Vec::new())
    }

    fn column_header(&self, column_id: &ColumnId) -> Result<String, TableSourceError> {
        self.validate_column_id(column_id.clone())?;
        Ok(self
            .dict_headers
            .get(column_id)
            .cloned()
            .unwrap_or_else(|| column_id.to_string()))
    }

    fn is_column_hidden(&self, column_id: &ColumnId) -> Result<bool, TableSourceError> {
        self.validate_column_id(column_id.clone())?;
        Ok(self.set_hidden.contains(column_id))
    }

    fn cell_alignment(
        &self,
        item_id: &usize,
        column_id: &ColumnId,
    ) -> Result<EnumCellAlignment, TableSourceError> {
        self.validate_row(*item_id)?;
        let col = self.column(column_id)?;
        Ok(EnumCellAlignment::from_value_type(Some(
            derive_value_type_from_dtype(col.dtype()),
        )))
    }

    fn cell_value(
        &self,
        item_id: &usize,
        column_id: &ColumnId,
    ) -> Result<EnumCellValue, TableSourceError> {
        self.validate_row(*item_id)?;
        let value = self
            .column(column_id)?
            .get(*item_id)
            .map_err(|err| TableSourceError::data_access(format!("Failed to access cell value: {err}")))?;
        Ok(derive_cell_value_from_any_value(value))
    }

    fn cell_value_type(
        &self,
        item_id: &usize,
        column_id: &ColumnId,
    ) -> Result<EnumValueType, TableSourceError> {
        self.validate_row(*item_id)?;
        Ok(derive_value_type_from_dtype(self.column(column_id)?.dtype()))
    }
}

/// Map a Polars dtype to the export value type.
pub fn derive_value_type_from_dtype(dtype: &DataType) -> EnumValueType {
    if dtype.is_integer() {
        EnumValueType::Integer
    } else if dtype.is_float() {
        EnumValueType::Decimal
    } else if dtype.is_bool() {
        EnumValueType::Boolean
    } else {
        EnumValueType::Text
    }
}

fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => EnumCellValue::Boolean(val),
        AnyValue::Float32(val) => EnumCellValue::Number(f64::from(val)),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        _ if value.dtype().is_integer() => match value.extract::<i64>() {
            Some(val) => EnumCellValue::Integer(val),
            // u64/i128 beyond i64 range
            None => value
                .extract::<f64>()
                .map_or(EnumCellValue::None, EnumCellValue::Number),
        },
        _ => EnumCellValue::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use polars::prelude::*;

    use super::*;

    fn build_df() -> DataFrame {
        df!(
            "id" => ["A1", "B2"],
            "amount" => [Some(42.5), None],
            "qty" => [3_i64, 4_i64],
            "ok" => [true, false]
        )
        .expect("df")
    }

    #[test]
    fn test_flat_scenario() {
        let df = build_df();
        let source = DataFrameTableSource::new(&df).expect("source");

        assert_eq!(
            &source.column_ids()[..2],
            &[ColumnId::from("id"), ColumnId::from("amount")]
        );
        assert_eq!(
            source.cell_value(&0, &"amount".into()).expect("value"),
            EnumCellValue::Number(42.5)
        );
        assert_eq!(
            source.cell_value(&1, &"amount".into()).expect("value"),
            EnumCellValue::None
        );
        assert_eq!(
            source.cell_alignment(&0, &"amount".into()).expect("align"),
            EnumCellAlignment::Right
        );
        assert_eq!(
            source.cell_alignment(&0, &"id".into()).expect("align"),
            EnumCellAlignment::Left
        );
        assert_eq!(
            source.cell_value_type(&0, &"qty".into()).expect("type"),
            EnumValueType::Integer
        );
        assert_eq!(
            source.cell_value(&0, &"ok".into()).expect("value"),
            EnumCellValue::Boolean(true)
        );
    }

    #[test]
    fn test_flat_roots_equal_items() {
        let df = build_df();
        let source = DataFrameTableSource::new(&df).expect("source");
        assert!(!source.is_hierarchical());
        assert_eq!(source.root_item_ids().expect("roots"), vec![0, 1]);
        assert_eq!(
            source.root_item_ids().expect("roots"),
            source.item_ids().expect("items")
        );
        assert!(source.children(&0).expect("children").is_empty());
    }

    #[test]
    fn test_headers_and_hidden_columns() {
        let df = build_df();
        let source = DataFrameTableSource::new(&df)
            .expect("source")
            .with_headers([("amount", "Amount (EUR)")])
            .expect("headers")
            .with_hidden_columns(["ok"])
            .expect("hidden");

        assert_eq!(source.column_header(&"amount".into()).expect("h"), "Amount (EUR)");
        assert_eq!(source.column_header(&"qty".into()).expect("h"), "qty");
        assert!(source.is_column_hidden(&"ok".into()).expect("hidden"));
        assert!(!source.is_column_hidden(&"id".into()).expect("hidden"));

        assert!(matches!(
            DataFrameTableSource::new(&df)
                .expect("source")
                .with_hidden_columns(["missing"]),
            Err(TableSourceError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_out_of_range_row_is_invalid_item() {
        let df = build_df();
        let source = DataFrameTableSource::new(&df).expect("source");
        let column_id = ColumnId::from("id");
        assert_eq!(
            source
                .cell_value(&9, &column_id)
                .expect_err("out of range")
                .kind(),
            "InvalidItemError"
        );
        assert!(matches!(
            source.cell_alignment(&2, &column_id),
            Err(TableSourceError::InvalidItem(_))
        ));
        assert!(matches!(
            source.cell_value_type(&2, &column_id),
            Err(TableSourceError::InvalidItem(_))
        ));
        assert!(source.cell_value_type(&1, &column_id).is_ok());
    }

    #[test]
    fn test_garbage_ipc_bytes_is_data_access_error() {
        let err = DataFrameTableSource::from_ipc_bytes(b"not ipc").expect_err("must fail");
        assert_eq!(err.kind(), "DataAccessError");
    }
}
