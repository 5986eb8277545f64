//! Grid model and the `TableSource` adapter over it.
//!
//! A [`Grid`] is the in-process stand-in for a UI data grid: ordered
//! [`Column`] definitions plus one [`DataProvider`]. Presentation transforms
//! are injected into each column explicitly, so the adapter never has to
//! reach into private widget state.

use std::fmt::Debug;

use tracing::debug;

use crate::error::TableSourceError;
use crate::provider::{DataProvider, HierarchicalDataProvider};
use crate::source::{TableSource, validate_unique_column_ids};
use crate::spec::{
    ColumnId, EnumCellAlignment, EnumCellValue, EnumRendererKind, EnumTypeResolution,
    EnumValueType,
};

type FnValue<T> = Box<dyn Fn(&T) -> EnumCellValue>;
type FnPresentation = Box<dyn Fn(&EnumCellValue) -> EnumCellValue>;

////////////////////////////////////////////////////////////////////////////////
// #region Column

/// One grid column definition.
pub struct Column<T> {
    id: ColumnId,
    caption: Option<String>,
    fn_value: FnValue<T>,
    fn_presentation: Option<FnPresentation>,
    renderer: EnumRendererKind,
    presentation_type: Option<EnumValueType>,
    if_hidden: bool,
}

impl<T> Column<T> {
    /// Create a visible text column from its value-extraction function.
    pub fn new(id: impl Into<ColumnId>, fn_value: impl Fn(&T) -> EnumCellValue + 'static) -> Self {
        Self {
            id: id.into(),
            caption: None,
            fn_value: Box::new(fn_value),
            fn_presentation: None,
            renderer: EnumRendererKind::Text,
            presentation_type: None,
            if_hidden: false,
        }
    }

    /// Set the header caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Register a presentation transform applied to raw values for display.
    pub fn with_presentation(
        mut self,
        fn_presentation: impl Fn(&EnumCellValue) -> EnumCellValue + 'static,
    ) -> Self {
        self.fn_presentation = Some(Box::new(fn_presentation));
        self
    }

    /// Set the renderer kind.
    pub fn with_renderer(mut self, renderer: EnumRendererKind) -> Self {
        self.renderer = renderer;
        self
    }

    /// Declare the column's static presentation type.
    pub fn with_presentation_type(mut self, presentation_type: EnumValueType) -> Self {
        self.presentation_type = Some(presentation_type);
        self
    }

    /// Set visibility.
    pub fn with_hidden(mut self, if_hidden: bool) -> Self {
        self.if_hidden = if_hidden;
        self
    }

    pub fn id(&self) -> &ColumnId {
        &self.id
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn renderer(&self) -> EnumRendererKind {
        self.renderer
    }

    pub fn presentation_type(&self) -> Option<EnumValueType> {
        self.presentation_type
    }

    pub fn is_hidden(&self) -> bool {
        self.if_hidden
    }

    /// Toggle visibility in place.
    pub fn set_hidden(&mut self, if_hidden: bool) {
        self.if_hidden = if_hidden;
    }

    /// Evaluate the raw value-extraction function.
    pub fn raw_value(&self, item: &T) -> EnumCellValue {
        (self.fn_value)(item)
    }

    /// Whether a presentation transform is registered.
    pub fn has_presentation(&self) -> bool {
        self.fn_presentation.is_some()
    }

    /// Apply the presentation transform, if any.
    pub fn present(&self, value: &EnumCellValue) -> Option<EnumCellValue> {
        self.fn_presentation.as_ref().map(|f| f(value))
    }
}

impl<T> Debug for Column<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("id", &self.id)
            .field("caption", &self.caption)
            .field("has_presentation", &self.fn_presentation.is_some())
            .field("renderer", &self.renderer)
            .field("presentation_type", &self.presentation_type)
            .field("if_hidden", &self.if_hidden)
            .finish()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Grid

/// Ordered columns bound to one data provider.
pub struct Grid<T> {
    columns: Vec<Column<T>>,
    provider: Box<dyn DataProvider<T>>,
}

impl<T: 'static> Grid<T> {
    /// Create an empty-column grid over `provider`.
    pub fn new(provider: impl DataProvider<T> + 'static) -> Self {
        Self {
            columns: Vec::new(),
            provider: Box::new(provider),
        }
    }
}

impl<T> Grid<T> {
    /// Append a column.
    pub fn with_column(mut self, column: Column<T>) -> Self {
        self.columns.push(column);
        self
    }

    /// Append a column in place.
    pub fn add_column(&mut self, column: Column<T>) {
        self.columns.push(column);
    }

    pub fn columns(&self) -> &[Column<T>] {
        &self.columns
    }

    /// Look up a column by identifier.
    pub fn column(&self, column_id: &ColumnId) -> Option<&Column<T>> {
        self.columns.iter().find(|col| col.id() == column_id)
    }

    /// Mutable column lookup, e.g. to toggle visibility.
    pub fn column_mut(&mut self, column_id: &ColumnId) -> Option<&mut Column<T>> {
        self.columns.iter_mut().find(|col| col.id() == column_id)
    }

    pub fn provider(&self) -> &dyn DataProvider<T> {
        self.provider.as_ref()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region GridTableSource

/// [`TableSource`] adapter over a [`Grid`].
pub struct GridTableSource<'a, T> {
    grid: &'a Grid<T>,
    column_ids: Vec<ColumnId>,
    if_hierarchical: bool,
    rule_type_resolution: EnumTypeResolution,
}

impl<'a, T> GridTableSource<'a, T>
where
    T: Clone + Debug,
{
    /// Adapter with per-item type resolution.
    pub fn new(grid: &'a Grid<T>) -> Result<Self, TableSourceError> {
        Self::with_type_resolution(grid, EnumTypeResolution::PerItem)
    }

    /// Adapter with an explicit type-resolution capability.
    pub fn with_type_resolution(
        grid: &'a Grid<T>,
        rule_type_resolution: EnumTypeResolution,
    ) -> Result<Self, TableSourceError> {
        let column_ids: Vec<ColumnId> = grid.columns().iter().map(|c| c.id().clone()).collect();
        validate_unique_column_ids(&column_ids)?;
        let if_hierarchical = grid.provider().as_hierarchical().is_some();

        debug!(
            n_columns = column_ids.len(),
            if_hierarchical,
            ?rule_type_resolution,
            "grid table source created"
        );

        Ok(Self {
            grid,
            column_ids,
            if_hierarchical,
            rule_type_resolution,
        })
    }

    pub fn type_resolution(&self) -> EnumTypeResolution {
        self.rule_type_resolution
    }

    fn column(&self, column_id: &ColumnId) -> Result<&'a Column<T>, TableSourceError> {
        self.grid
            .column(column_id)
            .ok_or_else(|| TableSourceError::UnknownColumn(column_id.clone()))
    }

    fn hierarchy(&self) -> Option<&'a dyn HierarchicalDataProvider<T>> {
        if self.if_hierarchical {
            self.grid.provider.as_hierarchical()
        } else {
            None
        }
    }

    fn resolve_value_type(&self, item_id: &T, column: &Column<T>) -> Option<EnumValueType> {
        match self.rule_type_resolution {
            EnumTypeResolution::PerItem => column
                .raw_value(item_id)
                .value_type()
                .or(column.presentation_type()),
            EnumTypeResolution::Column => column.presentation_type(),
        }
    }
}

impl<T> TableSource for GridTableSource<'_, T>
where
    T: Clone + Debug,
{
    type ItemId = T;

    fn column_ids(&self) -> &[ColumnId] {
        &self.column_ids
    }

    fn is_hierarchical(&self) -> bool {
        self.if_hierarchical
    }

    fn root_item_ids(&self) -> Result<Vec<T>, TableSourceError> {
        match self.hierarchy() {
            Some(hierarchy) => hierarchy.root_items(),
            None => self.item_ids(),
        }
    }

    fn item_ids(&self) -> Result<Vec<T>, TableSourceError> {
        self.grid.provider.fetch()
    }

    fn children(&self, item_id: &T) -> Result<Vec<T>, TableSourceError> {
        match self.hierarchy() {
            Some(hierarchy) => hierarchy.children(item_id),
            None => Ok(Vec::new()),
        }
    }

    fn column_header(&self, column_id: &ColumnId) -> Result<String, TableSourceError> {
        let column = self.column(column_id)?;
        Ok(column
            .caption()
            .map_or_else(|| column_id.to_string(), ToString::to_string))
    }

    fn is_column_hidden(&self, column_id: &ColumnId) -> Result<bool, TableSourceError> {
        Ok(self.column(column_id)?.is_hidden())
    }

    fn cell_alignment(
        &self,
        item_id: &T,
        column_id: &ColumnId,
    ) -> Result<EnumCellAlignment, TableSourceError> {
        let column = self.column(column_id)?;
        Ok(EnumCellAlignment::from_value_type(
            self.resolve_value_type(item_id, column),
        ))
    }

    fn cell_value(&self, item_id: &T, column_id: &ColumnId) -> Result<EnumCellValue, TableSourceError> {
        let column = self.column(column_id)?;
        let value_raw = column.raw_value(item_id);
        if column.renderer().is_markup() {
            return Ok(value_raw);
        }
        Ok(column.present(&value_raw).unwrap_or(value_raw))
    }

    fn cell_value_type(
        &self,
        item_id: &T,
        column_id: &ColumnId,
    ) -> Result<EnumValueType, TableSourceError> {
        let column = self.column(column_id)?;
        Ok(self
            .resolve_value_type(item_id, column)
            .unwrap_or(EnumValueType::Text))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
