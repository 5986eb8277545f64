//! The `TableSource` read contract and traversal helpers.

use std::collections::BTreeSet;

use crate::error::TableSourceError;
use crate::spec::{ColumnId, EnumCellAlignment, EnumCellValue, EnumValueType};

/// Uniform read access to tabular (optionally hierarchical) data for export.
///
/// A source borrows an already-populated provider and owns no data. Apart
/// from the column-id snapshot and the hierarchical flag captured at
/// construction, every call reads the provider's state at call time.
///
/// Typical consumer order: [`Self::column_ids`], then [`Self::column_header`]
/// and [`Self::is_column_hidden`] per column, then [`Self::root_item_ids`]
/// plus recursive [`Self::children`] (hierarchical) or [`Self::item_ids`],
/// then per (item, visible column) [`Self::cell_value`],
/// [`Self::cell_alignment`] and [`Self::cell_value_type`].
pub trait TableSource {
    /// Row identifier type.
    type ItemId: Clone;

    /// Ordered column identifiers; stable for the lifetime of the source.
    fn column_ids(&self) -> &[ColumnId];

    /// Whether the source exposes parent/child relations. Fixed at construction.
    fn is_hierarchical(&self) -> bool;

    /// Top-level items when hierarchical, otherwise all items.
    fn root_item_ids(&self) -> Result<Vec<Self::ItemId>, TableSourceError>;

    /// Full flat item set in provider order.
    fn item_ids(&self) -> Result<Vec<Self::ItemId>, TableSourceError>;

    /// Direct children of `item_id`; empty for flat sources and leaves.
    fn children(&self, item_id: &Self::ItemId) -> Result<Vec<Self::ItemId>, TableSourceError>;

    /// Display label of a column.
    fn column_header(&self, column_id: &ColumnId) -> Result<String, TableSourceError>;

    /// Current visibility of a column.
    fn is_column_hidden(&self, column_id: &ColumnId) -> Result<bool, TableSourceError>;

    /// Display alignment of one cell.
    fn cell_alignment(
        &self,
        item_id: &Self::ItemId,
        column_id: &ColumnId,
    ) -> Result<EnumCellAlignment, TableSourceError>;

    /// Exportable value of one cell.
    fn cell_value(
        &self,
        item_id: &Self::ItemId,
        column_id: &ColumnId,
    ) -> Result<EnumCellValue, TableSourceError>;

    /// Best-effort resolved type of one cell.
    fn cell_value_type(
        &self,
        item_id: &Self::ItemId,
        column_id: &ColumnId,
    ) -> Result<EnumValueType, TableSourceError>;

    /// Whether the column is synthesized rather than backed by item data.
    fn is_generated_column(&self, _column_id: &ColumnId) -> Result<bool, TableSourceError> {
        Ok(false)
    }

    /// Declared type of a generated column.
    fn property_type_for_generated_column(
        &self,
        column_id: &ColumnId,
    ) -> Result<EnumValueType, TableSourceError> {
        Err(TableSourceError::UnsupportedOperation(format!(
            "generated column property type for {column_id:?}"
        )))
    }
}

/// One row in export order with its nesting depth (roots are depth 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSourceRow<I> {
    /// Row identifier.
    pub item_id: I,
    /// Nesting depth.
    pub depth: usize,
}

/// Collect rows in export order.
///
/// Hierarchical sources are walked roots first, children depth-first in
/// pre-order. Flat sources return `item_ids` at depth 0.
pub fn collect_rows_depth_first<S>(
    source: &S,
) -> Result<Vec<SpecSourceRow<S::ItemId>>, TableSourceError>
where
    S: TableSource + ?Sized,
{
    if !source.is_hierarchical() {
        return Ok(source
            .item_ids()?
            .into_iter()
            .map(|item_id| SpecSourceRow { item_id, depth: 0 })
            .collect());
    }

    let mut l_rows = Vec::new();
    let mut l_stack: Vec<SpecSourceRow<S::ItemId>> = source
        .root_item_ids()?
        .into_iter()
        .rev()
        .map(|item_id| SpecSourceRow { item_id, depth: 0 })
        .collect();

    while let Some(row) = l_stack.pop() {
        let l_children = source.children(&row.item_id)?;
        let n_depth_child = row.depth + 1;
        l_stack.extend(
            l_children
                .into_iter()
                .rev()
                .map(|item_id| SpecSourceRow {
                    item_id,
                    depth: n_depth_child,
                }),
        );
        l_rows.push(row);
    }

    Ok(l_rows)
}

/// Column identifiers that are currently visible, in display order.
pub fn select_visible_column_ids<S>(source: &S) -> Result<Vec<ColumnId>, TableSourceError>
where
    S: TableSource + ?Sized,
{
    let mut l_visible = Vec::with_capacity(source.column_ids().len());
    for column_id in source.column_ids() {
        if !source.is_column_hidden(column_id)? {
            l_visible.push(column_id.clone());
        }
    }
    Ok(l_visible)
}

/// Reject duplicated column identifiers, reporting the first repeat.
pub fn validate_unique_column_ids(column_ids: &[ColumnId]) -> Result<(), TableSourceError> {
    let mut set_seen = BTreeSet::new();
    for column_id in column_ids {
        if !set_seen.insert(column_id) {
            return Err(TableSourceError::DuplicateColumn(column_id.clone()));
        }
    }
    Ok(())
}
