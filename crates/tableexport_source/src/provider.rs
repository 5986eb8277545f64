//! Data providers backing grid table sources.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::TableSourceError;

/// Source of row items for a grid.
pub trait DataProvider<T> {
    /// Fetch every item in provider order.
    fn fetch(&self) -> Result<Vec<T>, TableSourceError>;

    /// Hierarchical view of this provider, if it offers one.
    fn as_hierarchical(&self) -> Option<&dyn HierarchicalDataProvider<T>> {
        None
    }
}

/// Provider exposing parent/child relations between items.
pub trait HierarchicalDataProvider<T>: DataProvider<T> {
    /// Top-level items in provider order.
    fn root_items(&self) -> Result<Vec<T>, TableSourceError>;

    /// Direct children of `item`; [`TableSourceError::InvalidItem`] if unknown.
    fn children(&self, item: &T) -> Result<Vec<T>, TableSourceError>;

    /// Whether `item` is part of the hierarchy.
    fn contains(&self, item: &T) -> bool;
}

////////////////////////////////////////////////////////////////////////////////
// #region ListDataProvider

/// In-memory flat provider.
#[derive(Debug, Clone, Default)]
pub struct ListDataProvider<T> {
    items: Vec<T>,
}

impl<T> ListDataProvider<T> {
    /// Wrap an item list.
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    /// Borrow the backing items.
    pub fn items(&self) -> &[T] {
        &self.items
    }
}

impl<T: Clone> DataProvider<T> for ListDataProvider<T> {
    fn fetch(&self) -> Result<Vec<T>, TableSourceError> {
        Ok(self.items.clone())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TreeData

/// In-memory hierarchical provider.
///
/// Every item appears at most once in the tree; roots and children keep
/// insertion order.
#[derive(Debug, Clone)]
pub struct TreeData<T> {
    roots: Vec<T>,
    children: HashMap<T, Vec<T>>,
}

impl<T> Default for TreeData<T> {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            children: HashMap::new(),
        }
    }
}

impl<T> TreeData<T>
where
    T: Clone + Eq + Hash + Debug,
{
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `item` under `parent`, or as a root when `parent` is `None`.
    pub fn add_item(&mut self, parent: Option<&T>, item: T) -> Result<(), TableSourceError> {
        if self.children.contains_key(&item) {
            return Err(TableSourceError::DuplicateItem(format!("{item:?}")));
        }

        match parent {
            Some(parent) => self
                .children
                .get_mut(parent)
                .ok_or_else(|| TableSourceError::InvalidItem(format!("{parent:?}")))?
                .push(item.clone()),
            None => self.roots.push(item.clone()),
        }
        self.children.insert(item, Vec::new());
        Ok(())
    }

    /// Add several items under the same parent.
    pub fn add_items(
        &mut self,
        parent: Option<&T>,
        items: impl IntoIterator<Item = T>,
    ) -> Result<(), TableSourceError> {
        for item in items {
            self.add_item(parent, item)?;
        }
        Ok(())
    }

    /// Number of items in the tree.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the tree has no items.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl<T> DataProvider<T> for TreeData<T>
where
    T: Clone + Eq + Hash + Debug,
{
    /// All items depth-first in pre-order.
    fn fetch(&self) -> Result<Vec<T>, TableSourceError> {
        let mut l_items = Vec::with_capacity(self.children.len());
        let mut l_stack: Vec<&T> = self.roots.iter().rev().collect();
        while let Some(item) = l_stack.pop() {
            if let Some(l_children) = self.children.get(item) {
                l_stack.extend(l_children.iter().rev());
            }
            l_items.push(item.clone());
        }
        Ok(l_items)
    }

    fn as_hierarchical(&self) -> Option<&dyn HierarchicalDataProvider<T>> {
        Some(self)
    }
}

impl<T> HierarchicalDataProvider<T> for TreeData<T>
where
    T: Clone + Eq + Hash + Debug,
{
    fn root_items(&self) -> Result<Vec<T>, TableSourceError> {
        Ok(self.roots.clone())
    }

    fn children(&self, item: &T) -> Result<Vec<T>, TableSourceError> {
        self.children
            .get(item)
            .cloned()
            .ok_or_else(|| TableSourceError::InvalidItem(format!("{item:?}")))
    }

    fn contains(&self, item: &T) -> bool {
        self.children.contains_key(item)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
