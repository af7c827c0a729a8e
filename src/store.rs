//! Column store: the board's columns keyed by a monotonic id.

use crate::error::LoadError;
use crate::locator::DatasetLocator;
use crate::sort::SortSpec;
use crate::table::Table;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnId(u64);

impl ColumnId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "col-{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub enum ColumnStatus {
    /// The locator is incomplete; nothing is loaded.
    #[default]
    Unconfigured,
    Loading,
    Loaded,
    Failed(Arc<LoadError>),
}

impl ColumnStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub id: ColumnId,
    /// Raw picker input, one entry per slot.
    pub selection: Vec<String>,
    pub locator: DatasetLocator,
    pub label: String,
    pub table: Table,
    pub sort: Option<SortSpec>,
    pub status: ColumnStatus,
}

impl Column {
    fn new(id: ColumnId) -> Self {
        Self {
            id,
            selection: Vec::new(),
            locator: DatasetLocator::default(),
            label: String::new(),
            table: Table::default(),
            sort: None,
            status: ColumnStatus::Unconfigured,
        }
    }

    /// Store a freshly loaded table. Without `preserve_sort` (or with no sort saved),
    /// sort by the value field, descending.
    pub fn apply_loaded(&mut self, table: Table, preserve_sort: bool) {
        if !(preserve_sort && self.sort.is_some()) {
            self.sort = if table.has_data() {
                table.value_index().map(SortSpec::descending)
            } else {
                None
            };
        }
        self.table = table;
        self.status = ColumnStatus::Loaded;
    }

    pub fn apply_failed(&mut self, err: LoadError) {
        self.table = Table::default();
        self.status = ColumnStatus::Failed(Arc::new(err));
    }

    /// Drop any data; used when the selection no longer names a complete dataset.
    pub fn clear(&mut self) {
        self.table = Table::default();
        self.status = ColumnStatus::Unconfigured;
    }

    /// Custom label if set, otherwise the locator.
    pub fn title(&self) -> String {
        if !self.label.is_empty() {
            self.label.clone()
        } else if self.locator.is_complete() {
            self.locator.to_string()
        } else {
            self.id.to_string()
        }
    }
}

#[derive(Debug, Default)]
pub struct ColumnStore {
    columns: BTreeMap<ColumnId, Column>,
    next_id: u64,
}

impl ColumnStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an empty column under a fresh id. Ids are never reused.
    pub fn add(&mut self) -> ColumnId {
        let id = ColumnId(self.next_id);
        self.next_id += 1;
        self.columns.insert(id, Column::new(id));
        id
    }

    pub fn get(&self, id: ColumnId) -> Option<&Column> {
        self.columns.get(&id)
    }

    pub fn get_mut(&mut self, id: ColumnId) -> Option<&mut Column> {
        self.columns.get_mut(&id)
    }

    pub fn remove(&mut self, id: ColumnId) -> Option<Column> {
        self.columns.remove(&id)
    }

    pub fn contains(&self, id: ColumnId) -> bool {
        self.columns.contains_key(&id)
    }

    /// Columns in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn ids(&self) -> Vec<ColumnId> {
        self.columns.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.columns.values().map(|c| &c.table)
    }

    /// Returns false when the column does not exist.
    pub fn set_label(&mut self, id: ColumnId, label: impl Into<String>) -> bool {
        match self.columns.get_mut(&id) {
            Some(column) => {
                column.label = label.into();
                true
            }
            None => false,
        }
    }

    /// Apply the sort toggle rule to `field` and return the new spec.
    pub fn set_sort(&mut self, id: ColumnId, field: usize) -> Option<SortSpec> {
        let column = self.columns.get_mut(&id)?;
        let spec = SortSpec::toggled(column.sort, field);
        column.sort = Some(spec);
        Some(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::sort::SortDirection;

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut store = ColumnStore::new();
        let a = store.add();
        let b = store.add();
        store.remove(b);
        let c = store.add();
        assert_eq!(a.to_string(), "col-0");
        assert_eq!(c.to_string(), "col-2");
        assert_eq!(store.ids(), vec![a, c]);
    }

    #[test]
    fn loaded_table_gets_default_descending_sort() {
        let mut store = ColumnStore::new();
        let id = store.add();
        let column = store.get_mut(id).unwrap();
        column.apply_loaded(Table::parse("a,b,value\nx,y,1\n"), false);
        assert_eq!(column.sort, Some(SortSpec::descending(2)));
        assert!(matches!(column.status, ColumnStatus::Loaded));
    }

    #[test]
    fn header_only_table_has_no_sort() {
        let mut store = ColumnStore::new();
        let id = store.add();
        let column = store.get_mut(id).unwrap();
        column.apply_loaded(Table::parse("a,value\n"), false);
        assert_eq!(column.sort, None);
    }

    #[test]
    fn preserved_sort_survives_load() {
        let mut store = ColumnStore::new();
        let id = store.add();
        let column = store.get_mut(id).unwrap();
        column.sort = Some(SortSpec::ascending(0));
        column.apply_loaded(Table::parse("a,value\nx,1\n"), true);
        assert_eq!(column.sort, Some(SortSpec::ascending(0)));
    }

    #[test]
    fn failure_clears_table() {
        let mut store = ColumnStore::new();
        let id = store.add();
        let column = store.get_mut(id).unwrap();
        column.apply_loaded(Table::parse("a,value\nx,1\n"), false);
        column.apply_failed(LoadError {
            locator: DatasetLocator::new(["a", "b", "c"], "a.csv"),
            path: "data/a/b/c/a.csv".to_string(),
            cause: FetchError::Status(404),
        });
        assert!(column.table.is_empty());
        assert!(column.status.error().is_some());
    }

    #[test]
    fn sort_toggles_between_directions() {
        let mut store = ColumnStore::new();
        let id = store.add();
        let first = store.set_sort(id, 1).unwrap();
        assert_eq!(first.direction, SortDirection::Asc);
        let second = store.set_sort(id, 1).unwrap();
        assert_eq!(second.direction, SortDirection::Desc);
        let third = store.set_sort(id, 1).unwrap();
        assert_eq!(third.direction, SortDirection::Asc);
        assert_eq!(store.set_sort(ColumnId::from_raw(99), 0), None);
    }

    #[test]
    fn title_prefers_label() {
        let mut store = ColumnStore::new();
        let id = store.add();
        assert_eq!(store.get(id).unwrap().title(), "col-0");
        store.set_label(id, "baseline");
        assert_eq!(store.get(id).unwrap().title(), "baseline");
    }
}
