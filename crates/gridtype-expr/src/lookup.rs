//! Column and table lookup
//!
//! The engine reads table data only through [`ColumnLookup`]. A table
//! reference of `None` means the table the expression belongs to.

use gridtype_core::{Column, Table, TableId, TableStore};
use std::fmt;

/// A resolved column and the table that owns it
#[derive(Debug, Clone, Copy)]
pub struct FoundColumn<'a> {
    pub table: &'a Table,
    pub column: &'a Column,
}

/// A column reference as an expression could spell it
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ColumnReference {
    /// `None` for columns of the current table
    pub table: Option<TableId>,
    pub column: String,
}

impl fmt::Display for ColumnReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

/// Access to tables and columns
pub trait ColumnLookup {
    /// Find a column in the given (or current) table
    fn lookup_column(&self, table: Option<&TableId>, column: &str) -> Option<FoundColumn<'_>>;

    /// Find the given (or current) table
    fn lookup_table(&self, table: Option<&TableId>) -> Option<&Table>;

    /// Every column reference visible to the expression
    fn available_column_references(&self) -> Vec<ColumnReference>;
}

/// Lookup for expressions with no table context
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTables;

impl ColumnLookup for NoTables {
    fn lookup_column(&self, _table: Option<&TableId>, _column: &str) -> Option<FoundColumn<'_>> {
        None
    }

    fn lookup_table(&self, _table: Option<&TableId>) -> Option<&Table> {
        None
    }

    fn available_column_references(&self) -> Vec<ColumnReference> {
        Vec::new()
    }
}

/// [`ColumnLookup`] over a [`TableStore`], with an optional current table
#[derive(Debug, Clone, Copy)]
pub struct StoreLookup<'a> {
    store: &'a TableStore,
    current: Option<&'a TableId>,
}

impl<'a> StoreLookup<'a> {
    pub fn new(store: &'a TableStore, current: Option<&'a TableId>) -> Self {
        Self { store, current }
    }
}

impl ColumnLookup for StoreLookup<'_> {
    fn lookup_column(&self, table: Option<&TableId>, column: &str) -> Option<FoundColumn<'_>> {
        let table = self.lookup_table(table)?;
        let column = table.column(column)?;
        Some(FoundColumn { table, column })
    }

    fn lookup_table(&self, table: Option<&TableId>) -> Option<&Table> {
        self.store.table(table.or(self.current)?)
    }

    fn available_column_references(&self) -> Vec<ColumnReference> {
        let mut refs = Vec::new();
        if let Some(current) = self.current.and_then(|id| self.store.table(id)) {
            refs.extend(current.columns().iter().map(|c| ColumnReference {
                table: None,
                column: c.name().to_string(),
            }));
        }
        for table in self.store.tables() {
            refs.extend(table.columns().iter().map(|c| ColumnReference {
                table: Some(table.id().clone()),
                column: c.name().to_string(),
            }));
        }
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridtype_core::{DataType, Value};

    fn store() -> TableStore {
        let mut store = TableStore::new();
        store
            .add_table(
                Table::new(TableId::new("Fruit"), 1)
                    .with_column(Column::new("name", DataType::Text, vec![Value::text("fig")]))
                    .unwrap(),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_current_table_resolution() {
        let store = store();
        let id = TableId::new("Fruit");
        let lookup = StoreLookup::new(&store, Some(&id));
        let found = lookup.lookup_column(None, "name").unwrap();
        assert_eq!(found.table.id(), &id);
        assert!(lookup.lookup_column(None, "colour").is_none());

        let refs: Vec<String> = lookup
            .available_column_references()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(refs, vec!["name", "Fruit.name"]);
    }

    #[test]
    fn test_no_current_table() {
        let store = store();
        let lookup = StoreLookup::new(&store, None);
        assert!(lookup.lookup_column(None, "name").is_none());
        assert!(lookup
            .lookup_column(Some(&TableId::new("Fruit")), "name")
            .is_some());
    }
}
