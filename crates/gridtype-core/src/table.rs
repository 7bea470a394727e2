//! In-memory tables
//!
//! A minimal column store: each [`Table`] owns typed [`Column`]s of equal
//! length. The expression engine only reads tables through its lookup
//! traits; this module provides the storage those lookups resolve against.

use crate::data_type::DataType;
use crate::error::{CoreResult, Error};
use crate::value::Value;
use std::fmt;

/// Identifier of a table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableId(pub String);

impl TableId {
    /// Create a table identifier
    pub fn new<S: Into<String>>(id: S) -> Self {
        TableId(id.into())
    }

    /// The identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, typed column of values
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Column {
    name: String,
    data_type: DataType,
    values: Vec<Value>,
}

impl Column {
    /// Create a column
    pub fn new<S: Into<String>>(name: S, data_type: DataType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            data_type,
            values,
        }
    }

    /// Column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type of every value in the column
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Value at a row index
    pub fn value_at(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    /// All values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the column has no rows
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A table: columns of equal length
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Table {
    id: TableId,
    row_count: usize,
    columns: Vec<Column>,
}

impl Table {
    /// Create an empty table with a fixed row count
    pub fn new(id: TableId, row_count: usize) -> Self {
        Self {
            id,
            row_count,
            columns: Vec::new(),
        }
    }

    /// Table identifier
    pub fn id(&self) -> &TableId {
        &self.id
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Add a column; its length must match the row count and its name must be new
    pub fn add_column(&mut self, column: Column) -> CoreResult<()> {
        if self.column(column.name()).is_some() {
            return Err(Error::DuplicateColumn {
                table: self.id.0.clone(),
                column: column.name().to_string(),
            });
        }
        if column.len() != self.row_count {
            return Err(Error::RowCountMismatch {
                table: self.id.0.clone(),
                column: column.name().to_string(),
                expected: self.row_count,
                actual: column.len(),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    /// Builder-style [`Table::add_column`]
    pub fn with_column(mut self, column: Column) -> CoreResult<Self> {
        self.add_column(column)?;
        Ok(self)
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// All columns, in insertion order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}

/// A collection of tables
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableStore {
    tables: Vec<Table>,
}

impl TableStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table with a new identifier
    pub fn add_table(&mut self, table: Table) -> CoreResult<()> {
        if self.table(table.id()).is_some() {
            return Err(Error::DuplicateTable(table.id().0.clone()));
        }
        self.tables.push(table);
        Ok(())
    }

    /// Look up a table
    pub fn table(&self, id: &TableId) -> Option<&Table> {
        self.tables.iter().find(|t| t.id() == id)
    }

    /// Look up a table, failing with [`Error::TableNotFound`]
    pub fn require_table(&self, id: &TableId) -> CoreResult<&Table> {
        self.table(id)
            .ok_or_else(|| Error::TableNotFound(id.0.clone()))
    }

    /// All tables, in insertion order
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices() -> Table {
        Table::new(TableId::new("Prices"), 2)
            .with_column(Column::new(
                "item",
                DataType::Text,
                vec![Value::text("tea"), Value::text("cake")],
            ))
            .unwrap()
    }

    #[test]
    fn test_add_column_checks_length() {
        let mut table = prices();
        let err = table
            .add_column(Column::new("cost", DataType::number(), vec![Value::int(1)]))
            .unwrap_err();
        assert!(matches!(err, Error::RowCountMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn test_duplicate_column() {
        let mut table = prices();
        let err = table
            .add_column(Column::new("item", DataType::Text, vec![Value::text("a"), Value::text("b")]))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn { .. }));
    }

    #[test]
    fn test_store_lookup() {
        let mut store = TableStore::new();
        store.add_table(prices()).unwrap();
        assert!(store.add_table(prices()).is_err());

        let table = store.require_table(&TableId::new("Prices")).unwrap();
        assert_eq!(table.column("item").unwrap().value_at(1), Some(&Value::text("cake")));
        assert!(store.require_table(&TableId::new("Nope")).is_err());
    }
}
