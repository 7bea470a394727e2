//! Column calculation
//!
//! Computes a derived column from an expression: the expression is parsed
//! and checked once at row level, then evaluated row by row in chunks.
//!
//! # Example
//!
//! ```rust
//! use gridtype::prelude::*;
//!
//! let mut store = TableStore::new();
//! let runs = Table::new(TableId::new("Runs"), 2)
//!     .with_column(Column::new(
//!         "distance",
//!         DataType::number_in(Unit::named("m")),
//!         vec![Value::int(400), Value::int(800)],
//!     ))
//!     .unwrap();
//! store.add_table(runs).unwrap();
//!
//! let (column, stats) = store
//!     .calculate_column(&TableId::new("Runs"), "distance * 2", &CalculationOptions::default())
//!     .unwrap();
//! assert_eq!(column.data_type.to_string(), "Number{m}");
//! assert_eq!(column.values, vec![Value::int(800), Value::int(1600)]);
//! assert_eq!(stats.rows, 2);
//! ```

use gridtype_core::{DataType, TableId, TableStore, UnitCatalogue, Value};
use gridtype_expr::{
    check_expression, evaluate_expression, parse_expression, CheckContext, CheckError,
    CheckOptions, CollectingRecorder, EvalError, EvaluateState, EvaluationContext,
    EvaluationFailure, EvaluationOptions, Expression, InternalError, LocationInfo, ParseError,
    RecordedError, StoreLookup, TypeCatalogue, ValueResult,
};
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, warn};

/// Result type for column calculation
pub type CalculationResult<T> = std::result::Result<T, CalculationError>;

/// Why a column could not be calculated
#[derive(Debug, Error)]
pub enum CalculationError {
    #[error("Table not found: {0}")]
    TableNotFound(TableId),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The expression has type errors; each was recorded once
    #[error("Expression has {} type error(s)", .0.len())]
    Type(Vec<RecordedError>),

    /// The expression checks but its type is not fully determined
    #[error("Cannot determine a column type: {0}")]
    UnresolvedType(String),

    /// Evaluation failed at a row
    #[error("Row {row}: {failure}")]
    RowFailure {
        row: usize,
        failure: EvaluationFailure,
    },

    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// Options for column calculation
#[derive(Debug, Clone)]
pub struct CalculationOptions {
    /// Rows evaluated per chunk (default: 1000)
    pub chunk_size: usize,
    /// Keep explanations for each row's result
    pub record_explanation: bool,
    pub unit_catalogue: UnitCatalogue,
    pub type_catalogue: TypeCatalogue,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            record_explanation: false,
            unit_catalogue: UnitCatalogue::default(),
            type_catalogue: TypeCatalogue::default(),
        }
    }
}

/// Statistics from a calculation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Number of rows evaluated
    pub rows: usize,
    /// Number of chunks the rows were evaluated in
    pub chunks: usize,
}

/// A calculated column: its type and one value per row
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedColumn {
    pub data_type: DataType,
    pub values: Vec<Value>,
}

/// An expression checked against one table, ready to evaluate rows.
///
/// Callers that want to stop between chunks drive [`evaluate_rows`]
/// themselves instead of using [`TableCalculationExt::calculate_column`].
///
/// [`evaluate_rows`]: ColumnCalculation::evaluate_rows
pub struct ColumnCalculation<'a> {
    lookup: StoreLookup<'a>,
    expression: Expression,
    data_type: DataType,
    row_count: usize,
    options: &'a CalculationOptions,
}

impl<'a> ColumnCalculation<'a> {
    /// Parse and check `text` as a row-level expression of `table`
    pub fn prepare(
        store: &'a TableStore,
        table: &'a TableId,
        text: &str,
        options: &'a CalculationOptions,
    ) -> CalculationResult<Self> {
        let row_count = store
            .table(table)
            .ok_or_else(|| CalculationError::TableNotFound(table.clone()))?
            .row_count();
        let expression = parse_expression(text)?;
        let lookup = StoreLookup::new(store, Some(table));

        let check_options = CheckOptions {
            location: LocationInfo::RowLevel,
            unit_catalogue: options.unit_catalogue.clone(),
            type_catalogue: options.type_catalogue.clone(),
        };
        let ctx = CheckContext::standalone(&check_options).with_columns(&lookup);
        let mut errors = CollectingRecorder::new();
        let ty = match check_expression(&expression, &ctx, &mut errors) {
            Ok(ty) => ty,
            Err(CheckError::Reported) => return Err(CalculationError::Type(errors.into_errors())),
            Err(CheckError::Internal(e)) => return Err(e.into()),
        };
        let data_type = ty
            .to_data_type()
            .map_err(|e| CalculationError::UnresolvedType(e.0))?;
        debug!(table = %table, expression = %expression, data_type = %data_type, "prepared column calculation");

        Ok(Self {
            lookup,
            expression,
            data_type,
            row_count,
            options,
        })
    }

    /// Type every row's value has
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Evaluate a single row, keeping the full result for explanations
    pub fn evaluate_row(&self, row: usize) -> CalculationResult<ValueResult> {
        let ctx = EvaluationContext::standalone(&self.options.type_catalogue).with_columns(&self.lookup);
        let evaluation = EvaluationOptions {
            record_explanation: self.options.record_explanation,
        };
        let state = EvaluateState::for_row(&evaluation, row);
        evaluate_expression(&self.expression, &ctx, state).map_err(|e| match e {
            EvalError::Failure(failure) => {
                warn!(row, message = %failure.message, "row evaluation failed");
                CalculationError::RowFailure { row, failure }
            }
            EvalError::Internal(e) => e.into(),
        })
    }

    /// Evaluate the rows in `range`, stopping at the first failure
    pub fn evaluate_rows(&self, range: Range<usize>) -> CalculationResult<Vec<Value>> {
        if range.end > self.row_count {
            return Err(InternalError::new(format!(
                "rows {:?} out of range for {} rows",
                range, self.row_count
            ))
            .into());
        }
        range
            .map(|row| self.evaluate_row(row).map(ValueResult::into_value))
            .collect()
    }
}

/// Extension trait for [`TableStore`] to calculate derived columns
pub trait TableCalculationExt {
    /// Evaluate `expression` for every row of `table`
    fn calculate_column(
        &self,
        table: &TableId,
        expression: &str,
        options: &CalculationOptions,
    ) -> CalculationResult<(CalculatedColumn, CalculationStats)>;
}

impl TableCalculationExt for TableStore {
    fn calculate_column(
        &self,
        table: &TableId,
        expression: &str,
        options: &CalculationOptions,
    ) -> CalculationResult<(CalculatedColumn, CalculationStats)> {
        let calculation = ColumnCalculation::prepare(self, table, expression, options)?;
        let rows = calculation.row_count();
        let chunk_size = options.chunk_size.max(1);

        let mut stats = CalculationStats::default();
        let mut values = Vec::with_capacity(rows);
        let mut start = 0;
        while start < rows {
            let end = (start + chunk_size).min(rows);
            debug!(table = %table, start, end, "evaluating chunk");
            values.extend(calculation.evaluate_rows(start..end)?);
            stats.chunks += 1;
            start = end;
        }
        stats.rows = values.len();

        Ok((
            CalculatedColumn {
                data_type: calculation.data_type().clone(),
                values,
            },
            stats,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridtype_core::{Column, Table, Unit};
    use pretty_assertions::assert_eq;

    fn store() -> TableStore {
        let mut store = TableStore::new();
        let runs = Table::new(TableId::new("Runs"), 5)
            .with_column(Column::new(
                "distance",
                DataType::number_in(Unit::named("m")),
                (1..=5).map(|n| Value::int(n * 100)).collect(),
            ))
            .unwrap()
            .with_column(Column::new(
                "laps",
                DataType::number(),
                vec![Value::int(1), Value::int(2), Value::int(0), Value::int(4), Value::int(5)],
            ))
            .unwrap();
        store.add_table(runs).unwrap();
        store
    }

    #[test]
    fn test_chunks() {
        let store = store();
        let options = CalculationOptions {
            chunk_size: 2,
            ..Default::default()
        };
        let (column, stats) = store
            .calculate_column(&TableId::new("Runs"), "distance + 1{m}", &options)
            .unwrap();
        assert_eq!(stats, CalculationStats { rows: 5, chunks: 3 });
        assert_eq!(column.values[4], Value::int(501));
    }

    #[test]
    fn test_row_failure_stops() {
        let store = store();
        let err = store
            .calculate_column(&TableId::new("Runs"), "distance / laps", &CalculationOptions::default())
            .unwrap_err();
        match err {
            CalculationError::RowFailure { row, failure } => {
                assert_eq!(row, 2);
                assert_eq!(failure.message, "Division by zero");
            }
            other => panic!("expected a row failure, got {:?}", other),
        }
    }

    #[test]
    fn test_type_errors_are_collected() {
        let store = store();
        let err = store
            .calculate_column(&TableId::new("Runs"), "distance + laps", &CalculationOptions::default())
            .unwrap_err();
        match err {
            CalculationError::Type(errors) => assert_eq!(errors.len(), 1),
            other => panic!("expected type errors, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_table() {
        let store = store();
        let err = store
            .calculate_column(&TableId::new("Laps"), "1", &CalculationOptions::default())
            .unwrap_err();
        assert!(matches!(err, CalculationError::TableNotFound(_)));
    }

    #[test]
    fn test_caller_driven_chunks() {
        let store = store();
        let options = CalculationOptions::default();
        let id = TableId::new("Runs");
        let calculation = ColumnCalculation::prepare(&store, &id, "laps * 2", &options).unwrap();
        assert_eq!(calculation.evaluate_rows(3..5).unwrap(), vec![Value::int(8), Value::int(10)]);
        assert!(calculation.evaluate_rows(4..6).is_err());
    }
}
