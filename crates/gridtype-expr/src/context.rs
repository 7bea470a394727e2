//! Options and collaborator bundles for checking and evaluation

use crate::functions::{registry, FunctionLookup};
use crate::lookup::{ColumnLookup, NoTables};
use crate::types::TypeCatalogue;
use gridtype_core::UnitCatalogue;

/// Where an expression is being used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationInfo {
    /// Computed once per row; bare column names refer to this row's value
    #[default]
    RowLevel,
    /// Computed once per table; columns must be referenced whole
    TableLevel,
}

/// Configuration for a check
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub location: LocationInfo,
    pub unit_catalogue: UnitCatalogue,
    pub type_catalogue: TypeCatalogue,
}

/// Configuration for an evaluation
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationOptions {
    /// Keep child results so [`ValueResult::explain`](crate::ValueResult::explain) works
    pub record_explanation: bool,
}

/// Everything the checker consults besides the expression itself
#[derive(Clone, Copy)]
pub struct CheckContext<'a> {
    pub columns: &'a dyn ColumnLookup,
    pub functions: &'a dyn FunctionLookup,
    pub options: &'a CheckOptions,
}

impl<'a> CheckContext<'a> {
    /// Builtin functions, no tables
    pub fn standalone(options: &'a CheckOptions) -> Self {
        Self {
            columns: &NoTables,
            functions: registry(),
            options,
        }
    }

    pub fn with_columns(self, columns: &'a dyn ColumnLookup) -> Self {
        Self { columns, ..self }
    }
}

/// Everything the evaluator consults besides the expression and state
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub columns: &'a dyn ColumnLookup,
    pub functions: &'a dyn FunctionLookup,
    pub types: &'a TypeCatalogue,
}

impl<'a> EvaluationContext<'a> {
    /// Builtin functions, no tables
    pub fn standalone(types: &'a TypeCatalogue) -> Self {
        Self {
            columns: &NoTables,
            functions: registry(),
            types,
        }
    }

    pub fn with_columns(self, columns: &'a dyn ColumnLookup) -> Self {
        Self { columns, ..self }
    }
}
