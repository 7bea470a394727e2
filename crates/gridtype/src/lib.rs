//! # gridtype
//!
//! Typed, unit-aware expressions over in-memory tables.
//!
//! gridtype checks formula-style expressions before running them: numbers
//! carry units of measure (`5{m} / 2{s}` is a `Number{m/s}`), tagged types
//! such as `Optional(a)` are matched with patterns, and records and arrays
//! are typed structurally.
//!
//! ## Features
//!
//! - Parse and render expressions (`parse_expression`, `Display`)
//! - Type checking with unit inference and suggested fixes
//! - Evaluation with exact decimals and optional explanations
//! - Derived-column calculation over a [`TableStore`]
//!
//! ## Example
//!
//! ```rust
//! use gridtype::prelude::*;
//!
//! let options = CheckOptions::default();
//! let mut errors = CollectingRecorder::new();
//! let expr = parse_expression("1{km} / 4{min}").unwrap();
//! let ty = check_expression(&expr, &CheckContext::standalone(&options), &mut errors).unwrap();
//! assert_eq!(ty.to_string(), "Number{km/min}");
//!
//! let bad = parse_expression("1{km} + 4{min}").unwrap();
//! assert!(check_expression(&bad, &CheckContext::standalone(&options), &mut errors).is_err());
//! assert!(errors.errors()[0].message.starts_with("Unit mismatch"));
//! ```

pub mod calculation;
pub mod prelude;

// Re-export calculation types
pub use calculation::{
    CalculatedColumn, CalculationError, CalculationOptions, CalculationResult, CalculationStats,
    ColumnCalculation, TableCalculationExt,
};

// Re-export core types
pub use gridtype_core::{
    compare_values, value_eq, Column, CoreResult, DataType, Decimal, Error, FunctionFailure,
    FunctionValue, Rational, Table, TableId, TableStore, TaggedValue, TemporalKind, TemporalValue,
    Unit, UnitCatalogue, UnitDeclaration, Value, ValueFunction,
};

// Re-export expression engine types
pub use gridtype_expr::{
    check_expression, evaluate_expression, match_as_pattern, parse_expression, registry,
    value_to_expression, CheckContext, CheckError, CheckOptions, CollectingRecorder,
    ErrorRecorder, EvalError, EvaluateState, EvaluationContext, EvaluationFailure,
    EvaluationOptions, Explanation, ExplanationLocation, ExprError, ExprResult, Expression,
    FunctionDefinition, FunctionLookup, FunctionRegistry, InternalError, LocationInfo,
    ParseError, QuickFix, RecordedError, StoreLookup, TypeCatalogue, TypeExpr, ValueResult,
};
