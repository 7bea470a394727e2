//! # gridtype-expr
//!
//! Expression language for gridtype tables.
//!
//! This crate provides:
//! - Expression parsing (text → AST) and canonical rendering (AST → text)
//! - Type checking with units of measure, tagged types and records
//! - Evaluation with short-circuiting, pattern bindings and optional
//!   explanations of how each value came about
//! - The standard function library
//!
//! ## Example
//!
//! ```rust
//! use gridtype_expr::{
//!     check_expression, evaluate_expression, parse_expression, CheckContext, CheckOptions,
//!     CollectingRecorder, EvaluateState, EvaluationContext, EvaluationOptions,
//! };
//! use gridtype_core::Value;
//!
//! let options = CheckOptions::default();
//! let expr = parse_expression("if Some(4) =~ Some(n) then n * 2 else 0 endif").unwrap();
//!
//! let mut errors = CollectingRecorder::new();
//! let ty = check_expression(&expr, &CheckContext::standalone(&options), &mut errors).unwrap();
//! assert_eq!(ty.to_string(), "Number");
//!
//! let ctx = EvaluationContext::standalone(&options.type_catalogue);
//! let state = EvaluateState::new(&EvaluationOptions::default());
//! let result = evaluate_expression(&expr, &ctx, state).unwrap();
//! assert_eq!(result.value(), &Value::int(8));
//! ```

pub mod ast;
pub mod check;
pub mod context;
mod display;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod explanation;
pub mod functions;
pub mod literal;
pub mod lookup;
pub mod parser;
pub mod pattern;
pub mod recorder;
pub mod types;

pub use ast::{
    AddSubtractOp, ClausePattern, ComparisonOperator, Definition, Expression, MatchClause,
    UnitExpression,
};
pub use check::{check_expression, CheckMode};
pub use context::{CheckContext, CheckOptions, EvaluationContext, EvaluationOptions, LocationInfo};
pub use env::{EvaluateState, TypeState};
pub use error::{
    CheckError, DeclarationError, EvalError, EvaluationFailure, ExprError, ExprResult,
    InternalError, ParseError,
};
pub use evaluator::evaluate_expression;
pub use explanation::{Explanation, ExplanationLocation, ValueResult};
pub use functions::{registry, FunctionDefinition, FunctionLookup, FunctionRegistry};
pub use literal::value_to_expression;
pub use lookup::{ColumnLookup, ColumnReference, FoundColumn, NoTables, StoreLookup};
pub use parser::parse_expression;
pub use pattern::match_as_pattern;
pub use recorder::{CollectingRecorder, ErrorRecorder, QuickFix, RecordedError};
pub use types::{TagDefinition, TaggedTypeDefinition, TypeCatalogue, TypeClass, TypeExpr, TypeSyntax};
