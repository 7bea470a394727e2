//! Prelude module - common imports for gridtype users
//!
//! ```rust
//! use gridtype::prelude::*;
//! ```

pub use crate::{
    // Entry points
    check_expression,
    evaluate_expression,
    parse_expression,
    // Calculation types
    CalculatedColumn,
    CalculationError,
    CalculationOptions,
    CalculationStats,
    // Session configuration
    CheckContext,
    CheckOptions,
    CollectingRecorder,
    // Data model
    Column,
    DataType,
    EvaluateState,
    EvaluationContext,
    EvaluationOptions,
    Expression,
    LocationInfo,
    StoreLookup,
    Table,
    // Extension traits
    TableCalculationExt,
    TableId,
    TableStore,
    TypeCatalogue,
    Unit,
    UnitCatalogue,
    Value,
};
