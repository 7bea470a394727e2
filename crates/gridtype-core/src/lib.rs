//! # gridtype-core
//!
//! Core data structures for the gridtype expression engine.
//!
//! This crate provides the leaf types the engine builds on:
//! - [`Rational`] - exact rationals for unit exponents and constant folding
//! - [`Unit`] and [`UnitCatalogue`] - concrete units of measure
//! - [`DataType`] - fully-known column and result types
//! - [`Value`] - runtime values
//! - [`TableStore`], [`Table`], [`Column`] - in-memory row storage
//!
//! ## Example
//!
//! ```rust
//! use gridtype_core::{Column, DataType, Table, TableId, Unit, Value};
//!
//! let distance = DataType::number_in(Unit::named("m"));
//! let table = Table::new(TableId::new("Runs"), 2)
//!     .with_column(Column::new("distance", distance, vec![Value::int(400), Value::int(800)]))
//!     .unwrap();
//! assert_eq!(table.column("distance").unwrap().value_at(1), Some(&Value::int(800)));
//! ```

pub mod data_type;
pub mod error;
pub mod rational;
pub mod table;
pub mod temporal;
pub mod unit;
pub mod value;

// Re-exports for convenience
pub use data_type::DataType;
pub use error::{CoreResult, Error};
pub use rational::Rational;
pub use table::{Column, Table, TableId, TableStore};
pub use temporal::{TemporalKind, TemporalValue};
pub use unit::{Unit, UnitCatalogue, UnitDeclaration};
pub use value::{
    compare_values, value_eq, FunctionFailure, FunctionValue, TaggedValue, Value, ValueFunction,
};

/// Re-exported so downstream crates construct numbers with the same decimal type
pub use rust_decimal::Decimal;
