//! Concrete data types
//!
//! [`DataType`] is the fully-known type of a column or of a checked
//! expression's result. It has no type or unit variables; the checker's
//! unification types resolve into it once inference is complete.

use crate::temporal::TemporalKind;
use crate::unit::Unit;
use std::collections::BTreeMap;
use std::fmt;

/// A concrete, variable-free type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    /// Number with a unit of measure (scalar for plain numbers)
    Number(Unit),
    /// Text
    Text,
    /// Boolean
    Boolean,
    /// Date / time
    Temporal(TemporalKind),
    /// Instance of a declared tagged type, with its type arguments
    Tagged { name: String, params: Vec<DataType> },
    /// Record with named fields
    Record(BTreeMap<String, DataType>),
    /// Homogeneous array
    Array(Box<DataType>),
    /// Function from arguments to a result
    Function { args: Vec<DataType>, result: Box<DataType> },
}

impl DataType {
    /// Plain number with no unit
    pub fn number() -> Self {
        DataType::Number(Unit::scalar())
    }

    /// Number with the given unit
    pub fn number_in(unit: Unit) -> Self {
        DataType::Number(unit)
    }

    /// Check if values of this type can be compared and equated
    pub fn is_comparable(&self) -> bool {
        match self {
            DataType::Number(_) | DataType::Text | DataType::Boolean | DataType::Temporal(_) => {
                true
            }
            DataType::Tagged { params, .. } => params.iter().all(DataType::is_comparable),
            DataType::Record(fields) => fields.values().all(DataType::is_comparable),
            DataType::Array(inner) => inner.is_comparable(),
            DataType::Function { .. } => false,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Number(unit) if unit.is_scalar() => write!(f, "Number"),
            DataType::Number(unit) => write!(f, "Number{{{}}}", unit),
            DataType::Text => write!(f, "Text"),
            DataType::Boolean => write!(f, "Boolean"),
            DataType::Temporal(kind) => write!(f, "{}", kind),
            DataType::Tagged { name, params } => {
                write!(f, "{}", name)?;
                if !params.is_empty() {
                    write!(f, "(")?;
                    for (i, p) in params.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", p)?;
                    }
                    write!(f, ")")?;
                }
                Ok(())
            }
            DataType::Record(fields) => {
                write!(f, "(")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, ty)?;
                }
                write!(f, ")")
            }
            DataType::Array(inner) => write!(f, "[{}]", inner),
            DataType::Function { args, result } => {
                write!(f, "(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ") -> {}", result)
            }
        }
    }
}
