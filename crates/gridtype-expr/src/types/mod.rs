//! Type representation
//!
//! [`TypeExpr`] is the checker's view of a type: a shape that may still
//! contain type variables and unit variables. Variables are indices into a
//! [`Unifier`] session; a `TypeExpr` only means something relative to the
//! session that created it.

pub mod catalogue;
pub mod syntax;
pub mod unify;
pub mod unit;

pub use catalogue::{TagDefinition, TaggedTypeDefinition, TypeCatalogue};
pub use syntax::TypeSyntax;
pub use unify::{ExponentOverflow, MismatchReason, TypeMismatch, Unifier, UnifyError};
pub use unit::{UnitAtom, UnitTerm, UnitVarId};

use gridtype_core::{DataType, TemporalKind};
use std::collections::BTreeMap;
use std::fmt;

/// Index of a type variable in a unifier session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(pub(crate) usize);

impl TypeVarId {
    /// Position of the variable in its session
    pub fn index(self) -> usize {
        self.0
    }
}

/// A type that may contain variables
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// Unification variable
    Var(TypeVarId),
    /// Number with a unit term
    Number(UnitTerm),
    /// Text
    Text,
    /// Boolean
    Boolean,
    /// Date / time
    Temporal(TemporalKind),
    /// Instance of a declared tagged type
    Tagged { name: String, params: Vec<TypeExpr> },
    /// Record; `complete == false` for pattern records that may omit fields
    Record {
        fields: BTreeMap<String, TypeExpr>,
        complete: bool,
    },
    /// Homogeneous array
    Array(Box<TypeExpr>),
    /// Function type
    Function {
        args: Vec<TypeExpr>,
        result: Box<TypeExpr>,
    },
}

/// Capabilities required of a type by the constructs that use it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    /// Values can be compared with `=` and matched as patterns
    Equatable,
    /// Values can be ordered with `<`, `>=` etc.
    Comparable,
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeClass::Equatable => write!(f, "Equatable"),
            TypeClass::Comparable => write!(f, "Comparable"),
        }
    }
}

/// A resolved type still contained a type variable
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Type could not be fully determined: {0}")]
pub struct UnresolvedType(pub String);

impl TypeExpr {
    /// Plain number with no unit
    pub fn number() -> Self {
        TypeExpr::Number(UnitTerm::scalar())
    }

    /// Lift a concrete data type
    pub fn from_data_type(data_type: &DataType) -> Self {
        match data_type {
            DataType::Number(unit) => TypeExpr::Number(UnitTerm::from_unit(unit)),
            DataType::Text => TypeExpr::Text,
            DataType::Boolean => TypeExpr::Boolean,
            DataType::Temporal(kind) => TypeExpr::Temporal(*kind),
            DataType::Tagged { name, params } => TypeExpr::Tagged {
                name: name.clone(),
                params: params.iter().map(TypeExpr::from_data_type).collect(),
            },
            DataType::Record(fields) => TypeExpr::Record {
                fields: fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), TypeExpr::from_data_type(ty)))
                    .collect(),
                complete: true,
            },
            DataType::Array(inner) => TypeExpr::Array(Box::new(TypeExpr::from_data_type(inner))),
            DataType::Function { args, result } => TypeExpr::Function {
                args: args.iter().map(TypeExpr::from_data_type).collect(),
                result: Box::new(TypeExpr::from_data_type(result)),
            },
        }
    }

    /// Convert a fully resolved type to a concrete data type.
    ///
    /// Call on the output of [`Unifier::resolve`]. Unit variables that are
    /// still free default to scalar; a free type variable is an error.
    pub fn to_data_type(&self) -> Result<DataType, UnresolvedType> {
        Ok(match self {
            TypeExpr::Var(_) => return Err(UnresolvedType(self.to_string())),
            TypeExpr::Number(unit) => DataType::Number(unit.to_unit_defaulting()),
            TypeExpr::Text => DataType::Text,
            TypeExpr::Boolean => DataType::Boolean,
            TypeExpr::Temporal(kind) => DataType::Temporal(*kind),
            TypeExpr::Tagged { name, params } => DataType::Tagged {
                name: name.clone(),
                params: params
                    .iter()
                    .map(TypeExpr::to_data_type)
                    .collect::<Result<_, _>>()?,
            },
            TypeExpr::Record { fields, .. } => DataType::Record(
                fields
                    .iter()
                    .map(|(name, ty)| Ok((name.clone(), ty.to_data_type()?)))
                    .collect::<Result<_, UnresolvedType>>()?,
            ),
            TypeExpr::Array(inner) => DataType::Array(Box::new(inner.to_data_type()?)),
            TypeExpr::Function { args, result } => DataType::Function {
                args: args
                    .iter()
                    .map(TypeExpr::to_data_type)
                    .collect::<Result<_, _>>()?,
                result: Box::new(result.to_data_type()?),
            },
        })
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[TypeExpr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Var(id) => write!(f, "?t{}", id.0),
            TypeExpr::Number(unit) if unit.is_scalar() => write!(f, "Number"),
            TypeExpr::Number(unit) => write!(f, "Number{{{}}}", unit),
            TypeExpr::Text => write!(f, "Text"),
            TypeExpr::Boolean => write!(f, "Boolean"),
            TypeExpr::Temporal(kind) => write!(f, "{}", kind),
            TypeExpr::Tagged { name, params } => {
                write!(f, "{}", name)?;
                if !params.is_empty() {
                    write!(f, "(")?;
                    write_list(f, params)?;
                    write!(f, ")")?;
                }
                Ok(())
            }
            TypeExpr::Record { fields, complete } => {
                write!(f, "(")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, ty)?;
                }
                if !complete {
                    write!(f, "{}...", if fields.is_empty() { "" } else { ", " })?;
                }
                write!(f, ")")
            }
            TypeExpr::Array(inner) => write!(f, "[{}]", inner),
            TypeExpr::Function { args, result } => {
                write!(f, "(")?;
                write_list(f, args)?;
                write!(f, ") -> {}", result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridtype_core::Unit;

    #[test]
    fn test_data_type_round_trip() {
        let ty = DataType::Tagged {
            name: "Optional".into(),
            params: vec![DataType::number_in(Unit::named("m"))],
        };
        assert_eq!(TypeExpr::from_data_type(&ty).to_data_type().unwrap(), ty);
    }

    #[test]
    fn test_unit_variables_default_to_scalar() {
        let ty = TypeExpr::Number(UnitTerm::var(UnitVarId(0)));
        assert_eq!(ty.to_data_type().unwrap(), DataType::number());
    }

    #[test]
    fn test_free_type_variable_is_unresolved() {
        let ty = TypeExpr::Array(Box::new(TypeExpr::Var(TypeVarId(2))));
        assert_eq!(ty.to_data_type(), Err(UnresolvedType("[?t2]".into())));
    }

    #[test]
    fn test_display_incomplete_record() {
        let mut fields = BTreeMap::new();
        fields.insert("a".to_string(), TypeExpr::Text);
        let ty = TypeExpr::Record {
            fields,
            complete: false,
        };
        assert_eq!(ty.to_string(), "(a: Text, ...)");
    }
}
