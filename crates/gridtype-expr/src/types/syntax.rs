//! Type expression sub-language
//!
//! [`TypeSyntax`] is what appears inside `type{...}` literals and in tagged
//! type declarations. It names types the way a user writes them; resolving
//! it against the unit and type catalogues gives a [`TypeExpr`].

use super::catalogue::TypeCatalogue;
use super::unit::UnitTerm;
use super::TypeExpr;
use crate::ast::UnitExpression;
use gridtype_core::{DataType, TemporalKind, UnitCatalogue};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Type as written in source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSyntax {
    /// `Number` or `Number{unit}`
    Number(UnitExpression),
    /// `Text`
    Text,
    /// `Boolean`
    Boolean,
    /// `Date`, `Time`, `DateTime`
    Temporal(TemporalKind),
    /// Declared tagged type, `Optional(Text)`
    Tagged { name: String, params: Vec<TypeSyntax> },
    /// `(a: Number, b: Text)`
    Record(Vec<(String, TypeSyntax)>),
    /// `[Number]`
    Array(Box<TypeSyntax>),
    /// Type parameter of an enclosing tagged type declaration
    Variable(String),
}

/// Failure to resolve type or unit syntax
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeSyntaxError {
    /// Unit name not in the catalogue
    #[error("Unknown unit: {name}")]
    UnknownUnit { name: String, similar: Vec<String> },

    /// Tagged type name not in the catalogue
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// Tagged type used with the wrong number of parameters
    #[error("Type {name} takes {expected} parameter(s), got {actual}")]
    WrongParameterCount {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Type variable outside the declaration that introduces it
    #[error("Unknown type variable: {0}")]
    UnknownTypeVariable(String),

    /// Written unit powers combine to an exponent that does not fit
    #[error("Unit exponent out of range")]
    ExponentOverflow,
}

/// Resolve written unit syntax to a unit term, canonicalising aliases
pub fn resolve_unit(
    unit: &UnitExpression,
    catalogue: &UnitCatalogue,
) -> Result<UnitTerm, TypeSyntaxError> {
    Ok(match unit {
        UnitExpression::Scalar => UnitTerm::scalar(),
        UnitExpression::Named(name) => match catalogue.canonical(name) {
            Some(canonical) => UnitTerm::named(canonical),
            None => {
                return Err(TypeSyntaxError::UnknownUnit {
                    name: name.clone(),
                    similar: catalogue.similar(name).into_iter().map(String::from).collect(),
                })
            }
        },
        UnitExpression::Times(items) => {
            let mut product = UnitTerm::scalar();
            for item in items {
                product = product
                    .checked_multiply(&resolve_unit(item, catalogue)?)
                    .ok_or(TypeSyntaxError::ExponentOverflow)?;
            }
            product
        }
        UnitExpression::Divide(top, bottom) => resolve_unit(top, catalogue)?
            .checked_divide(&resolve_unit(bottom, catalogue)?)
            .ok_or(TypeSyntaxError::ExponentOverflow)?,
        UnitExpression::Raise(base, power) => resolve_unit(base, catalogue)?
            .checked_raise(*power)
            .ok_or(TypeSyntaxError::ExponentOverflow)?,
    })
}

impl TypeSyntax {
    /// Written form of a concrete type; `None` for function types, which
    /// have no syntax
    pub fn from_data_type(data_type: &DataType) -> Option<Self> {
        Some(match data_type {
            DataType::Number(unit) => TypeSyntax::Number(UnitExpression::from_unit(unit)),
            DataType::Text => TypeSyntax::Text,
            DataType::Boolean => TypeSyntax::Boolean,
            DataType::Temporal(kind) => TypeSyntax::Temporal(*kind),
            DataType::Tagged { name, params } => TypeSyntax::Tagged {
                name: name.clone(),
                params: params
                    .iter()
                    .map(TypeSyntax::from_data_type)
                    .collect::<Option<_>>()?,
            },
            DataType::Record(fields) => TypeSyntax::Record(
                fields
                    .iter()
                    .map(|(name, ty)| Some((name.clone(), TypeSyntax::from_data_type(ty)?)))
                    .collect::<Option<_>>()?,
            ),
            DataType::Array(inner) => {
                TypeSyntax::Array(Box::new(TypeSyntax::from_data_type(inner)?))
            }
            DataType::Function { .. } => return None,
        })
    }

    /// Resolve to a checker type. `params` binds the type variables of an
    /// enclosing tagged type declaration.
    pub fn resolve(
        &self,
        units: &UnitCatalogue,
        types: &TypeCatalogue,
        params: &BTreeMap<String, TypeExpr>,
    ) -> Result<TypeExpr, TypeSyntaxError> {
        Ok(match self {
            TypeSyntax::Number(unit) => TypeExpr::Number(resolve_unit(unit, units)?),
            TypeSyntax::Text => TypeExpr::Text,
            TypeSyntax::Boolean => TypeExpr::Boolean,
            TypeSyntax::Temporal(kind) => TypeExpr::Temporal(*kind),
            TypeSyntax::Tagged { name, params: args } => {
                let definition = types
                    .get(name)
                    .ok_or_else(|| TypeSyntaxError::UnknownType(name.clone()))?;
                if definition.params.len() != args.len() {
                    return Err(TypeSyntaxError::WrongParameterCount {
                        name: name.clone(),
                        expected: definition.params.len(),
                        actual: args.len(),
                    });
                }
                TypeExpr::Tagged {
                    name: name.clone(),
                    params: args
                        .iter()
                        .map(|a| a.resolve(units, types, params))
                        .collect::<Result<_, _>>()?,
                }
            }
            TypeSyntax::Record(fields) => TypeExpr::Record {
                fields: fields
                    .iter()
                    .map(|(name, ty)| Ok((name.clone(), ty.resolve(units, types, params)?)))
                    .collect::<Result<_, TypeSyntaxError>>()?,
                complete: true,
            },
            TypeSyntax::Array(inner) => {
                TypeExpr::Array(Box::new(inner.resolve(units, types, params)?))
            }
            TypeSyntax::Variable(name) => params
                .get(name)
                .cloned()
                .ok_or_else(|| TypeSyntaxError::UnknownTypeVariable(name.clone()))?,
        })
    }
}

impl fmt::Display for TypeSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSyntax::Number(unit) if unit.is_scalar() => write!(f, "Number"),
            TypeSyntax::Number(unit) => write!(f, "Number{{{}}}", unit),
            TypeSyntax::Text => write!(f, "Text"),
            TypeSyntax::Boolean => write!(f, "Boolean"),
            TypeSyntax::Temporal(kind) => write!(f, "{}", kind),
            TypeSyntax::Tagged { name, params } => {
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
            TypeSyntax::Record(fields) => {
                write!(f, "(")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, ty)?;
                }
                write!(f, ")")
            }
            TypeSyntax::Array(inner) => write!(f, "[{}]", inner),
            TypeSyntax::Variable(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridtype_core::{Rational, Unit};

    #[test]
    fn test_resolve_unit_aliases() {
        let units = UnitCatalogue::default();
        // metre/second^2
        let syntax = UnitExpression::Divide(
            Box::new(UnitExpression::Named("metre".into())),
            Box::new(UnitExpression::Raise(
                Box::new(UnitExpression::Named("second".into())),
                Rational::integer(2),
            )),
        );
        let term = resolve_unit(&syntax, &units).unwrap();
        assert_eq!(
            term.to_unit().unwrap(),
            Unit::named("m").divide(&Unit::named("s").raise(2))
        );
    }

    #[test]
    fn test_unit_powers_out_of_range() {
        let units = UnitCatalogue::default();
        let huge = |base: UnitExpression| {
            UnitExpression::Raise(Box::new(base), Rational::integer(1 << 40))
        };
        let syntax = huge(huge(UnitExpression::Named("m".into())));
        assert_eq!(
            resolve_unit(&syntax, &units),
            Err(TypeSyntaxError::ExponentOverflow)
        );
    }

    #[test]
    fn test_unknown_unit_suggests() {
        let units = UnitCatalogue::default();
        let err = resolve_unit(&UnitExpression::Named("usd".into()), &units).unwrap_err();
        assert_eq!(
            err,
            TypeSyntaxError::UnknownUnit {
                name: "usd".into(),
                similar: vec!["USD".into()]
            }
        );
    }

    #[test]
    fn test_resolve_tagged() {
        let units = UnitCatalogue::default();
        let types = TypeCatalogue::default();
        let syntax = TypeSyntax::Tagged {
            name: "Optional".into(),
            params: vec![TypeSyntax::Text],
        };
        assert_eq!(
            syntax.resolve(&units, &types, &BTreeMap::new()).unwrap(),
            TypeExpr::Tagged {
                name: "Optional".into(),
                params: vec![TypeExpr::Text]
            }
        );

        let wrong = TypeSyntax::Tagged {
            name: "Optional".into(),
            params: vec![],
        };
        assert!(matches!(
            wrong.resolve(&units, &types, &BTreeMap::new()),
            Err(TypeSyntaxError::WrongParameterCount { expected: 1, actual: 0, .. })
        ));
    }

    #[test]
    fn test_display() {
        let syntax = TypeSyntax::Array(Box::new(TypeSyntax::Record(vec![
            ("a".into(), TypeSyntax::Number(UnitExpression::Named("m".into()))),
            ("b".into(), TypeSyntax::Temporal(TemporalKind::Date)),
        ])));
        assert_eq!(syntax.to_string(), "[(a: Number{m}, b: Date)]");
    }
}
