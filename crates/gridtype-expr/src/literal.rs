//! Literal expressions for runtime values
//!
//! [`value_to_expression`] is the inverse of evaluating a literal: render
//! the result with `Display` and parsing gives back an expression that
//! checks to the value's type and evaluates to an equal value.

use crate::ast::{Expression, UnitExpression};
use crate::types::catalogue::TYPE_TYPE;
use crate::types::{TypeCatalogue, TypeExpr, TypeSyntax};
use gridtype_core::{DataType, UnitCatalogue, Value};
use std::collections::BTreeMap;

/// Name of the function used to pin the type of literals that do not
/// determine it on their own (`[]`, `None`)
const AS_TYPE: &str = "as_type";

/// Build a literal expression for `value` of type `data_type`.
///
/// Returns `None` for function values, which have no literal syntax, and
/// for values that do not fit `data_type`.
pub fn value_to_expression(
    value: &Value,
    data_type: &DataType,
    types: &TypeCatalogue,
    units: &UnitCatalogue,
) -> Option<Expression> {
    Some(match (value, data_type) {
        (Value::Number(n), DataType::Number(unit)) => Expression::Number {
            value: *n,
            unit: UnitExpression::from_unit(unit),
        },
        (Value::Text(s), DataType::Text) => Expression::Text(s.clone()),
        (Value::Boolean(b), DataType::Boolean) => Expression::Boolean(*b),
        (Value::Temporal(t), DataType::Temporal(kind)) if t.kind() == *kind => {
            Expression::Temporal(*t)
        }
        (Value::Tagged(tagged), DataType::Tagged { name, params }) if name == TYPE_TYPE => {
            if tagged.type_name != TYPE_TYPE {
                return None;
            }
            let [described] = params.as_slice() else {
                return None;
            };
            Expression::TypeLiteral(TypeSyntax::from_data_type(described)?)
        }
        (Value::Tagged(tagged), DataType::Tagged { name, params }) => {
            if &tagged.type_name != name {
                return None;
            }
            let definition = types.get(name)?;
            let constructor = Expression::Identifier(tagged.tag.clone());
            match &tagged.inner {
                Some(inner) => {
                    let bindings: BTreeMap<String, TypeExpr> = definition
                        .params
                        .iter()
                        .zip(params)
                        .map(|(p, dt)| (p.clone(), TypeExpr::from_data_type(dt)))
                        .collect();
                    let inner_type = definition
                        .inner_type(tagged.tag_index, &bindings, units, types)
                        .ok()??
                        .to_data_type()
                        .ok()?;
                    let inner = value_to_expression(inner, &inner_type, types, units)?;
                    Expression::call(constructor, vec![inner])
                }
                // A bare tag of a parameterised type says nothing about the
                // parameters
                None if !params.is_empty() => pin_type(constructor, data_type)?,
                None => constructor,
            }
        }
        (Value::Record(fields), DataType::Record(field_types)) => {
            if fields.len() != field_types.len() {
                return None;
            }
            Expression::Record(
                fields
                    .iter()
                    .map(|(name, v)| {
                        let ty = field_types.get(name)?;
                        Some((name.clone(), value_to_expression(v, ty, types, units)?))
                    })
                    .collect::<Option<_>>()?,
            )
        }
        (Value::Array(items), DataType::Array(_)) if items.is_empty() => {
            pin_type(Expression::Array(Vec::new()), data_type)?
        }
        (Value::Array(items), DataType::Array(inner)) => Expression::Array(
            items
                .iter()
                .map(|v| value_to_expression(v, inner, types, units))
                .collect::<Option<_>>()?,
        ),
        _ => return None,
    })
}

fn pin_type(expr: Expression, data_type: &DataType) -> Option<Expression> {
    let syntax = TypeSyntax::from_data_type(data_type)?;
    Some(Expression::call(
        Expression::ident(AS_TYPE),
        vec![Expression::TypeLiteral(syntax), expr],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridtype_core::{Decimal, TaggedValue, Unit};
    use pretty_assertions::assert_eq;

    fn render(value: &Value, data_type: &DataType) -> String {
        let types = TypeCatalogue::default();
        let units = UnitCatalogue::default();
        value_to_expression(value, data_type, &types, &units)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_number_keeps_unit() {
        let ty = DataType::number_in(Unit::named("m").divide(&Unit::named("s")));
        assert_eq!(render(&Value::Number(Decimal::new(-25, 1)), &ty), "-2.5{m/s}");
        assert_eq!(render(&Value::int(7), &DataType::number()), "7");
    }

    #[test]
    fn test_tagged_values() {
        let optional = DataType::Tagged {
            name: "Optional".into(),
            params: vec![DataType::Text],
        };
        let some = Value::Tagged(TaggedValue {
            type_name: "Optional".into(),
            tag_index: 1,
            tag: "Some".into(),
            inner: Some(Box::new(Value::text("hi"))),
        });
        assert_eq!(render(&some, &optional), "Some(\"hi\")");

        let none = Value::Tagged(TaggedValue {
            type_name: "Optional".into(),
            tag_index: 0,
            tag: "None".into(),
            inner: None,
        });
        assert_eq!(render(&none, &optional), "as_type(type{Optional(Text)}, None)");
    }

    #[test]
    fn test_records_and_arrays() {
        let mut fields = BTreeMap::new();
        fields.insert("a".to_string(), Value::Boolean(true));
        fields.insert("b".to_string(), Value::Array(vec![]));
        let mut field_types = BTreeMap::new();
        field_types.insert("a".to_string(), DataType::Boolean);
        field_types.insert("b".to_string(), DataType::Array(Box::new(DataType::Text)));

        assert_eq!(
            render(&Value::Record(fields), &DataType::Record(field_types)),
            "(a: true, b: as_type(type{[Text]}, []))"
        );
    }

    #[test]
    fn test_mismatched_value_is_none() {
        let types = TypeCatalogue::default();
        let units = UnitCatalogue::default();
        assert_eq!(
            value_to_expression(&Value::int(1), &DataType::Text, &types, &units),
            None
        );
    }
}
