//! Array functions

use super::{array_arg, number_arg, FunctionDefinition, FunctionSignature};
use crate::types::{TypeClass, TypeExpr, Unifier};
use gridtype_core::{compare_values, Decimal, FunctionFailure, Value};
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;

pub(super) fn definitions() -> Vec<FunctionDefinition> {
    vec![
        FunctionDefinition {
            name: "sum",
            namespace: "list",
            description: "Total of an array of numbers",
            signature: sig_sum,
            implementation: fn_sum,
        },
        FunctionDefinition {
            name: "count",
            namespace: "list",
            description: "Number of items in an array",
            signature: sig_count,
            implementation: fn_count,
        },
        FunctionDefinition {
            name: "minimum",
            namespace: "list",
            description: "Smallest item of a non-empty array",
            signature: sig_extreme,
            implementation: fn_minimum,
        },
        FunctionDefinition {
            name: "maximum",
            namespace: "list",
            description: "Largest item of a non-empty array",
            signature: sig_extreme,
            implementation: fn_maximum,
        },
        FunctionDefinition {
            name: "element",
            namespace: "list",
            description: "Item at a 1-based position",
            signature: sig_element,
            implementation: fn_element,
        },
    ]
}

fn sig_sum(unifier: &mut Unifier) -> FunctionSignature {
    let number = unifier.fresh_number();
    FunctionSignature::new(vec![TypeExpr::Array(Box::new(number.clone()))], number)
}

fn sig_count(unifier: &mut Unifier) -> FunctionSignature {
    let item = unifier.fresh();
    FunctionSignature::new(vec![TypeExpr::Array(Box::new(item))], TypeExpr::number())
}

fn sig_extreme(unifier: &mut Unifier) -> FunctionSignature {
    let item = unifier.fresh();
    FunctionSignature::new(vec![TypeExpr::Array(Box::new(item.clone()))], item.clone())
        .requiring(item, TypeClass::Comparable)
}

fn sig_element(unifier: &mut Unifier) -> FunctionSignature {
    let item = unifier.fresh();
    FunctionSignature::new(
        vec![TypeExpr::Array(Box::new(item.clone())), TypeExpr::number()],
        item,
    )
}

/// SUM function
pub fn fn_sum(args: &[Value]) -> Result<Value, FunctionFailure> {
    let mut total = Decimal::ZERO;
    for (i, item) in array_arg(args, 0)?.iter().enumerate() {
        let n = number_arg(std::slice::from_ref(item), 0)?;
        total = total
            .checked_add(n)
            .ok_or_else(|| FunctionFailure::new(format!("sum: overflow at item {}", i + 1)))?;
    }
    Ok(Value::Number(total))
}

/// COUNT function
pub fn fn_count(args: &[Value]) -> Result<Value, FunctionFailure> {
    Ok(Value::Number(Decimal::from(array_arg(args, 0)?.len())))
}

fn extreme(args: &[Value], name: &str, keep: Ordering) -> Result<Value, FunctionFailure> {
    let items = array_arg(args, 0)?;
    let mut best: Option<&Value> = None;
    for item in items {
        best = match best {
            None => Some(item),
            Some(current) => match compare_values(item, current) {
                Some(ordering) if ordering == keep => Some(item),
                Some(_) => Some(current),
                None => {
                    return Err(FunctionFailure::new(format!(
                        "{}: items cannot be compared",
                        name
                    )))
                }
            },
        };
    }
    best.cloned()
        .ok_or_else(|| FunctionFailure::new(format!("{}: the array is empty", name)))
}

/// MINIMUM function
pub fn fn_minimum(args: &[Value]) -> Result<Value, FunctionFailure> {
    extreme(args, "minimum", Ordering::Less)
}

/// MAXIMUM function
pub fn fn_maximum(args: &[Value]) -> Result<Value, FunctionFailure> {
    extreme(args, "maximum", Ordering::Greater)
}

/// ELEMENT function; positions start at 1
pub fn fn_element(args: &[Value]) -> Result<Value, FunctionFailure> {
    let items = array_arg(args, 0)?;
    let position = number_arg(args, 1)?;
    let index = if position.fract().is_zero() {
        position.to_usize().filter(|p| (1..=items.len()).contains(p))
    } else {
        None
    };
    match index {
        Some(p) => Ok(items[p - 1].clone()),
        None => Err(FunctionFailure::new(format!(
            "element: position {} is outside 1..{}",
            position.normalize(),
            items.len()
        ))),
    }
}
