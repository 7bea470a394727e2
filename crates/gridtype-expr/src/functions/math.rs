//! Math functions

use super::{number_arg, FunctionDefinition, FunctionSignature};
use crate::types::{TypeExpr, Unifier, UnitTerm};
use gridtype_core::{Decimal, FunctionFailure, Rational, Value};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{MathematicalOps, RoundingStrategy};

pub(super) fn definitions() -> Vec<FunctionDefinition> {
    vec![
        FunctionDefinition {
            name: "abs",
            namespace: "number",
            description: "Absolute value, keeping the unit",
            signature: sig_same_unit,
            implementation: fn_abs,
        },
        FunctionDefinition {
            name: "round",
            namespace: "number",
            description: "Round to the given number of decimal places",
            signature: sig_round,
            implementation: fn_round,
        },
        FunctionDefinition {
            name: "sqrt",
            namespace: "number",
            description: "Square root; the unit is rooted too",
            signature: sig_sqrt,
            implementation: fn_sqrt,
        },
    ]
}

fn sig_same_unit(unifier: &mut Unifier) -> FunctionSignature {
    let number = unifier.fresh_number();
    FunctionSignature::new(vec![number.clone()], number)
}

fn sig_round(unifier: &mut Unifier) -> FunctionSignature {
    let number = unifier.fresh_number();
    FunctionSignature::new(vec![number.clone(), TypeExpr::number()], number)
}

fn sig_sqrt(unifier: &mut Unifier) -> FunctionSignature {
    let unit = unifier.fresh_unit_var();
    FunctionSignature::new(
        vec![TypeExpr::Number(UnitTerm::var(unit))],
        TypeExpr::Number(UnitTerm::var_power(unit, Rational::new(1, 2))),
    )
}

/// ABS function
pub fn fn_abs(args: &[Value]) -> Result<Value, FunctionFailure> {
    Ok(Value::Number(number_arg(args, 0)?.abs()))
}

/// ROUND function, half away from zero
pub fn fn_round(args: &[Value]) -> Result<Value, FunctionFailure> {
    let value = number_arg(args, 0)?;
    let places = number_arg(args, 1)?;
    if !places.fract().is_zero() {
        return Err(FunctionFailure::new(format!(
            "round: decimal places must be a whole number, got {}",
            places.normalize()
        )));
    }
    let places = places
        .to_u32()
        .filter(|p| *p <= 28)
        .ok_or_else(|| {
            FunctionFailure::new(format!(
                "round: decimal places must be between 0 and 28, got {}",
                places.normalize()
            ))
        })?;
    Ok(Value::Number(
        value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero),
    ))
}

/// SQRT function
pub fn fn_sqrt(args: &[Value]) -> Result<Value, FunctionFailure> {
    let value = number_arg(args, 0)?;
    if value < Decimal::ZERO {
        return Err(FunctionFailure::new(format!(
            "sqrt: cannot take the square root of {}",
            value.normalize()
        )));
    }
    value
        .sqrt()
        .map(Value::Number)
        .ok_or_else(|| FunctionFailure::new("sqrt: result out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Value {
        Value::Number(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_abs() {
        assert_eq!(fn_abs(&[dec("-2.5")]).unwrap(), dec("2.5"));
    }

    #[test]
    fn test_round() {
        assert_eq!(fn_round(&[dec("2.345"), Value::int(2)]).unwrap(), dec("2.35"));
        assert_eq!(fn_round(&[dec("-2.5"), Value::int(0)]).unwrap(), dec("-3"));
        assert!(fn_round(&[dec("1"), dec("0.5")]).is_err());
        assert!(fn_round(&[dec("1"), Value::int(-1)]).is_err());
    }

    #[test]
    fn test_sqrt() {
        let root = fn_sqrt(&[Value::int(9)]).unwrap().as_number().unwrap();
        assert_eq!(root.round_dp(10), Decimal::from(3));
        assert!(fn_sqrt(&[Value::int(-1)]).is_err());
    }

    #[test]
    fn test_sqrt_roots_unit() {
        let mut unifier = Unifier::new();
        let sig = sig_sqrt(&mut unifier);
        let area = TypeExpr::Number(UnitTerm::named("m").checked_raise(Rational::integer(2)).unwrap());
        unifier.unify(&sig.args[0], &area).unwrap();
        assert_eq!(unifier.display(&sig.result), "Number{m}");
    }
}
