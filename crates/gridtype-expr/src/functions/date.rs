//! Date and time functions

use super::{any_arg, FunctionDefinition, FunctionSignature};
use crate::types::{TypeExpr, UnitTerm, Unifier};
use gridtype_core::{Decimal, FunctionFailure, TemporalKind, TemporalValue, Value};

pub(super) fn definitions() -> Vec<FunctionDefinition> {
    vec![
        FunctionDefinition {
            name: "days_between",
            namespace: "datetime",
            description: "Days from the second date to the first",
            signature: sig_days_between,
            implementation: fn_days_between,
        },
        FunctionDefinition {
            name: "seconds_between",
            namespace: "datetime",
            description: "Seconds from the second date-time to the first",
            signature: sig_seconds_between,
            implementation: fn_seconds_between,
        },
    ]
}

fn sig_days_between(_unifier: &mut Unifier) -> FunctionSignature {
    let date = TypeExpr::Temporal(TemporalKind::Date);
    FunctionSignature::new(
        vec![date.clone(), date],
        TypeExpr::Number(UnitTerm::named("day")),
    )
}

fn sig_seconds_between(_unifier: &mut Unifier) -> FunctionSignature {
    let datetime = TypeExpr::Temporal(TemporalKind::DateTime);
    FunctionSignature::new(
        vec![datetime.clone(), datetime],
        TypeExpr::Number(UnitTerm::named("s")),
    )
}

fn temporal_arg(args: &[Value], index: usize) -> Result<TemporalValue, FunctionFailure> {
    match any_arg(args, index)? {
        Value::Temporal(t) => Ok(*t),
        other => Err(FunctionFailure::new(format!(
            "expected date or time, got {}",
            other.type_name()
        ))),
    }
}

/// DAYS_BETWEEN function: `first - second` in whole days
pub fn fn_days_between(args: &[Value]) -> Result<Value, FunctionFailure> {
    match (temporal_arg(args, 0)?, temporal_arg(args, 1)?) {
        (TemporalValue::Date(a), TemporalValue::Date(b)) => {
            Ok(Value::Number(Decimal::from((a - b).num_days())))
        }
        _ => Err(FunctionFailure::new("days_between: expected two dates")),
    }
}

/// SECONDS_BETWEEN function: `first - second` in seconds, to the millisecond
pub fn fn_seconds_between(args: &[Value]) -> Result<Value, FunctionFailure> {
    match (temporal_arg(args, 0)?, temporal_arg(args, 1)?) {
        (TemporalValue::DateTime(a), TemporalValue::DateTime(b)) => {
            let millis = (a - b).num_milliseconds();
            Ok(Value::Number(Decimal::new(millis, 3).normalize()))
        }
        _ => Err(FunctionFailure::new("seconds_between: expected two date-times")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> Value {
        Value::Temporal(TemporalValue::parse(TemporalKind::Date, s).unwrap())
    }

    #[test]
    fn test_days_between() {
        let result = fn_days_between(&[date("2024-03-01"), date("2024-02-01")]).unwrap();
        assert_eq!(result, Value::int(29));
        let back = fn_days_between(&[date("2024-02-01"), date("2024-03-01")]).unwrap();
        assert_eq!(back, Value::int(-29));
    }

    #[test]
    fn test_seconds_between() {
        let dt = |s| Value::Temporal(TemporalValue::parse(TemporalKind::DateTime, s).unwrap());
        let result =
            fn_seconds_between(&[dt("2024-01-01 00:01:00.5"), dt("2024-01-01 00:00:00")]).unwrap();
        assert_eq!(result.as_number().unwrap().to_string(), "60.5");
    }
}
