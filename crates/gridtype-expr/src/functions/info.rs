//! Type-directed functions

use super::{any_arg, FunctionDefinition, FunctionSignature};
use crate::types::catalogue::TYPE_TYPE;
use crate::types::{TypeExpr, Unifier};
use gridtype_core::{FunctionFailure, Value};

pub(super) fn definitions() -> Vec<FunctionDefinition> {
    vec![FunctionDefinition {
        name: "as_type",
        namespace: "core",
        description: "The second argument, constrained to the type given first",
        signature: sig_as_type,
        implementation: fn_as_type,
    }]
}

fn sig_as_type(unifier: &mut Unifier) -> FunctionSignature {
    let t = unifier.fresh();
    let type_of_t = TypeExpr::Tagged {
        name: TYPE_TYPE.to_string(),
        params: vec![t.clone()],
    };
    FunctionSignature::new(vec![type_of_t, t.clone()], t)
}

/// AS_TYPE function; the type argument only matters to the checker
pub fn fn_as_type(args: &[Value]) -> Result<Value, FunctionFailure> {
    any_arg(args, 1).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returns_value() {
        let args = [Value::Boolean(true), Value::text("x")];
        assert_eq!(fn_as_type(&args).unwrap(), Value::text("x"));
    }
}
