//! Logical functions

use super::{bool_arg, FunctionDefinition, FunctionSignature};
use crate::types::{TypeExpr, Unifier};
use gridtype_core::{FunctionFailure, Value};

pub(super) fn definitions() -> Vec<FunctionDefinition> {
    vec![
        FunctionDefinition {
            name: "not",
            namespace: "boolean",
            description: "Logical negation",
            signature: sig_not,
            implementation: fn_not,
        },
        FunctionDefinition {
            name: "xor",
            namespace: "boolean",
            description: "True when exactly one argument is true",
            signature: sig_xor,
            implementation: fn_xor,
        },
    ]
}

fn sig_not(_unifier: &mut Unifier) -> FunctionSignature {
    FunctionSignature::new(vec![TypeExpr::Boolean], TypeExpr::Boolean)
}

fn sig_xor(_unifier: &mut Unifier) -> FunctionSignature {
    FunctionSignature::new(vec![TypeExpr::Boolean, TypeExpr::Boolean], TypeExpr::Boolean)
}

/// NOT function
pub fn fn_not(args: &[Value]) -> Result<Value, FunctionFailure> {
    Ok(Value::Boolean(!bool_arg(args, 0)?))
}

/// XOR function
pub fn fn_xor(args: &[Value]) -> Result<Value, FunctionFailure> {
    Ok(Value::Boolean(bool_arg(args, 0)? != bool_arg(args, 1)?))
}
