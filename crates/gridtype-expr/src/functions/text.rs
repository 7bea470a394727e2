//! Text functions

use super::{text_arg, FunctionDefinition, FunctionSignature};
use crate::types::{TypeExpr, Unifier};
use gridtype_core::{Decimal, FunctionFailure, Value};

pub(super) fn definitions() -> Vec<FunctionDefinition> {
    vec![
        FunctionDefinition {
            name: "text_length",
            namespace: "text",
            description: "Number of characters in a text",
            signature: sig_length,
            implementation: fn_text_length,
        },
        FunctionDefinition {
            name: "lower",
            namespace: "text",
            description: "Lower-case version of a text",
            signature: sig_text_to_text,
            implementation: fn_lower,
        },
        FunctionDefinition {
            name: "upper",
            namespace: "text",
            description: "Upper-case version of a text",
            signature: sig_text_to_text,
            implementation: fn_upper,
        },
    ]
}

fn sig_length(_unifier: &mut Unifier) -> FunctionSignature {
    FunctionSignature::new(vec![TypeExpr::Text], TypeExpr::number())
}

fn sig_text_to_text(_unifier: &mut Unifier) -> FunctionSignature {
    FunctionSignature::new(vec![TypeExpr::Text], TypeExpr::Text)
}

/// TEXT_LENGTH function; counts characters, not bytes
pub fn fn_text_length(args: &[Value]) -> Result<Value, FunctionFailure> {
    Ok(Value::Number(Decimal::from(text_arg(args, 0)?.chars().count())))
}

/// LOWER function
pub fn fn_lower(args: &[Value]) -> Result<Value, FunctionFailure> {
    Ok(Value::Text(text_arg(args, 0)?.to_lowercase()))
}

/// UPPER function
pub fn fn_upper(args: &[Value]) -> Result<Value, FunctionFailure> {
    Ok(Value::Text(text_arg(args, 0)?.to_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_counts_chars() {
        assert_eq!(fn_text_length(&[Value::text("café")]).unwrap(), Value::int(4));
    }

    #[test]
    fn test_case() {
        assert_eq!(fn_lower(&[Value::text("MiXed")]).unwrap(), Value::text("mixed"));
        assert_eq!(fn_upper(&[Value::text("MiXed")]).unwrap(), Value::text("MIXED"));
    }
}
