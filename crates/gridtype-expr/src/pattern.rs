//! Pattern matching
//!
//! A pattern is an expression read in pattern position. Matching yields a
//! boolean [`ValueResult`] whose state carries the bindings the pattern
//! made. A failed match still returns the bindings made before the first
//! failing part; callers branch on the boolean only.

use crate::ast::Expression;
use crate::context::EvaluationContext;
use crate::env::EvaluateState;
use crate::error::EvalError;
use crate::evaluator::{EvalResult, Evaluator};
use crate::explanation::ValueResult;
use gridtype_core::{value_eq, Value};

/// Match `candidate` against the pattern `expr`
pub fn match_as_pattern(
    expr: &Expression,
    candidate: &Value,
    ctx: &EvaluationContext<'_>,
    state: EvaluateState,
) -> Result<ValueResult, EvalError> {
    Evaluator::new(*ctx).match_pattern(expr, candidate, &state)
}

impl Evaluator<'_> {
    fn matched(&self, expr: &Expression, holds: bool, state: &EvaluateState, children: Vec<ValueResult>) -> ValueResult {
        ValueResult::new(expr, Value::Boolean(holds), state.clone(), children, None)
    }

    pub(crate) fn match_pattern(
        &self,
        expr: &Expression,
        candidate: &Value,
        state: &EvaluateState,
    ) -> EvalResult<ValueResult> {
        match expr {
            Expression::MatchAnything => Ok(self.matched(expr, true, state, vec![])),

            Expression::Identifier(name) if !self.resolves(name, state) => {
                let bound = state.add(name, candidate.clone())?;
                Ok(self.matched(expr, true, &bound, vec![]))
            }

            Expression::Record(fields) => {
                let Value::Record(values) = candidate else {
                    return Ok(self.matched(expr, false, state, vec![]));
                };
                let mut current = state.clone();
                let mut children = Vec::with_capacity(fields.len());
                for (name, field_pattern) in fields {
                    let Some(field_value) = values.get(name) else {
                        return Ok(self.matched(expr, false, &current, children));
                    };
                    let result = self.match_pattern(field_pattern, field_value, &current)?;
                    let holds = result.is_true();
                    let next = result.state().clone();
                    children.push(result);
                    if !holds {
                        return Ok(self.matched(expr, false, &current, children));
                    }
                    current = next;
                }
                Ok(self.matched(expr, true, &current, children))
            }

            Expression::Array(items) => {
                let Value::Array(values) = candidate else {
                    return Ok(self.matched(expr, false, state, vec![]));
                };
                if values.len() != items.len() {
                    return Ok(self.matched(expr, false, state, vec![]));
                }
                let mut current = state.clone();
                let mut children = Vec::with_capacity(items.len());
                for (item, value) in items.iter().zip(values) {
                    let result = self.match_pattern(item, value, &current)?;
                    let holds = result.is_true();
                    let next = result.state().clone();
                    children.push(result);
                    if !holds {
                        return Ok(self.matched(expr, false, &current, children));
                    }
                    current = next;
                }
                Ok(self.matched(expr, true, &current, children))
            }

            Expression::Call { function, args } => {
                if let (Expression::Identifier(tag), [inner_pattern]) = (function.as_ref(), args.as_slice()) {
                    if let Some((definition, index)) = self.ctx.types.tag(tag) {
                        let inner = match candidate {
                            Value::Tagged(tagged)
                                if tagged.type_name == definition.name && tagged.tag_index == index =>
                            {
                                tagged.inner.as_deref()
                            }
                            _ => None,
                        };
                        let Some(inner) = inner else {
                            return Ok(self.matched(expr, false, state, vec![]));
                        };
                        let result = self.match_pattern(inner_pattern, inner, state)?;
                        let holds = result.is_true();
                        let next = result.state().clone();
                        return Ok(self.matched(expr, holds, &next, vec![result]));
                    }
                }
                self.match_by_value(expr, candidate, state)
            }

            _ => self.match_by_value(expr, candidate, state),
        }
    }

    /// Anything that is not a binding form matches by equality
    fn match_by_value(
        &self,
        expr: &Expression,
        candidate: &Value,
        state: &EvaluateState,
    ) -> EvalResult<ValueResult> {
        let result = self.eval(expr, state)?;
        let holds = value_eq(result.value(), candidate);
        Ok(self.matched(expr, holds, state, vec![result]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;
    use crate::types::TypeCatalogue;
    use gridtype_core::TaggedValue;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn try_match(pattern: &str, candidate: &Value, state: EvaluateState) -> ValueResult {
        let types = TypeCatalogue::default();
        let expr = parse_expression(pattern).unwrap();
        match_as_pattern(&expr, candidate, &EvaluationContext::standalone(&types), state).unwrap()
    }

    fn some(inner: Value) -> Value {
        Value::Tagged(TaggedValue {
            type_name: "Optional".into(),
            tag_index: 1,
            tag: "Some".into(),
            inner: Some(Box::new(inner)),
        })
    }

    #[test]
    fn test_identifier_binds() {
        let result = try_match("n", &Value::int(4), EvaluateState::default());
        assert!(result.is_true());
        assert_eq!(result.state().get("n"), Some(&Value::int(4)));
    }

    #[test]
    fn test_bound_identifier_compares() {
        let state = EvaluateState::default().add("n", Value::int(4)).unwrap();
        assert!(try_match("n", &Value::int(4), state.clone()).is_true());
        assert!(!try_match("n", &Value::int(5), state).is_true());
    }

    #[test]
    fn test_tag_pattern() {
        let result = try_match("Some(x)", &some(Value::text("a")), EvaluateState::default());
        assert!(result.is_true());
        assert_eq!(result.state().get("x"), Some(&Value::text("a")));

        let none = Value::Tagged(TaggedValue {
            type_name: "Optional".into(),
            tag_index: 0,
            tag: "None".into(),
            inner: None,
        });
        let result = try_match("Some(x)", &none, EvaluateState::default());
        assert!(!result.is_true());
        assert!(result.state().get("x").is_none());
        assert!(try_match("None", &none, EvaluateState::default()).is_true());
    }

    #[test]
    fn test_record_and_array_patterns() {
        let mut fields = BTreeMap::new();
        fields.insert("a".to_string(), Value::int(1));
        fields.insert("b".to_string(), Value::Array(vec![Value::int(2), Value::int(3)]));
        let record = Value::Record(fields);

        let result = try_match("(a: 1, b: [_, y])", &record, EvaluateState::default());
        assert!(result.is_true());
        assert_eq!(result.state().get("y"), Some(&Value::int(3)));

        let result = try_match("(a: 2, b: [_, y])", &record, EvaluateState::default());
        assert!(!result.is_true());
        assert!(result.state().get("y").is_none());

        assert!(!try_match("(b: [z])", &record, EvaluateState::default()).is_true());
    }

    fn pair(a: i64, b: i64) -> Value {
        let mut fields = BTreeMap::new();
        fields.insert("a".to_string(), Value::int(a));
        fields.insert("b".to_string(), Value::int(b));
        Value::Record(fields)
    }

    #[test]
    fn test_record_pattern_stops_at_first_failing_field() {
        // Evaluating the second field would fail with a division by zero
        let result = try_match("(a: 2, b: 1 / 0)", &pair(1, 0), EvaluateState::default());
        assert!(!result.is_true());
    }

    #[test]
    fn test_failed_record_match_keeps_earlier_bindings() {
        let result = try_match("(a: x, b: 3)", &pair(1, 2), EvaluateState::default());
        assert!(!result.is_true());
        assert_eq!(result.state().get("x"), Some(&Value::int(1)));

        let result = try_match("[x, 3]", &Value::Array(vec![Value::int(1), Value::int(2)]), EvaluateState::default());
        assert!(!result.is_true());
        assert_eq!(result.state().get("x"), Some(&Value::int(1)));
    }

    #[test]
    fn test_expression_pattern_compares() {
        assert!(try_match("1 + 1", &Value::int(2), EvaluateState::default()).is_true());
        assert!(!try_match("\"a\"", &Value::text("b"), EvaluateState::default()).is_true());
    }
}
