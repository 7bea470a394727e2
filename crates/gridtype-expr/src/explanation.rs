//! Evaluation results and their provenance
//!
//! A [`ValueResult`] always carries the value and the state it was produced
//! in. When the evaluation state asks for explanations it also keeps the
//! node and its child results; [`ValueResult::explain`] turns those into an
//! [`Explanation`] tree on demand. Nothing is retained when capture is off.

use crate::ast::Expression;
use crate::env::EvaluateState;
use crate::error::InternalError;
use gridtype_core::{TableId, Value};
use std::fmt;
use std::fmt::Write as _;

/// Where a value was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplanationLocation {
    pub table: TableId,
    pub column: String,
    /// `None` when the whole column was used
    pub row: Option<usize>,
}

impl fmt::Display for ExplanationLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)?;
        if let Some(row) = self.row {
            write!(f, " row {}", row)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Capture {
    expression: Expression,
    children: Vec<ValueResult>,
    location: Option<ExplanationLocation>,
}

/// The outcome of evaluating one node
#[derive(Debug, Clone)]
pub struct ValueResult {
    value: Value,
    state: EvaluateState,
    capture: Option<Box<Capture>>,
}

impl ValueResult {
    /// Build a result; children and location are kept only if `state`
    /// records explanations
    pub(crate) fn new(
        expression: &Expression,
        value: Value,
        state: EvaluateState,
        children: Vec<ValueResult>,
        location: Option<ExplanationLocation>,
    ) -> Self {
        let capture = state.record_explanation().then(|| {
            Box::new(Capture {
                expression: expression.clone(),
                children,
                location,
            })
        });
        Self {
            value,
            state,
            capture,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// State after evaluating the node, including any bindings it made
    pub fn state(&self) -> &EvaluateState {
        &self.state
    }

    /// True if the value is boolean `true`; pattern matches report success
    /// this way
    pub fn is_true(&self) -> bool {
        self.value.as_bool() == Some(true)
    }

    /// Materialise the provenance tree.
    ///
    /// Fails with an internal error when the evaluation did not record
    /// explanations.
    pub fn explain(&self) -> Result<Explanation, InternalError> {
        let capture = self.capture.as_ref().ok_or_else(|| {
            InternalError::new("explanation requested for an evaluation that did not record one")
        })?;
        Ok(Explanation {
            expression: capture.expression.clone(),
            value: self.value.clone(),
            location: capture.location.clone(),
            children: capture
                .children
                .iter()
                .map(ValueResult::explain)
                .collect::<Result<_, _>>()?,
        })
    }
}

/// How a value came about: the node, its value, where it was read from and
/// the sub-evaluations that fed it
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub expression: Expression,
    pub value: Value,
    pub location: Option<ExplanationLocation>,
    pub children: Vec<Explanation>,
}

impl Explanation {
    /// Indented audit trail, one line per node
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_into(&mut out, 0);
        out
    }

    fn describe_into(&self, out: &mut String, depth: usize) {
        let _ = write!(out, "{:indent$}{} = {}", "", self.expression, self.value, indent = depth * 2);
        if let Some(location) = &self.location {
            let _ = write!(out, "  [{}]", location);
        }
        out.push('\n');
        for child in &self.children {
            // Literals explain themselves
            if child.children.is_empty() && child.location.is_none() && is_literal(&child.expression) {
                continue;
            }
            child.describe_into(out, depth + 1);
        }
    }
}

fn is_literal(expr: &Expression) -> bool {
    matches!(
        expr,
        Expression::Number { .. }
            | Expression::Text(_)
            | Expression::Boolean(_)
            | Expression::Temporal(_)
            | Expression::TypeLiteral(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationOptions;

    #[test]
    fn test_explain_without_capture_is_internal_error() {
        let state = EvaluateState::new(&EvaluationOptions::default());
        let result = ValueResult::new(&Expression::number(1), Value::int(1), state, vec![], None);
        assert!(result.explain().is_err());
        assert_eq!(result.value(), &Value::int(1));
    }

    #[test]
    fn test_describe() {
        let options = EvaluationOptions {
            record_explanation: true,
        };
        let state = EvaluateState::for_row(&options, 0);
        let leaf = ValueResult::new(
            &Expression::ident("distance"),
            Value::int(400),
            state.clone(),
            vec![],
            Some(ExplanationLocation {
                table: TableId::new("Runs"),
                column: "distance".into(),
                row: Some(0),
            }),
        );
        let two = ValueResult::new(&Expression::number(2), Value::int(2), state.clone(), vec![], None);
        let expr = Expression::Times(vec![Expression::ident("distance"), Expression::number(2)]);
        let root = ValueResult::new(&expr, Value::int(800), state, vec![leaf, two], None);

        let text = root.explain().unwrap().describe();
        assert_eq!(text, "distance * 2 = 800\n  distance = 400  [Runs.distance row 0]\n");
    }
}
