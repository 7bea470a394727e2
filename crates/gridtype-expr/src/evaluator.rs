//! Expression evaluator
//!
//! Evaluates checked expressions to values. Total operators evaluate every
//! operand left to right before combining them; short-circuiting operators
//! stop at the first operand that settles the result. Local bindings made
//! by patterns travel in the [`EvaluateState`] of each [`ValueResult`].
//!
//! The checker has already ruled out shape errors, so a value of the wrong
//! shape here is an [`InternalError`], not a user failure.

use crate::ast::{AddSubtractOp, Expression};
use crate::context::EvaluationContext;
use crate::env::EvaluateState;
use crate::error::{EvalError, EvaluationFailure, InternalError};
use crate::explanation::{ExplanationLocation, ValueResult};
use crate::types::catalogue::TYPE_TYPE;
use crate::types::TaggedTypeDefinition;
use gridtype_core::{
    compare_values, value_eq, Decimal, FunctionFailure, FunctionValue, TaggedValue, Value,
    ValueFunction,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::MathematicalOps;
use std::collections::BTreeMap;
use tracing::debug;

pub(crate) type EvalResult<T> = Result<T, EvalError>;

/// Evaluate an expression in the given state
///
/// # Example
/// ```rust
/// use gridtype_expr::{evaluate_expression, parse_expression, EvaluateState, EvaluationContext, EvaluationOptions, TypeCatalogue};
/// use gridtype_core::Value;
///
/// let types = TypeCatalogue::default();
/// let expr = parse_expression("(1 + 2) * 4").unwrap();
/// let state = EvaluateState::new(&EvaluationOptions::default());
/// let result = evaluate_expression(&expr, &EvaluationContext::standalone(&types), state).unwrap();
/// assert_eq!(result.value(), &Value::int(12));
/// ```
pub fn evaluate_expression(
    expr: &Expression,
    ctx: &EvaluationContext<'_>,
    state: EvaluateState,
) -> Result<ValueResult, EvalError> {
    debug!(expression = %expr, row = ?state.row(), "evaluate expression");
    Evaluator::new(*ctx).eval(expr, &state)
}

/// Tree-walking evaluator over one context
pub(crate) struct Evaluator<'a> {
    pub(crate) ctx: EvaluationContext<'a>,
}

/// A user-level failure at `node`, with the children evaluated so far
pub(crate) fn failure<'e, I>(node: &Expression, message: String, evaluated: I) -> EvalError
where
    I: IntoIterator<Item = (&'e Expression, &'e ValueResult)>,
{
    EvaluationFailure::new(node, message)
        .with_evaluated(
            evaluated
                .into_iter()
                .map(|(e, r)| (e.clone(), r.value().clone()))
                .collect(),
        )
        .into()
}

fn internal(message: String) -> EvalError {
    InternalError::new(message).into()
}

fn number(result: &ValueResult) -> EvalResult<Decimal> {
    result
        .value()
        .as_number()
        .ok_or_else(|| internal(format!("expected a number, got {}", result.value().type_name())))
}

pub(crate) fn boolean(result: &ValueResult) -> EvalResult<bool> {
    result
        .value()
        .as_bool()
        .ok_or_else(|| internal(format!("expected a boolean, got {}", result.value().type_name())))
}

/// Runtime value of a `type{...}` literal
pub(crate) fn type_value() -> Value {
    Value::Tagged(TaggedValue {
        type_name: TYPE_TYPE.to_string(),
        tag_index: 0,
        tag: TYPE_TYPE.to_string(),
        inner: None,
    })
}

/// A tag as a value: the tagged value itself for bare tags, otherwise a
/// constructor function
pub(crate) fn tag_value(definition: &TaggedTypeDefinition, index: usize) -> EvalResult<Value> {
    let tag = definition
        .tags
        .get(index)
        .ok_or_else(|| internal(format!("tag index {} out of range for {}", index, definition.name)))?;
    Ok(match tag.inner {
        None => Value::Tagged(TaggedValue {
            type_name: definition.name.clone(),
            tag_index: index,
            tag: tag.name.clone(),
            inner: None,
        }),
        Some(_) => Value::Function(FunctionValue::new(TagConstructor {
            type_name: definition.name.clone(),
            tag_index: index,
            tag: tag.name.clone(),
        })),
    })
}

/// Constructor for a tag that carries a value
#[derive(Debug)]
struct TagConstructor {
    type_name: String,
    tag_index: usize,
    tag: String,
}

impl ValueFunction for TagConstructor {
    fn name(&self) -> &str {
        &self.tag
    }

    fn call(&self, args: &[Value]) -> Result<Value, FunctionFailure> {
        let [inner] = args else {
            return Err(FunctionFailure::new(format!("{} takes one value", self.tag)));
        };
        Ok(Value::Tagged(TaggedValue {
            type_name: self.type_name.clone(),
            tag_index: self.tag_index,
            tag: self.tag.clone(),
            inner: Some(Box::new(inner.clone())),
        }))
    }
}

/// `base ^ exponent`, exact for integer exponents
fn raise(base: Decimal, exponent: Decimal) -> Result<Decimal, String> {
    if exponent.fract().is_zero() {
        let power = exponent
            .to_i64()
            .ok_or_else(|| format!("Exponent {} is too large", exponent))?;
        if base.is_zero() && power < 0 {
            return Err("Division by zero".to_string());
        }
        return base
            .checked_powi(power)
            .ok_or_else(|| format!("{} ^ {} is too large", base, exponent));
    }
    if base.is_sign_negative() && !base.is_zero() {
        return Err(format!(
            "Cannot raise negative number {} to fractional power {}",
            base, exponent
        ));
    }
    if exponent == Decimal::new(5, 1) {
        return base
            .sqrt()
            .ok_or_else(|| format!("Cannot take the square root of {}", base));
    }
    base.checked_powd(exponent)
        .ok_or_else(|| format!("{} ^ {} is too large", base, exponent))
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(ctx: EvaluationContext<'a>) -> Self {
        Self { ctx }
    }

    fn done(
        &self,
        expr: &Expression,
        value: Value,
        state: &EvaluateState,
        children: Vec<ValueResult>,
    ) -> ValueResult {
        ValueResult::new(expr, value, state.clone(), children, None)
    }

    /// Evaluate every expression against the same state, left to right
    fn eval_all(&self, exprs: &[Expression], state: &EvaluateState) -> EvalResult<Vec<ValueResult>> {
        exprs.iter().map(|e| self.eval(e, state)).collect()
    }

    pub(crate) fn eval(&self, expr: &Expression, state: &EvaluateState) -> EvalResult<ValueResult> {
        match expr {
            // === Literals ===
            Expression::Number { value, .. } => Ok(self.done(expr, Value::Number(*value), state, vec![])),
            Expression::Text(s) => Ok(self.done(expr, Value::Text(s.clone()), state, vec![])),
            Expression::Boolean(b) => Ok(self.done(expr, Value::Boolean(*b), state, vec![])),
            Expression::Temporal(t) => Ok(self.done(expr, Value::Temporal(*t), state, vec![])),
            Expression::TypeLiteral(_) => Ok(self.done(expr, type_value(), state, vec![])),

            // === Names ===
            Expression::Identifier(name) => self.eval_identifier(expr, name, state),
            Expression::EntireColumn { table, column } => {
                let found = self
                    .ctx
                    .columns
                    .lookup_column(table.as_ref(), column)
                    .ok_or_else(|| internal(format!("column vanished after checking: {}", expr)))?;
                let location = ExplanationLocation {
                    table: found.table.id().clone(),
                    column: column.clone(),
                    row: None,
                };
                let values = Value::Array(found.column.values().to_vec());
                Ok(ValueResult::new(expr, values, state.clone(), vec![], Some(location)))
            }
            Expression::MatchAnything => Err(internal("_ evaluated outside a pattern".to_string())),

            // === Total operators ===
            Expression::Negate(inner) => {
                let result = self.eval(inner, state)?;
                let n = number(&result)?;
                Ok(self.done(expr, Value::Number(-n), state, vec![result]))
            }
            Expression::AddSubtract {
                operands,
                operators,
            } => {
                let results = self.eval_all(operands, state)?;
                let (first, rest) = results
                    .split_first()
                    .ok_or_else(|| internal("empty add/subtract".to_string()))?;
                let mut total = number(first)?;
                for (op, result) in operators.iter().zip(rest) {
                    let n = number(result)?;
                    let next = match op {
                        AddSubtractOp::Add => total.checked_add(n),
                        AddSubtractOp::Subtract => total.checked_sub(n),
                    };
                    total = next.ok_or_else(|| {
                        failure(expr, "Result is too large".to_string(), operands.iter().zip(&results))
                    })?;
                }
                Ok(self.done(expr, Value::Number(total), state, results))
            }
            Expression::Times(items) => {
                let results = self.eval_all(items, state)?;
                let mut product = Decimal::ONE;
                for result in &results {
                    product = product.checked_mul(number(result)?).ok_or_else(|| {
                        failure(expr, "Result is too large".to_string(), items.iter().zip(&results))
                    })?;
                }
                Ok(self.done(expr, Value::Number(product), state, results))
            }
            Expression::Divide {
                numerator,
                denominator,
            } => {
                let top = self.eval(numerator, state)?;
                let bottom = self.eval(denominator, state)?;
                let (n, d) = (number(&top)?, number(&bottom)?);
                let evaluated = [(numerator.as_ref(), &top), (denominator.as_ref(), &bottom)];
                if d.is_zero() {
                    return Err(failure(expr, "Division by zero".to_string(), evaluated));
                }
                let quotient = n
                    .checked_div(d)
                    .ok_or_else(|| failure(expr, "Result is too large".to_string(), evaluated))?;
                Ok(self.done(expr, Value::Number(quotient), state, vec![top, bottom]))
            }
            Expression::Raise { base, exponent } => {
                let b = self.eval(base, state)?;
                let e = self.eval(exponent, state)?;
                let value = raise(number(&b)?, number(&e)?).map_err(|message| {
                    failure(expr, message, [(base.as_ref(), &b), (exponent.as_ref(), &e)])
                })?;
                Ok(self.done(expr, Value::Number(value), state, vec![b, e]))
            }
            Expression::Concat(items) => {
                let results = self.eval_all(items, state)?;
                let mut joined = String::new();
                for result in &results {
                    let text = result.value().as_text().ok_or_else(|| {
                        internal(format!("expected text, got {}", result.value().type_name()))
                    })?;
                    joined.push_str(text);
                }
                Ok(self.done(expr, Value::Text(joined), state, results))
            }
            Expression::NotEqual { left, right } => {
                let l = self.eval(left, state)?;
                let r = self.eval(right, state)?;
                let different = !value_eq(l.value(), r.value());
                Ok(self.done(expr, Value::Boolean(different), state, vec![l, r]))
            }

            // === Short-circuiting operators ===
            Expression::Comparison {
                operands,
                operators,
            } => {
                let (first, rest) = operands
                    .split_first()
                    .ok_or_else(|| internal("empty comparison".to_string()))?;
                let mut results = vec![self.eval(first, state)?];
                for (op, operand) in operators.iter().zip(rest) {
                    let next = self.eval(operand, state)?;
                    let previous = results
                        .last()
                        .ok_or_else(|| internal("comparison lost its operand".to_string()))?;
                    let ordering = compare_values(previous.value(), next.value()).ok_or_else(|| {
                        internal(format!("cannot compare {} with {}", previous.value(), next.value()))
                    })?;
                    results.push(next);
                    if !op.holds(ordering) {
                        return Ok(self.done(expr, Value::Boolean(false), state, results));
                    }
                }
                Ok(self.done(expr, Value::Boolean(true), state, results))
            }
            Expression::Equal {
                operands,
                last_is_pattern,
            } => {
                let (first, rest) = operands
                    .split_first()
                    .ok_or_else(|| internal("empty equality".to_string()))?;
                let head = self.eval(first, state)?;
                let target = head.value().clone();
                let mut results = vec![head];
                let mut post = state.clone();
                for (i, operand) in rest.iter().enumerate() {
                    let is_pattern = *last_is_pattern && i + 1 == rest.len();
                    let result = if is_pattern {
                        self.match_pattern(operand, &target, state)?
                    } else {
                        self.eval(operand, state)?
                    };
                    let holds = if is_pattern {
                        result.is_true()
                    } else {
                        value_eq(&target, result.value())
                    };
                    if is_pattern && holds {
                        post = result.state().clone();
                    }
                    results.push(result);
                    if !holds {
                        return Ok(self.done(expr, Value::Boolean(false), state, results));
                    }
                }
                Ok(self.done(expr, Value::Boolean(true), &post, results))
            }
            Expression::And(items) => {
                let mut current = state.clone();
                let mut results = Vec::with_capacity(items.len());
                for item in items {
                    let result = self.eval(item, &current)?;
                    let holds = boolean(&result)?;
                    current = result.state().clone();
                    results.push(result);
                    if !holds {
                        return Ok(self.done(expr, Value::Boolean(false), state, results));
                    }
                }
                Ok(self.done(expr, Value::Boolean(true), &current, results))
            }
            Expression::Or(items) => {
                let mut results = Vec::with_capacity(items.len());
                for item in items {
                    let result = self.eval(item, state)?;
                    let holds = boolean(&result)?;
                    results.push(result);
                    if holds {
                        return Ok(self.done(expr, Value::Boolean(true), state, results));
                    }
                }
                Ok(self.done(expr, Value::Boolean(false), state, results))
            }

            // === Control flow ===
            Expression::IfThenElse {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.eval(condition, state)?;
                let branch = if boolean(&cond)? {
                    self.eval(then_branch, cond.state())?
                } else {
                    self.eval(else_branch, state)?
                };
                let value = branch.value().clone();
                Ok(self.done(expr, value, state, vec![cond, branch]))
            }
            Expression::Match { subject, clauses } => {
                let subject_result = self.eval(subject, state)?;
                let candidate = subject_result.value().clone();
                let mut results = vec![subject_result];
                for clause in clauses {
                    for alternative in &clause.patterns {
                        let matched = self.match_pattern(&alternative.pattern, &candidate, state)?;
                        let pattern_state = matched.state().clone();
                        let is_match = matched.is_true();
                        results.push(matched);
                        if !is_match {
                            continue;
                        }
                        if let Some(guard) = &alternative.guard {
                            let guard_result = self.eval(guard, &pattern_state)?;
                            let passes = boolean(&guard_result)?;
                            results.push(guard_result);
                            if !passes {
                                continue;
                            }
                        }
                        let outcome = self.eval(&clause.outcome, &pattern_state)?;
                        let value = outcome.value().clone();
                        results.push(outcome);
                        return Ok(self.done(expr, value, state, results));
                    }
                }
                Err(failure(
                    expr,
                    format!("No case matches {}", candidate),
                    std::iter::once(subject.as_ref()).zip(results.iter()),
                ))
            }
            Expression::Define { definitions, body } => {
                let mut current = state.clone();
                let mut results = Vec::new();
                for definition in definitions {
                    let value = self.eval(&definition.value, &current)?;
                    let matched = self.match_pattern(&definition.pattern, value.value(), &current)?;
                    if !matched.is_true() {
                        return Err(failure(
                            expr,
                            format!("{} does not match {}", value.value(), definition.pattern),
                            [(&definition.value, &value)],
                        ));
                    }
                    current = matched.state().clone();
                    results.push(value);
                    results.push(matched);
                }
                let body_result = self.eval(body, &current)?;
                let value = body_result.value().clone();
                results.push(body_result);
                Ok(self.done(expr, value, state, results))
            }

            // === Compound values ===
            Expression::Record(fields) => {
                let mut current = state.clone();
                let mut values = BTreeMap::new();
                let mut results = Vec::with_capacity(fields.len());
                for (name, field) in fields {
                    let result = self.eval(field, &current)?;
                    current = result.state().clone();
                    values.insert(name.clone(), result.value().clone());
                    results.push(result);
                }
                Ok(self.done(expr, Value::Record(values), &current, results))
            }
            Expression::FieldAccess { record, field } => {
                let result = self.eval(record, state)?;
                let value = match result.value() {
                    Value::Record(fields) => fields.get(field).cloned(),
                    _ => None,
                }
                .ok_or_else(|| internal(format!("{} has no field {}", result.value(), field)))?;
                Ok(self.done(expr, value, state, vec![result]))
            }
            Expression::Array(items) => {
                let results = self.eval_all(items, state)?;
                let values = results.iter().map(|r| r.value().clone()).collect();
                Ok(self.done(expr, Value::Array(values), state, results))
            }
            Expression::Call { function, args } => {
                let callee = self.eval(function, state)?;
                let arg_results = self.eval_all(args, state)?;
                let Value::Function(f) = callee.value() else {
                    return Err(internal(format!("cannot call {}", callee.value())));
                };
                let arg_values: Vec<Value> = arg_results.iter().map(|r| r.value().clone()).collect();
                let value = f.call(&arg_values).map_err(|e| {
                    failure(
                        expr,
                        e.0,
                        std::iter::once((function.as_ref(), &callee)).chain(args.iter().zip(&arg_results)),
                    )
                })?;
                let mut children = vec![callee];
                children.extend(arg_results);
                Ok(self.done(expr, value, state, children))
            }
        }
    }

    /// Whether a bare name refers to something other than a new pattern
    /// binding. Same order as the checker: local, tag, column, function.
    pub(crate) fn resolves(&self, name: &str, state: &EvaluateState) -> bool {
        state.get(name).is_some()
            || self.ctx.types.tag(name).is_some()
            || self.ctx.columns.lookup_column(None, name).is_some()
            || self.ctx.functions.lookup_function(name).is_some()
    }

    fn eval_identifier(&self, expr: &Expression, name: &str, state: &EvaluateState) -> EvalResult<ValueResult> {
        if let Some(value) = state.get(name) {
            return Ok(self.done(expr, value.clone(), state, vec![]));
        }
        if let Some((definition, index)) = self.ctx.types.tag(name) {
            return Ok(self.done(expr, tag_value(definition, index)?, state, vec![]));
        }
        if let Some(found) = self.ctx.columns.lookup_column(None, name) {
            let row = state
                .row()
                .ok_or_else(|| internal(format!("column {} used without a current row", name)))?;
            let value = found.column.value_at(row).cloned().ok_or_else(|| {
                internal(format!("row {} out of range for column {}", row, name))
            })?;
            let location = ExplanationLocation {
                table: found.table.id().clone(),
                column: name.to_string(),
                row: Some(row),
            };
            return Ok(ValueResult::new(expr, value, state.clone(), vec![], Some(location)));
        }
        if let Some(definition) = self.ctx.functions.lookup_function(name) {
            return Ok(self.done(expr, definition.to_value(), state, vec![]));
        }
        Err(internal(format!("unknown name at evaluation: {}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationOptions;
    use crate::lookup::StoreLookup;
    use crate::parser::parse_expression;
    use crate::types::TypeCatalogue;
    use gridtype_core::{Column, DataType, Table, TableId, TableStore, Unit};
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn eval(text: &str) -> EvalResult<ValueResult> {
        let types = TypeCatalogue::default();
        let expr = parse_expression(text).unwrap();
        let state = EvaluateState::new(&EvaluationOptions::default());
        evaluate_expression(&expr, &EvaluationContext::standalone(&types), state)
    }

    fn value(text: &str) -> Value {
        eval(text).unwrap().into_value()
    }

    fn dec(s: &str) -> Value {
        Value::Number(Decimal::from_str(s).unwrap())
    }

    fn failure_message(text: &str) -> String {
        match eval(text) {
            Err(EvalError::Failure(f)) => f.message,
            other => panic!("{}: expected failure, got {:?}", text, other),
        }
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(value("1 + 2 - 3"), Value::int(0));
        assert_eq!(value("2 * 3 * 4"), Value::int(24));
        assert_eq!(value("7 / 2"), dec("3.5"));
        assert_eq!(value("-(2{m})"), Value::int(-2));
        assert_eq!(value("0.1 + 0.2"), dec("0.3"));
    }

    #[test]
    fn test_evaluate_raise() {
        assert_eq!(value("2 ^ 10"), Value::int(1024));
        let root = value("9 ^ 0.5").as_number().unwrap();
        assert_eq!(root.round_dp(10), Decimal::from(3));
        assert_eq!(value("2 ^ -1"), dec("0.5"));
        assert!(failure_message("(-8) ^ 0.5").contains("negative"));
        assert_eq!(failure_message("0 ^ -1"), "Division by zero");
    }

    #[test]
    fn test_division_by_zero_keeps_evaluated_children() {
        match eval("(1 + 1) / (2 - 2)") {
            Err(EvalError::Failure(f)) => {
                assert_eq!(f.message, "Division by zero");
                assert_eq!(f.evaluated.len(), 2);
                assert_eq!(f.evaluated[0].1, Value::int(2));
                assert_eq!(f.evaluated[1].1, Value::int(0));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_short_circuit() {
        assert_eq!(value("false & (1 / 0 = 1)"), Value::Boolean(false));
        assert_eq!(value("true | (1 / 0 = 1)"), Value::Boolean(true));
        assert_eq!(value("3 < 2 < (1 / 0)"), Value::Boolean(false));
        assert_eq!(value("1 = 2 = (1 / 0)"), Value::Boolean(false));
    }

    #[test]
    fn test_total_operators_are_strict() {
        assert_eq!(failure_message("1 + (1 / 0)"), "Division by zero");
        assert_eq!(failure_message("\"a\" ; (if 1 / 0 = 1 then \"b\" else \"c\" endif)"), "Division by zero");
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(value("1 < 2 <= 2"), Value::Boolean(true));
        assert_eq!(value("\"b\" > \"a\""), Value::Boolean(true));
        assert_eq!(value("1.0 = 1"), Value::Boolean(true));
        assert_eq!(value("1 <> 1"), Value::Boolean(false));
    }

    #[test]
    fn test_conditionals() {
        assert_eq!(value("if Some(3) =~ Some(n) then n + 1 else 0 endif"), Value::int(4));
        assert_eq!(value("if None =~ Some(n) then n + 1 else 0 endif"), Value::int(0));
        assert_eq!(
            value("if Some(5) =~ Some(n) & n > 3 then n else 0 endif"),
            Value::int(5)
        );
    }

    #[test]
    fn test_conditional_bindings_do_not_escape() {
        let result = eval("if Some(3) =~ Some(n) then n else 0 endif").unwrap();
        assert!(result.state().get("n").is_none());
    }

    #[test]
    fn test_match() {
        let text = "match x case Some(n) given n > 10 then \"big\" case Some(_) then \"small\" case None then \"none\" endmatch";
        let check = |subject: &str| value(&format!("define x = {} then {} enddefine", subject, text));
        assert_eq!(check("Some(20)"), Value::text("big"));
        assert_eq!(check("Some(2)"), Value::text("small"));
        assert_eq!(check("as_type(type{Optional(Number)}, None)"), Value::text("none"));
        assert_eq!(failure_message("match 3 case 1 orcase 2 then true endmatch"), "No case matches 3");
    }

    #[test]
    fn test_define_and_records() {
        assert_eq!(
            value("define (a: x, b: y) = (a: 1, b: 2), z = x + y then z * 10 enddefine"),
            Value::int(30)
        );
        assert_eq!(value("(a: 1, b: \"t\")#b"), Value::text("t"));
        assert!(failure_message("define Some(n) = None then n enddefine").contains("does not match"));
    }

    #[test]
    fn test_functions() {
        assert_eq!(value("sum([1, 2, 3])"), Value::int(6));
        assert_eq!(value("upper(\"ab\" ; \"c\")"), Value::text("ABC"));
        match eval("element([1, 2], 5)") {
            Err(EvalError::Failure(f)) => assert_eq!(f.evaluated.len(), 3),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_columns() {
        let mut store = TableStore::new();
        let table = Table::new(TableId::new("Runs"), 2)
            .with_column(Column::new(
                "distance",
                DataType::number_in(Unit::named("m")),
                vec![Value::int(400), Value::int(800)],
            ))
            .unwrap();
        store.add_table(table).unwrap();
        let id = TableId::new("Runs");
        let lookup = StoreLookup::new(&store, Some(&id));
        let types = TypeCatalogue::default();
        let ctx = EvaluationContext::standalone(&types).with_columns(&lookup);

        let expr = parse_expression("distance * 2").unwrap();
        let state = EvaluateState::for_row(&EvaluationOptions::default(), 1);
        let result = evaluate_expression(&expr, &ctx, state).unwrap();
        assert_eq!(result.value(), &Value::int(1600));

        let expr = parse_expression("sum(@entire Runs.distance)").unwrap();
        let result = evaluate_expression(&expr, &ctx, EvaluateState::default()).unwrap();
        assert_eq!(result.value(), &Value::int(1200));
    }
}
