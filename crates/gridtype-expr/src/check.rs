//! Type checker
//!
//! [`check_expression`] runs one unifier session over an expression tree.
//! Every node is checked in one of two modes: as an expression, or as a
//! pattern that may bind new names and use `_`. The checker threads a
//! persistent [`TypeState`] through the tree; short-circuiting operators
//! pass the state produced by one operand to the next, total operators
//! check every operand against the same incoming state.
//!
//! User mistakes go to the [`ErrorRecorder`] and come back up as
//! [`CheckError::Reported`], so each error is recorded exactly once.

use crate::ast::{AddSubtractOp, ClausePattern, Expression, UnitExpression};
use crate::context::{CheckContext, LocationInfo};
use crate::env::TypeState;
use crate::error::{CheckError, InternalError};
use crate::recorder::{ErrorRecorder, QuickFix};
use crate::types::catalogue::TYPE_TYPE;
use crate::types::syntax::{resolve_unit, TypeSyntaxError};
use crate::types::{
    MismatchReason, TypeClass, TypeExpr, TypeMismatch, Unifier, UnifyError, UnitTerm,
};
use gridtype_core::{Rational, TemporalKind};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

type CheckResult<T> = Result<T, CheckError>;

/// Whether a node is checked as a value or as a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    Expression,
    Pattern,
}

/// A node's type and the state after checking it
#[derive(Debug, Clone)]
pub struct CheckedType {
    pub ty: TypeExpr,
    pub state: TypeState,
}

impl CheckedType {
    fn new(ty: TypeExpr, state: &TypeState) -> Self {
        Self {
            ty,
            state: state.clone(),
        }
    }
}

/// Type-check an expression in a fresh session.
///
/// Returns the fully resolved result type. Remaining unit variables can be
/// defaulted with [`TypeExpr::to_data_type`].
///
/// # Example
/// ```rust
/// use gridtype_expr::{check_expression, parse_expression, CheckContext, CheckOptions, CollectingRecorder};
///
/// let options = CheckOptions::default();
/// let mut errors = CollectingRecorder::new();
/// let expr = parse_expression("5{m} ^ 2").unwrap();
/// let ty = check_expression(&expr, &CheckContext::standalone(&options), &mut errors).unwrap();
/// assert_eq!(ty.to_string(), "Number{m^2}");
/// ```
pub fn check_expression(
    expr: &Expression,
    ctx: &CheckContext<'_>,
    recorder: &mut dyn ErrorRecorder,
) -> Result<TypeExpr, CheckError> {
    debug!(expression = %expr, "check expression");
    let mut checker = TypeChecker::new(*ctx, recorder);
    let checked = checker.check(expr, &TypeState::new(), CheckMode::Expression)?;
    checker.finish(expr, &checked.ty)
}

/// One check session
pub(crate) struct TypeChecker<'a, 'r> {
    ctx: CheckContext<'a>,
    unifier: Unifier,
    recorder: &'r mut dyn ErrorRecorder,
}

impl<'a, 'r> TypeChecker<'a, 'r> {
    pub(crate) fn new(ctx: CheckContext<'a>, recorder: &'r mut dyn ErrorRecorder) -> Self {
        Self {
            ctx,
            unifier: Unifier::new(),
            recorder,
        }
    }

    /// Discharge type-class obligations and resolve the result
    pub(crate) fn finish(mut self, root: &Expression, ty: &TypeExpr) -> CheckResult<TypeExpr> {
        let failed = match self.unifier.discharge() {
            Ok(failed) => failed,
            Err(overflow) => return Err(self.report(root, overflow.to_string(), Vec::new())),
        };
        let any_failed = !failed.is_empty();
        for obligation in failed {
            let message = match obligation.class {
                TypeClass::Equatable => {
                    format!("Values of type {} cannot be checked for equality", obligation.ty)
                }
                TypeClass::Comparable => {
                    format!("Values of type {} cannot be compared", obligation.ty)
                }
            };
            self.recorder.record_error(&obligation.node, message, Vec::new());
        }
        if any_failed {
            return Err(CheckError::Reported);
        }
        match self.unifier.resolve(ty) {
            Ok(resolved) => Ok(resolved),
            Err(overflow) => Err(self.report(root, overflow.to_string(), Vec::new())),
        }
    }

    // === Reporting ===

    fn report(&mut self, node: &Expression, message: String, fixes: Vec<QuickFix>) -> CheckError {
        debug!(%node, %message, "type error");
        self.recorder.record_error(node, message, fixes);
        CheckError::Reported
    }

    fn mismatch_message(&mut self, mismatch: &TypeMismatch) -> String {
        match &mismatch.reason {
            MismatchReason::Shape => format!(
                "Type mismatch: expected {}, found {}",
                self.unifier.display(&mismatch.expected),
                self.unifier.display(&mismatch.actual)
            ),
            MismatchReason::Unit { expected, actual } => format!(
                "Unit mismatch: expected {}, found {}",
                self.unifier.prune_unit(expected).unwrap_or_else(|_| expected.clone()),
                self.unifier.prune_unit(actual).unwrap_or_else(|_| actual.clone())
            ),
            MismatchReason::MissingField(field) => format!(
                "Record mismatch on field {}: expected {}, found {}",
                field,
                self.unifier.display(&mismatch.expected),
                self.unifier.display(&mismatch.actual)
            ),
        }
    }

    fn unify_at(&mut self, node: &Expression, expected: &TypeExpr, actual: &TypeExpr) -> CheckResult<()> {
        self.unify_or_fix(node, expected, actual, |_, _| Vec::new())
    }

    /// Unify, reporting a mismatch against `node` with the fixes `fixes` builds
    fn unify_or_fix<F>(
        &mut self,
        node: &Expression,
        expected: &TypeExpr,
        actual: &TypeExpr,
        fixes: F,
    ) -> CheckResult<()>
    where
        F: FnOnce(&mut Self, &TypeMismatch) -> Vec<QuickFix>,
    {
        match self.unifier.unify(expected, actual) {
            Ok(()) => Ok(()),
            Err(UnifyError::Mismatch(mismatch)) => {
                let message = self.mismatch_message(&mismatch);
                let fixes = fixes(self, &mismatch);
                Err(self.report(node, message, fixes))
            }
            Err(other) => Err(self.unify_failure(node, other)),
        }
    }

    /// Report a unification failure that comes without fixes
    fn unify_failure(&mut self, node: &Expression, err: UnifyError) -> CheckError {
        match err {
            UnifyError::Mismatch(mismatch) => {
                let message = self.mismatch_message(&mismatch);
                self.report(node, message, Vec::new())
            }
            UnifyError::Overflow(overflow) => self.report(node, overflow.to_string(), Vec::new()),
            UnifyError::Occurs(var) => InternalError::new(format!(
                "cyclic type while checking {}: ?t{}",
                node,
                var.index()
            ))
            .into(),
        }
    }

    /// A unit built by exact exponent arithmetic, or an error at `node`
    /// when an exponent does not fit
    fn exact_unit(&mut self, node: &Expression, unit: Option<UnitTerm>) -> CheckResult<UnitTerm> {
        match unit {
            Some(unit) => Ok(unit),
            None => Err(self.report(node, "Unit exponent out of range".to_string(), Vec::new())),
        }
    }

    /// A numeric literal with its unit replaced by the unit the context
    /// wanted, when that unit is fully known
    fn corrected_literal(&self, node: &Expression, mismatch: &TypeMismatch) -> Vec<QuickFix> {
        let (Expression::Number { value, .. }, MismatchReason::Unit { expected, .. }) =
            (node, &mismatch.reason)
        else {
            return Vec::new();
        };
        match self.unifier.prune_unit(expected).ok().and_then(|u| u.to_unit()) {
            Some(unit) => {
                let replacement = Expression::Number {
                    value: *value,
                    unit: UnitExpression::from_unit(&unit),
                };
                vec![QuickFix::new(format!("Change to {}", replacement), replacement)]
            }
            None => Vec::new(),
        }
    }

    // === Dispatch ===

    pub(crate) fn check(
        &mut self,
        expr: &Expression,
        state: &TypeState,
        mode: CheckMode,
    ) -> CheckResult<CheckedType> {
        if mode == CheckMode::Pattern && !self.is_pattern_form(expr) {
            // Anything else in a pattern is a value the candidate must equal
            let checked = self.check(expr, state, CheckMode::Expression)?;
            self.unifier
                .require(checked.ty.clone(), TypeClass::Equatable, expr);
            return Ok(CheckedType::new(checked.ty, state));
        }

        match expr {
            // === Literals ===
            Expression::Number { value, unit } => {
                match resolve_unit(unit, &self.ctx.options.unit_catalogue) {
                    Ok(term) => Ok(CheckedType::new(TypeExpr::Number(term), state)),
                    Err(TypeSyntaxError::UnknownUnit { name, similar }) => {
                        let fixes = similar
                            .iter()
                            .map(|s| {
                                let replacement = Expression::Number {
                                    value: *value,
                                    unit: rename_unit(unit, &name, s),
                                };
                                QuickFix::new(format!("Change unit to {}", s), replacement)
                            })
                            .collect();
                        Err(self.report(expr, format!("Unknown unit: {}", name), fixes))
                    }
                    Err(other) => Err(self.report(expr, other.to_string(), Vec::new())),
                }
            }
            Expression::Text(_) => Ok(CheckedType::new(TypeExpr::Text, state)),
            Expression::Boolean(_) => Ok(CheckedType::new(TypeExpr::Boolean, state)),
            Expression::Temporal(t) => Ok(CheckedType::new(TypeExpr::Temporal(t.kind()), state)),
            Expression::TypeLiteral(syntax) => {
                let options = self.ctx.options;
                match syntax.resolve(
                    &options.unit_catalogue,
                    &options.type_catalogue,
                    &BTreeMap::new(),
                ) {
                    Ok(described) => Ok(CheckedType::new(
                        TypeExpr::Tagged {
                            name: TYPE_TYPE.to_string(),
                            params: vec![described],
                        },
                        state,
                    )),
                    Err(e) => Err(self.report(expr, e.to_string(), Vec::new())),
                }
            }

            // === Names ===
            Expression::Identifier(name) => self.check_identifier(expr, name, state, mode),
            Expression::EntireColumn { table, column } => {
                let columns = self.ctx.columns;
                match columns.lookup_column(table.as_ref(), column) {
                    Some(found) => Ok(CheckedType::new(
                        TypeExpr::Array(Box::new(TypeExpr::from_data_type(
                            found.column.data_type(),
                        ))),
                        state,
                    )),
                    None => {
                        let message = match table {
                            Some(t) if columns.lookup_table(Some(t)).is_none() => {
                                format!("Unknown table: {}", t)
                            }
                            Some(t) => format!("Unknown column: {}.{}", t, column),
                            None => format!("Unknown column: {}", column),
                        };
                        Err(self.report(expr, message, Vec::new()))
                    }
                }
            }
            Expression::MatchAnything => match mode {
                CheckMode::Pattern => Ok(CheckedType::new(self.unifier.fresh(), state)),
                CheckMode::Expression => Err(self.report(
                    expr,
                    "_ is not valid outside a pattern".to_string(),
                    Vec::new(),
                )),
            },

            // === Total operators ===
            Expression::Negate(inner) => {
                let number = self.unifier.fresh_number();
                let checked = self.check(inner, state, CheckMode::Expression)?;
                self.unify_at(inner, &number, &checked.ty)?;
                Ok(CheckedType::new(number, state))
            }
            Expression::AddSubtract {
                operands,
                operators,
            } => self.check_add_subtract(expr, operands, operators, state),
            Expression::Times(items) => {
                let mut product = UnitTerm::scalar();
                for item in items {
                    let unit = self.unifier.fresh_unit();
                    let checked = self.check(item, state, CheckMode::Expression)?;
                    self.unify_at(item, &TypeExpr::Number(unit.clone()), &checked.ty)?;
                    product = self.exact_unit(expr, product.checked_multiply(&unit))?;
                }
                Ok(CheckedType::new(TypeExpr::Number(product), state))
            }
            Expression::Divide {
                numerator,
                denominator,
            } => {
                let top = self.unifier.fresh_unit();
                let bottom = self.unifier.fresh_unit();
                let n = self.check(numerator, state, CheckMode::Expression)?;
                self.unify_at(numerator, &TypeExpr::Number(top.clone()), &n.ty)?;
                let d = self.check(denominator, state, CheckMode::Expression)?;
                self.unify_at(denominator, &TypeExpr::Number(bottom.clone()), &d.ty)?;
                let quotient = self.exact_unit(expr, top.checked_divide(&bottom))?;
                Ok(CheckedType::new(TypeExpr::Number(quotient), state))
            }
            Expression::Raise { base, exponent } => self.check_raise(expr, base, exponent, state),
            Expression::Concat(items) => {
                for item in items {
                    let checked = self.check(item, state, CheckMode::Expression)?;
                    self.unify_at(item, &TypeExpr::Text, &checked.ty)?;
                }
                Ok(CheckedType::new(TypeExpr::Text, state))
            }
            Expression::NotEqual { left, right } => {
                let l = self.check(left, state, CheckMode::Expression)?;
                let r = self.check(right, state, CheckMode::Expression)?;
                self.unify_at(right, &l.ty, &r.ty)?;
                self.unifier.require(l.ty, TypeClass::Equatable, expr);
                Ok(CheckedType::new(TypeExpr::Boolean, state))
            }

            // === Short-circuiting operators ===
            Expression::Comparison { operands, .. } => {
                let shared = self.unifier.fresh();
                for operand in operands {
                    let checked = self.check(operand, state, CheckMode::Expression)?;
                    self.unify_or_fix(operand, &shared, &checked.ty, |checker, mismatch| {
                        checker.corrected_literal(operand, mismatch)
                    })?;
                }
                self.unifier.require(shared, TypeClass::Comparable, expr);
                Ok(CheckedType::new(TypeExpr::Boolean, state))
            }
            Expression::Equal {
                operands,
                last_is_pattern,
            } => {
                let shared = self.unifier.fresh();
                let mut post = state.clone();
                let last = operands.len().saturating_sub(1);
                for (i, operand) in operands.iter().enumerate() {
                    let mode = if *last_is_pattern && i == last {
                        CheckMode::Pattern
                    } else {
                        CheckMode::Expression
                    };
                    let checked = self.check(operand, state, mode)?;
                    self.unify_at(operand, &shared, &checked.ty)?;
                    if mode == CheckMode::Pattern {
                        post = checked.state;
                    }
                }
                self.unifier.require(shared, TypeClass::Equatable, expr);
                Ok(CheckedType::new(TypeExpr::Boolean, &post))
            }
            Expression::And(items) => {
                let mut current = state.clone();
                for item in items {
                    let checked = self.check(item, &current, CheckMode::Expression)?;
                    self.unify_at(item, &TypeExpr::Boolean, &checked.ty)?;
                    current = checked.state;
                }
                Ok(CheckedType::new(TypeExpr::Boolean, &current))
            }
            Expression::Or(items) => {
                for item in items {
                    let checked = self.check(item, state, CheckMode::Expression)?;
                    self.unify_at(item, &TypeExpr::Boolean, &checked.ty)?;
                }
                Ok(CheckedType::new(TypeExpr::Boolean, state))
            }

            // === Control flow ===
            Expression::IfThenElse {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.check(condition, state, CheckMode::Expression)?;
                self.unify_at(condition, &TypeExpr::Boolean, &cond.ty)?;
                let then_checked = self.check(then_branch, &cond.state, CheckMode::Expression)?;
                let else_checked = self.check(else_branch, state, CheckMode::Expression)?;
                self.unify_at(else_branch, &then_checked.ty, &else_checked.ty)?;
                Ok(CheckedType::new(then_checked.ty, state))
            }
            Expression::Match { subject, clauses } => {
                let subject_checked = self.check(subject, state, CheckMode::Expression)?;
                let result = self.unifier.fresh();
                for clause in clauses {
                    let clause_state =
                        self.check_clause_patterns(&clause.patterns, &subject_checked.ty, state)?;
                    let outcome = self.check(&clause.outcome, &clause_state, CheckMode::Expression)?;
                    self.unify_at(&clause.outcome, &result, &outcome.ty)?;
                }
                Ok(CheckedType::new(result, state))
            }
            Expression::Define { definitions, body } => {
                let mut current = state.clone();
                for definition in definitions {
                    let value = self.check(&definition.value, &current, CheckMode::Expression)?;
                    let pattern = self.check(&definition.pattern, &current, CheckMode::Pattern)?;
                    self.unify_at(&definition.pattern, &value.ty, &pattern.ty)?;
                    current = pattern.state;
                }
                let body_checked = self.check(body, &current, CheckMode::Expression)?;
                Ok(CheckedType::new(body_checked.ty, state))
            }

            // === Compound values ===
            Expression::Record(fields) => {
                let mut seen = BTreeSet::new();
                let mut types = BTreeMap::new();
                let mut current = state.clone();
                for (name, value) in fields {
                    if !seen.insert(name.as_str()) {
                        return Err(self.report(expr, format!("Duplicate field: {}", name), Vec::new()));
                    }
                    let checked = self.check(value, &current, mode)?;
                    types.insert(name.clone(), checked.ty);
                    current = checked.state;
                }
                Ok(CheckedType::new(
                    TypeExpr::Record {
                        fields: types,
                        complete: mode == CheckMode::Expression,
                    },
                    &current,
                ))
            }
            Expression::FieldAccess { record, field } => {
                let field_type = self.unifier.fresh();
                let checked = self.check(record, state, CheckMode::Expression)?;
                let mut wanted = BTreeMap::new();
                wanted.insert(field.clone(), field_type.clone());
                let partial = TypeExpr::Record {
                    fields: wanted,
                    complete: false,
                };
                self.unify_at(record, &partial, &checked.ty)?;
                Ok(CheckedType::new(field_type, state))
            }
            Expression::Array(items) => {
                let element = self.unifier.fresh();
                let mut current = state.clone();
                for item in items {
                    // Patterns bind element by element; values share the state
                    let incoming = if mode == CheckMode::Pattern { &current } else { state };
                    let checked = self.check(item, incoming, mode)?;
                    self.unify_at(item, &element, &checked.ty)?;
                    if mode == CheckMode::Pattern {
                        current = checked.state;
                    }
                }
                Ok(CheckedType::new(TypeExpr::Array(Box::new(element)), &current))
            }
            Expression::Call { function, args } => match mode {
                CheckMode::Pattern => self.check_tag_pattern(expr, function, args, state),
                CheckMode::Expression => self.check_call(expr, function, args, state),
            },
        }
    }

    /// Nodes with their own pattern semantics; anything else in a pattern
    /// is evaluated and compared
    fn is_pattern_form(&self, expr: &Expression) -> bool {
        match expr {
            Expression::Identifier(_)
            | Expression::MatchAnything
            | Expression::Record(_)
            | Expression::Array(_) => true,
            Expression::Call { function, .. } => matches!(
                function.as_ref(),
                Expression::Identifier(name) if self.ctx.options.type_catalogue.tag(name).is_some()
            ),
            _ => false,
        }
    }

    // === Names ===

    fn check_identifier(
        &mut self,
        expr: &Expression,
        name: &str,
        state: &TypeState,
        mode: CheckMode,
    ) -> CheckResult<CheckedType> {
        let ctx = self.ctx;

        let existing = if let Some(ty) = state.get(name) {
            Some(ty.clone())
        } else if let Some((definition, index)) = ctx.options.type_catalogue.tag(name) {
            let (tagged, bindings) = definition.instantiate(&mut self.unifier);
            let inner = definition.inner_type(
                index,
                &bindings,
                &ctx.options.unit_catalogue,
                &ctx.options.type_catalogue,
            );
            return match (inner, mode) {
                (Ok(None), _) => Ok(CheckedType::new(tagged, state)),
                (Ok(Some(_)), CheckMode::Pattern) => Err(self.report(
                    expr,
                    format!("Tag {} carries a value; match it with {}(_)", name, name),
                    vec![QuickFix::new(
                        format!("Change to {}(_)", name),
                        Expression::call(expr.clone(), vec![Expression::MatchAnything]),
                    )],
                )),
                (Ok(Some(inner)), CheckMode::Expression) => Ok(CheckedType::new(
                    TypeExpr::Function {
                        args: vec![inner],
                        result: Box::new(tagged),
                    },
                    state,
                )),
                (Err(e), _) => Err(self.report(expr, e.to_string(), Vec::new())),
            };
        } else if let Some(found) = ctx.columns.lookup_column(None, name) {
            if ctx.options.location == LocationInfo::TableLevel {
                let replacement = Expression::EntireColumn {
                    table: None,
                    column: name.to_string(),
                };
                return Err(self.report(
                    expr,
                    format!(
                        "Column {} has no single value here; use {} for the whole column",
                        name, replacement
                    ),
                    vec![QuickFix::new(format!("Change to {}", replacement), replacement)],
                ));
            }
            Some(TypeExpr::from_data_type(found.column.data_type()))
        } else if let Some(definition) = ctx.functions.lookup_function(name) {
            let signature = definition.instantiate(&mut self.unifier);
            for (ty, class) in &signature.requirements {
                self.unifier.require(ty.clone(), *class, expr);
            }
            Some(signature.function_type())
        } else {
            None
        };

        match (existing, mode) {
            (Some(ty), CheckMode::Expression) => Ok(CheckedType::new(ty, state)),
            (Some(ty), CheckMode::Pattern) => {
                self.unifier.require(ty.clone(), TypeClass::Equatable, expr);
                Ok(CheckedType::new(ty, state))
            }
            (None, CheckMode::Pattern) => {
                let ty = self.unifier.fresh();
                let extended = state.add(name, ty.clone()).ok_or_else(|| {
                    InternalError::new(format!("pattern rebinds existing name {}", name))
                })?;
                Ok(CheckedType {
                    ty,
                    state: extended,
                })
            }
            (None, CheckMode::Expression) => {
                let fixes = self.name_suggestions(name);
                Err(self.report(expr, format!("Unknown name: {}", name), fixes))
            }
        }
    }

    /// Case-insensitive matches among visible columns and functions
    fn name_suggestions(&self, name: &str) -> Vec<QuickFix> {
        let mut fixes: Vec<QuickFix> = self
            .ctx
            .columns
            .available_column_references()
            .into_iter()
            .filter(|r| r.column.eq_ignore_ascii_case(name))
            .map(|r| {
                let replacement = match r.table {
                    None => Expression::Identifier(r.column),
                    table => Expression::EntireColumn {
                        table,
                        column: r.column,
                    },
                };
                QuickFix::new(format!("Change to {}", replacement), replacement)
            })
            .collect();
        fixes.extend(
            self.ctx
                .functions
                .definitions()
                .into_iter()
                .filter(|d| d.name.eq_ignore_ascii_case(name))
                .map(|d| QuickFix::new(format!("Change to {}", d.name), Expression::ident(d.name))),
        );
        fixes
    }

    // === Operators ===

    fn check_add_subtract(
        &mut self,
        expr: &Expression,
        operands: &[Expression],
        operators: &[AddSubtractOp],
        state: &TypeState,
    ) -> CheckResult<CheckedType> {
        let number = self.unifier.fresh_number();
        let mut types = Vec::with_capacity(operands.len());
        for operand in operands {
            types.push(self.check(operand, state, CheckMode::Expression)?.ty);
        }

        for (operand, ty) in operands.iter().zip(&types) {
            match self.unifier.unify(&number, ty) {
                Ok(()) => {}
                Err(UnifyError::Mismatch(mismatch)) => {
                    let message = self.mismatch_message(&mismatch);
                    let whole = self.whole_expression_fixes(operands, operators, &types);
                    if whole.is_empty() {
                        let fixes = self.corrected_literal(operand, &mismatch);
                        return Err(self.report(operand, message, fixes));
                    }
                    return Err(self.report(expr, message, whole));
                }
                Err(other) => return Err(self.unify_failure(operand, other)),
            }
        }
        Ok(CheckedType::new(number, state))
    }

    /// Replacements for a two-operand `+`/`-` that was probably meant as
    /// something else: text joining or a date difference
    fn whole_expression_fixes(
        &mut self,
        operands: &[Expression],
        operators: &[AddSubtractOp],
        types: &[TypeExpr],
    ) -> Vec<QuickFix> {
        let ([left, right], [op], [left_ty, right_ty]) = (operands, operators, types) else {
            return Vec::new();
        };
        let left_ty = self.unifier.prune(left_ty);
        let right_ty = self.unifier.prune(right_ty);

        match (op, &left_ty, &right_ty) {
            (AddSubtractOp::Add, TypeExpr::Text, _) | (AddSubtractOp::Add, _, TypeExpr::Text) => {
                let replacement = Expression::Concat(vec![left.clone(), right.clone()]);
                vec![QuickFix::new("Join text with ;", replacement)]
            }
            (AddSubtractOp::Subtract, TypeExpr::Temporal(a), TypeExpr::Temporal(b)) if a == b => {
                let function = match a {
                    TemporalKind::Date => "days_between",
                    TemporalKind::DateTime => "seconds_between",
                    TemporalKind::Time => return Vec::new(),
                };
                let replacement = Expression::call(
                    Expression::ident(function),
                    vec![left.clone(), right.clone()],
                );
                vec![QuickFix::new(format!("Use {}", function), replacement)]
            }
            _ => Vec::new(),
        }
    }

    /// `^` is overloaded on its exponent: a constant exponent keeps the
    /// base's unit (raised or rooted), anything else needs unit-less operands
    fn check_raise(
        &mut self,
        expr: &Expression,
        base: &Expression,
        exponent: &Expression,
        state: &TypeState,
    ) -> CheckResult<CheckedType> {
        let base_checked = self.check(base, state, CheckMode::Expression)?;
        let exponent_checked = self.check(exponent, state, CheckMode::Expression)?;
        self.unify_at(exponent, &TypeExpr::number(), &exponent_checked.ty)?;

        match exponent.constant_fold() {
            Some(p) if keeps_unit(p) => {
                let unit = self.unifier.fresh_unit();
                self.unify_at(base, &TypeExpr::Number(unit.clone()), &base_checked.ty)?;
                // Raise the base's unit as solved so far; an exponent that
                // does not fit is reported here rather than when resolving
                let raised = self
                    .unifier
                    .prune_unit(&unit)
                    .ok()
                    .and_then(|solved| solved.checked_raise(p));
                let result = self.exact_unit(expr, raised)?;
                Ok(CheckedType::new(TypeExpr::Number(result), state))
            }
            _ => {
                self.unify_at(base, &TypeExpr::number(), &base_checked.ty)?;
                Ok(CheckedType::new(TypeExpr::number(), state))
            }
        }
    }

    // === Calls ===

    fn check_call(
        &mut self,
        expr: &Expression,
        function: &Expression,
        args: &[Expression],
        state: &TypeState,
    ) -> CheckResult<CheckedType> {
        let callee = self.check(function, state, CheckMode::Expression)?;
        let mut arg_types = Vec::with_capacity(args.len());
        for arg in args {
            arg_types.push(self.check(arg, state, CheckMode::Expression)?.ty);
        }

        match self.unifier.prune(&callee.ty) {
            TypeExpr::Function {
                args: params,
                result,
            } => {
                if params.len() != args.len() {
                    return Err(self.report(
                        expr,
                        format!(
                            "{} expects {} argument{}, got {}",
                            function,
                            params.len(),
                            if params.len() == 1 { "" } else { "s" },
                            args.len()
                        ),
                        Vec::new(),
                    ));
                }
                for ((arg, param), arg_ty) in args.iter().zip(&params).zip(&arg_types) {
                    self.unify_at(arg, param, arg_ty)?;
                }
                Ok(CheckedType::new(*result, state))
            }
            TypeExpr::Var(_) => {
                let result = self.unifier.fresh();
                let wanted = TypeExpr::Function {
                    args: arg_types,
                    result: Box::new(result.clone()),
                };
                self.unify_at(function, &wanted, &callee.ty)?;
                Ok(CheckedType::new(result, state))
            }
            other => {
                let shown = self.unifier.display(&other);
                Err(self.report(
                    function,
                    format!("Cannot call a value of type {}", shown),
                    Vec::new(),
                ))
            }
        }
    }

    /// `Tag(pattern)` in a pattern: decompose the candidate's inner value
    fn check_tag_pattern(
        &mut self,
        expr: &Expression,
        function: &Expression,
        args: &[Expression],
        state: &TypeState,
    ) -> CheckResult<CheckedType> {
        let options = self.ctx.options;
        let Expression::Identifier(name) = function else {
            return Err(InternalError::new(format!("not a tag pattern: {}", expr)).into());
        };
        let Some((definition, index)) = options.type_catalogue.tag(name) else {
            return Err(InternalError::new(format!("unknown tag in pattern: {}", name)).into());
        };

        let (tagged, bindings) = definition.instantiate(&mut self.unifier);
        let inner = match definition.inner_type(
            index,
            &bindings,
            &options.unit_catalogue,
            &options.type_catalogue,
        ) {
            Ok(Some(inner)) => inner,
            Ok(None) => {
                return Err(self.report(
                    expr,
                    format!("Tag {} has no inner value", name),
                    vec![QuickFix::new(format!("Change to {}", name), function.clone())],
                ))
            }
            Err(e) => return Err(self.report(expr, e.to_string(), Vec::new())),
        };

        let [arg] = args else {
            return Err(self.report(
                expr,
                format!("Tag {} takes exactly one pattern, got {}", name, args.len()),
                Vec::new(),
            ));
        };
        let checked = self.check(arg, state, CheckMode::Pattern)?;
        self.unify_at(arg, &inner, &checked.ty)?;
        Ok(CheckedType {
            ty: tagged,
            state: checked.state,
        })
    }

    // === Match ===

    /// Check a clause's alternatives against the subject type; returns the
    /// state the outcome is checked in
    fn check_clause_patterns(
        &mut self,
        patterns: &[ClausePattern],
        subject: &TypeExpr,
        state: &TypeState,
    ) -> CheckResult<TypeState> {
        let mut first: Option<(BTreeSet<String>, TypeState)> = None;

        for alternative in patterns {
            let checked = self.check(&alternative.pattern, state, CheckMode::Pattern)?;
            self.unify_at(&alternative.pattern, subject, &checked.ty)?;

            if let Some(guard) = &alternative.guard {
                let guard_checked = self.check(guard, &checked.state, CheckMode::Expression)?;
                self.unify_at(guard, &TypeExpr::Boolean, &guard_checked.ty)?;
            }

            let bound = checked.state.bound_since(state);
            match &first {
                None => first = Some((bound, checked.state)),
                Some((names, first_state)) => {
                    if &bound != names {
                        let message = format!(
                            "Every alternative of a case must bind the same names ({})",
                            names.iter().cloned().collect::<Vec<_>>().join(", ")
                        );
                        return Err(self.report(&alternative.pattern, message, Vec::new()));
                    }
                    for name in names {
                        if let (Some(a), Some(b)) = (first_state.get(name), checked.state.get(name)) {
                            let (a, b) = (a.clone(), b.clone());
                            self.unify_at(&alternative.pattern, &a, &b)?;
                        }
                    }
                }
            }
        }

        first
            .map(|(_, s)| s)
            .ok_or_else(|| InternalError::new("case with no patterns").into())
    }
}

/// Replace every use of unit name `from` with `to`
/// Constant exponents that raise or root the base's unit: 1, whole numbers
/// above 1, and reciprocals `1/n`
fn keeps_unit(power: Rational) -> bool {
    power == Rational::ONE
        || (power.numerator() == 1 && power.denominator() > 1)
        || (power.denominator() == 1 && power.numerator() > 1)
}

fn rename_unit(unit: &UnitExpression, from: &str, to: &str) -> UnitExpression {
    match unit {
        UnitExpression::Named(name) if name == from => UnitExpression::Named(to.to_string()),
        UnitExpression::Scalar | UnitExpression::Named(_) => unit.clone(),
        UnitExpression::Times(items) => {
            UnitExpression::Times(items.iter().map(|u| rename_unit(u, from, to)).collect())
        }
        UnitExpression::Divide(top, bottom) => UnitExpression::Divide(
            Box::new(rename_unit(top, from, to)),
            Box::new(rename_unit(bottom, from, to)),
        ),
        UnitExpression::Raise(base, power) => {
            UnitExpression::Raise(Box::new(rename_unit(base, from, to)), *power)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CheckOptions;
    use crate::lookup::StoreLookup;
    use crate::parser::parse_expression;
    use crate::recorder::CollectingRecorder;
    use gridtype_core::{Column, DataType, Table, TableId, TableStore, Unit, Value};
    use pretty_assertions::assert_eq;

    fn check_with(options: &CheckOptions, columns: Option<&StoreLookup<'_>>, text: &str) -> (Result<String, CheckError>, CollectingRecorder) {
        let expr = parse_expression(text).unwrap();
        let mut errors = CollectingRecorder::new();
        let mut ctx = CheckContext::standalone(options);
        if let Some(columns) = columns {
            ctx = ctx.with_columns(columns);
        }
        let result = check_expression(&expr, &ctx, &mut errors).map(|t| t.to_string());
        (result, errors)
    }

    fn check(text: &str) -> (Result<String, CheckError>, CollectingRecorder) {
        check_with(&CheckOptions::default(), None, text)
    }

    fn type_of(text: &str) -> String {
        let (result, errors) = check(text);
        match result {
            Ok(ty) => ty,
            Err(e) => panic!("{} failed: {:?} {:?}", text, e, errors.errors()),
        }
    }

    fn first_error(text: &str) -> String {
        let (result, errors) = check(text);
        assert_eq!(result, Err(CheckError::Reported), "{}", text);
        errors.errors()[0].message.clone()
    }

    fn runs() -> TableStore {
        let mut store = TableStore::new();
        let table = Table::new(TableId::new("Runs"), 1)
            .with_column(Column::new(
                "distance",
                DataType::number_in(Unit::named("m")),
                vec![Value::int(400)],
            ))
            .unwrap();
        store.add_table(table).unwrap();
        store
    }

    #[test]
    fn test_literals() {
        assert_eq!(type_of("1"), "Number");
        assert_eq!(type_of("2{m/s}"), "Number{m/s}");
        assert_eq!(type_of("\"a\" ; \"b\""), "Text");
        assert_eq!(type_of("date{2024-01-31}"), "Date");
        assert_eq!(type_of("type{Number{kg}}"), "Type(Number{kg})");
    }

    #[test]
    fn test_unit_arithmetic() {
        assert_eq!(type_of("3{m} + 4{m} - 1{m}"), "Number{m}");
        assert_eq!(type_of("3{m} * 2{s}"), "Number{m*s}");
        assert_eq!(type_of("10{m} / 2{s}"), "Number{m/s}");
        assert_eq!(type_of("-(3{m})"), "Number{m}");
        assert!(first_error("3{m} + 2{s}").starts_with("Unit mismatch"));
    }

    #[test]
    fn test_unit_aliases_are_canonical() {
        assert_eq!(type_of("1{metre} + 1{m}"), "Number{m}");
    }

    #[test]
    fn test_raise_overload() {
        assert_eq!(type_of("5{m} ^ 2"), "Number{m^2}");
        assert_eq!(type_of("5{m} ^ 0.5"), "Number{m^(1/2)}");
        assert_eq!(type_of("5{m} ^ 1"), "Number{m}");
        assert_eq!(type_of("2 ^ (1 + 1)"), "Number");
        assert!(first_error("define y = 2 then 5{m} ^ y enddefine").starts_with("Unit mismatch"));
    }

    #[test]
    fn test_raise_with_extreme_exponents() {
        assert_eq!(type_of("2 ^ (1 ^ 100000000000000000)"), "Number");
        assert_eq!(type_of("2 ^ ((-1) ^ 100000000000000001)"), "Number");
        assert_eq!(type_of("2 ^ -(-9223372036854775808)"), "Number");
        assert_eq!(
            first_error("(5{m} ^ 1099511627776) ^ 1099511627776"),
            "Unit exponent out of range"
        );
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(type_of("1 < 2 <= 3"), "Boolean");
        assert_eq!(type_of("\"a\" = \"b\""), "Boolean");
        let (result, errors) = check("1{m} < 2{s}");
        assert_eq!(result, Err(CheckError::Reported));
        let fixes = &errors.errors()[0].fixes;
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes[0].replacement.to_string(), "2{m}");
    }

    #[test]
    fn test_functions_are_not_comparable() {
        assert!(first_error("abs < abs").contains("cannot be compared"));
    }

    #[test]
    fn test_conditional_bindings() {
        assert_eq!(
            type_of("if Some(3) =~ Some(n) then n + 1 else 0 endif"),
            "Number"
        );
        assert_eq!(first_error("if Some(3) =~ Some(n) then 0 else n endif"), "Unknown name: n");
        assert_eq!(type_of("if Some(1) =~ Some(n) & n > 0 then n else 0 endif"), "Number");
    }

    #[test]
    fn test_branch_mismatch_reported_at_else() {
        let (result, errors) = check("if true then 1 else \"x\" endif");
        assert_eq!(result, Err(CheckError::Reported));
        assert_eq!(errors.errors()[0].node, Expression::text("x"));
    }

    #[test]
    fn test_match() {
        assert_eq!(
            type_of("match Some(2{m}) case Some(x) given x > 1{m} then x case None then 0{m} endmatch"),
            "Number{m}"
        );
        assert!(first_error("match 1 case 1 orcase x then 0 endmatch").contains("same names"));
        assert!(first_error("match 1 case Some(n) then n endmatch").starts_with("Type mismatch"));
    }

    #[test]
    fn test_records() {
        assert_eq!(type_of("(b: 1, a: \"x\")"), "(a: Text, b: Number)");
        assert_eq!(type_of("(a: 1, b: 2)#b"), "Number");
        assert_eq!(first_error("(a: 1, a: 2)"), "Duplicate field: a");
        assert!(first_error("(a: 1)#b").starts_with("Record mismatch"));
        assert_eq!(
            type_of("define (a: x) = (a: 1, b: true) then x enddefine"),
            "Number"
        );
    }

    #[test]
    fn test_match_anything_outside_pattern() {
        assert_eq!(first_error("_ + 1"), "_ is not valid outside a pattern");
    }

    #[test]
    fn test_arrays_and_calls() {
        assert_eq!(type_of("[1{m}, 2{m}]"), "[Number{m}]");
        assert_eq!(type_of("sum([1{m}, 2{m}])"), "Number{m}");
        assert_eq!(type_of("element([\"a\"], 1)"), "Text");
        assert!(first_error("abs(1, 2)").contains("expects 1 argument"));
        assert!(first_error("1(2)").starts_with("Cannot call"));
    }

    #[test]
    fn test_tags() {
        assert_eq!(type_of("Some(\"x\")"), "Optional(Text)");
        assert_eq!(type_of("as_type(type{Optional(Number)}, None)"), "Optional(Number)");
        assert!(first_error("match Some(1) case Some then 1 endmatch").contains("carries a value"));
    }

    #[test]
    fn test_quick_fixes() {
        let (_, errors) = check("\"a\" + \"b\"");
        assert_eq!(errors.errors()[0].fixes[0].replacement.to_string(), "\"a\" ; \"b\"");

        let (_, errors) = check("date{2024-03-01} - date{2024-02-01}");
        assert_eq!(
            errors.errors()[0].fixes[0].replacement.to_string(),
            "days_between(date{2024-03-01}, date{2024-02-01})"
        );

        let (_, errors) = check("\"a\" + \"b\" + \"c\"");
        assert!(errors.errors()[0].fixes.is_empty());

        let (_, errors) = check("1{Metre}");
        assert_eq!(errors.errors()[0].message, "Unknown unit: Metre");
        let (_, errors) = check("1{M}");
        assert_eq!(errors.errors()[0].fixes[0].replacement.to_string(), "1{m}");
    }

    #[test]
    fn test_columns() {
        let store = runs();
        let table = TableId::new("Runs");
        let lookup = StoreLookup::new(&store, Some(&table));
        let options = CheckOptions::default();

        let (result, _) = check_with(&options, Some(&lookup), "distance * 2");
        assert_eq!(result.unwrap(), "Number{m}");
        let (result, _) = check_with(&options, Some(&lookup), "sum(@entire Runs.distance)");
        assert_eq!(result.unwrap(), "Number{m}");

        let (_, errors) = check_with(&options, Some(&lookup), "Distance");
        assert_eq!(errors.errors()[0].message, "Unknown name: Distance");
        assert_eq!(errors.errors()[0].fixes[0].replacement, Expression::ident("distance"));

        let table_level = CheckOptions {
            location: LocationInfo::TableLevel,
            ..CheckOptions::default()
        };
        let (result, errors) = check_with(&table_level, Some(&lookup), "distance");
        assert_eq!(result, Err(CheckError::Reported));
        assert_eq!(errors.errors()[0].fixes[0].replacement.to_string(), "@entire distance");

        let (_, errors) = check_with(&options, Some(&lookup), "@entire Walks.distance");
        assert_eq!(errors.errors()[0].message, "Unknown table: Walks");
    }

    #[test]
    fn test_each_error_recorded_once() {
        let (_, errors) = check("1 + (2 * \"x\")");
        assert_eq!(errors.errors().len(), 1);
    }
}
