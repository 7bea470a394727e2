//! Expression abstract syntax tree
//!
//! [`Expression`] is a closed sum type: every consumer (checker, evaluator,
//! pattern matcher, renderer) matches it exhaustively, so adding a variant
//! forces every dispatcher to handle it. Trees are immutable values;
//! [`Expression::replace_subexpression`] builds a new tree.

use crate::types::syntax::TypeSyntax;
use gridtype_core::{Decimal, Rational, TableId, TemporalValue, Unit};

/// Expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    // === Literals ===
    /// Number literal with an optional unit (`Scalar` when absent)
    Number { value: Decimal, unit: UnitExpression },
    /// Text literal
    Text(String),
    /// Boolean literal
    Boolean(bool),
    /// Date / time literal
    Temporal(TemporalValue),
    /// Type literal, `type{...}`
    TypeLiteral(TypeSyntax),

    // === Names ===
    /// Variable, tag constructor, this-row column or standard function
    Identifier(String),
    /// Every value of a column, `@entire Table.column`
    EntireColumn { table: Option<TableId>, column: String },
    /// Pattern placeholder `_`
    MatchAnything,

    // === Total operators ===
    /// Unary minus
    Negate(Box<Expression>),
    /// `a + b - c ...`; `operators.len() == operands.len() - 1`
    AddSubtract {
        operands: Vec<Expression>,
        operators: Vec<AddSubtractOp>,
    },
    /// `a * b * c ...`
    Times(Vec<Expression>),
    /// `a / b`
    Divide {
        numerator: Box<Expression>,
        denominator: Box<Expression>,
    },
    /// `a ^ b`
    Raise {
        base: Box<Expression>,
        exponent: Box<Expression>,
    },
    /// Text concatenation `a ; b ; c ...`
    Concat(Vec<Expression>),
    /// `a <> b`
    NotEqual {
        left: Box<Expression>,
        right: Box<Expression>,
    },

    // === Short-circuiting operators ===
    /// Ordering chain `a < b <= c ...`; `operators.len() == operands.len() - 1`
    Comparison {
        operands: Vec<Expression>,
        operators: Vec<ComparisonOperator>,
    },
    /// Equality chain `a = b = c`; with `last_is_pattern` the final operand is
    /// a pattern (`a =~ pattern`)
    Equal {
        operands: Vec<Expression>,
        last_is_pattern: bool,
    },
    /// `a & b & c ...`
    And(Vec<Expression>),
    /// `a | b | c ...`
    Or(Vec<Expression>),

    // === Control flow ===
    /// `if c then a else b endif`
    IfThenElse {
        condition: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
    },
    /// `match s case p given g orcase q then o ... endmatch`
    Match {
        subject: Box<Expression>,
        clauses: Vec<MatchClause>,
    },
    /// `define p = e, ... then body enddefine`
    Define {
        definitions: Vec<Definition>,
        body: Box<Expression>,
    },

    // === Compound values ===
    /// Record `(a: e1, b: e2)`
    Record(Vec<(String, Expression)>),
    /// Field access `r#field`
    FieldAccess {
        record: Box<Expression>,
        field: String,
    },
    /// Array `[e1, e2]`
    Array(Vec<Expression>),
    /// Function or constructor application `f(a, b)`
    Call {
        function: Box<Expression>,
        args: Vec<Expression>,
    },
}

/// Operator between two operands of an add/subtract chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddSubtractOp {
    Add,
    Subtract,
}

impl AddSubtractOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AddSubtractOp::Add => "+",
            AddSubtractOp::Subtract => "-",
        }
    }
}

/// Ordering comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl ComparisonOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::LessEqual => "<=",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::GreaterEqual => ">=",
        }
    }

    /// Whether `ordering` (left compared to right) satisfies this operator
    pub fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            ComparisonOperator::LessThan => ordering == Less,
            ComparisonOperator::LessEqual => ordering != Greater,
            ComparisonOperator::GreaterThan => ordering == Greater,
            ComparisonOperator::GreaterEqual => ordering != Less,
        }
    }
}

/// One `case` of a match expression: alternatives sharing an outcome
#[derive(Debug, Clone, PartialEq)]
pub struct MatchClause {
    pub patterns: Vec<ClausePattern>,
    pub outcome: Expression,
}

/// A pattern with an optional `given` guard
#[derive(Debug, Clone, PartialEq)]
pub struct ClausePattern {
    pub pattern: Expression,
    pub guard: Option<Expression>,
}

/// A local definition `pattern = value`
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub pattern: Expression,
    pub value: Expression,
}

/// Unit syntax as written in a literal: `5{m/s^2}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitExpression {
    /// No unit, or `1`
    Scalar,
    /// A unit name or alias
    Named(String),
    /// Product `a*b`
    Times(Vec<UnitExpression>),
    /// Quotient `a/b`
    Divide(Box<UnitExpression>, Box<UnitExpression>),
    /// Power with a rational exponent `a^2`, `a^(1/2)`
    Raise(Box<UnitExpression>, Rational),
}

impl UnitExpression {
    /// Canonical syntax for a concrete unit
    pub fn from_unit(unit: &Unit) -> Self {
        let factor = |name: &str, power: Rational| {
            let named = UnitExpression::Named(name.to_string());
            if power == Rational::ONE {
                named
            } else {
                UnitExpression::Raise(Box::new(named), power)
            }
        };
        let positive: Vec<_> = unit
            .powers()
            .filter(|(_, p)| *p > Rational::ZERO)
            .map(|(n, p)| factor(n, p))
            .collect();
        let negative: Vec<_> = unit
            .powers()
            .filter(|(_, p)| *p < Rational::ZERO)
            .map(|(n, p)| factor(n, -p))
            .collect();

        let mut result = match positive.len() {
            0 if negative.is_empty() => return UnitExpression::Scalar,
            0 => UnitExpression::Scalar,
            1 => positive.into_iter().next().unwrap_or(UnitExpression::Scalar),
            _ => UnitExpression::Times(positive),
        };
        for divisor in negative {
            result = UnitExpression::Divide(Box::new(result), Box::new(divisor));
        }
        result
    }

    /// Check if this is the scalar unit
    pub fn is_scalar(&self) -> bool {
        matches!(self, UnitExpression::Scalar)
    }
}

impl Expression {
    // === Construction helpers ===

    /// Unitless number literal
    pub fn number(n: i64) -> Self {
        Expression::Number {
            value: Decimal::from(n),
            unit: UnitExpression::Scalar,
        }
    }

    /// Number literal with a single named unit
    pub fn number_in(value: Decimal, unit: &str) -> Self {
        Expression::Number {
            value,
            unit: UnitExpression::Named(unit.to_string()),
        }
    }

    /// Text literal
    pub fn text<S: Into<String>>(s: S) -> Self {
        Expression::Text(s.into())
    }

    /// Identifier
    pub fn ident<S: Into<String>>(name: S) -> Self {
        Expression::Identifier(name.into())
    }

    /// Two-operand addition
    pub fn add(left: Expression, right: Expression) -> Self {
        Expression::AddSubtract {
            operands: vec![left, right],
            operators: vec![AddSubtractOp::Add],
        }
    }

    /// Two-operand subtraction
    pub fn subtract(left: Expression, right: Expression) -> Self {
        Expression::AddSubtract {
            operands: vec![left, right],
            operators: vec![AddSubtractOp::Subtract],
        }
    }

    /// Function or constructor call
    pub fn call(function: Expression, args: Vec<Expression>) -> Self {
        Expression::Call {
            function: Box::new(function),
            args,
        }
    }

    /// Whether this node renders as an operator and needs brackets when nested
    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            Expression::Negate(_)
                | Expression::AddSubtract { .. }
                | Expression::Times(_)
                | Expression::Divide { .. }
                | Expression::Raise { .. }
                | Expression::Concat(_)
                | Expression::NotEqual { .. }
                | Expression::Comparison { .. }
                | Expression::Equal { .. }
                | Expression::And(_)
                | Expression::Or(_)
        )
    }

    /// Direct children, in evaluation order
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Number { .. }
            | Expression::Text(_)
            | Expression::Boolean(_)
            | Expression::Temporal(_)
            | Expression::TypeLiteral(_)
            | Expression::Identifier(_)
            | Expression::EntireColumn { .. }
            | Expression::MatchAnything => Vec::new(),
            Expression::Negate(inner) => vec![inner],
            Expression::AddSubtract { operands, .. }
            | Expression::Comparison { operands, .. }
            | Expression::Equal { operands, .. } => operands.iter().collect(),
            Expression::Times(items)
            | Expression::Concat(items)
            | Expression::And(items)
            | Expression::Or(items)
            | Expression::Array(items) => items.iter().collect(),
            Expression::Divide {
                numerator,
                denominator,
            } => vec![numerator, denominator],
            Expression::Raise { base, exponent } => vec![base, exponent],
            Expression::NotEqual { left, right } => vec![left, right],
            Expression::IfThenElse {
                condition,
                then_branch,
                else_branch,
            } => vec![condition, then_branch, else_branch],
            Expression::Match { subject, clauses } => {
                let mut all: Vec<&Expression> = vec![subject];
                for clause in clauses {
                    for p in &clause.patterns {
                        all.push(&p.pattern);
                        all.extend(p.guard.as_ref());
                    }
                    all.push(&clause.outcome);
                }
                all
            }
            Expression::Define { definitions, body } => {
                let mut all: Vec<&Expression> = Vec::new();
                for d in definitions {
                    all.push(&d.pattern);
                    all.push(&d.value);
                }
                all.push(body);
                all
            }
            Expression::Record(fields) => fields.iter().map(|(_, e)| e).collect(),
            Expression::FieldAccess { record, .. } => vec![record],
            Expression::Call { function, args } => {
                let mut all: Vec<&Expression> = vec![function];
                all.extend(args.iter());
                all
            }
        }
    }

    /// Rebuild this node with every direct child passed through `f`
    pub fn map_children(&self, f: &mut dyn FnMut(&Expression) -> Expression) -> Expression {
        let boxed = |e: &Expression, f: &mut dyn FnMut(&Expression) -> Expression| Box::new(f(e));
        match self {
            Expression::Number { .. }
            | Expression::Text(_)
            | Expression::Boolean(_)
            | Expression::Temporal(_)
            | Expression::TypeLiteral(_)
            | Expression::Identifier(_)
            | Expression::EntireColumn { .. }
            | Expression::MatchAnything => self.clone(),
            Expression::Negate(inner) => Expression::Negate(boxed(inner, f)),
            Expression::AddSubtract {
                operands,
                operators,
            } => Expression::AddSubtract {
                operands: operands.iter().map(|e| f(e)).collect(),
                operators: operators.clone(),
            },
            Expression::Times(items) => Expression::Times(items.iter().map(|e| f(e)).collect()),
            Expression::Concat(items) => Expression::Concat(items.iter().map(|e| f(e)).collect()),
            Expression::And(items) => Expression::And(items.iter().map(|e| f(e)).collect()),
            Expression::Or(items) => Expression::Or(items.iter().map(|e| f(e)).collect()),
            Expression::Array(items) => Expression::Array(items.iter().map(|e| f(e)).collect()),
            Expression::Divide {
                numerator,
                denominator,
            } => Expression::Divide {
                numerator: boxed(numerator, f),
                denominator: boxed(denominator, f),
            },
            Expression::Raise { base, exponent } => Expression::Raise {
                base: boxed(base, f),
                exponent: boxed(exponent, f),
            },
            Expression::NotEqual { left, right } => Expression::NotEqual {
                left: boxed(left, f),
                right: boxed(right, f),
            },
            Expression::Comparison {
                operands,
                operators,
            } => Expression::Comparison {
                operands: operands.iter().map(|e| f(e)).collect(),
                operators: operators.clone(),
            },
            Expression::Equal {
                operands,
                last_is_pattern,
            } => Expression::Equal {
                operands: operands.iter().map(|e| f(e)).collect(),
                last_is_pattern: *last_is_pattern,
            },
            Expression::IfThenElse {
                condition,
                then_branch,
                else_branch,
            } => Expression::IfThenElse {
                condition: boxed(condition, f),
                then_branch: boxed(then_branch, f),
                else_branch: boxed(else_branch, f),
            },
            Expression::Match { subject, clauses } => Expression::Match {
                subject: boxed(subject, f),
                clauses: clauses
                    .iter()
                    .map(|clause| MatchClause {
                        patterns: clause
                            .patterns
                            .iter()
                            .map(|p| ClausePattern {
                                pattern: f(&p.pattern),
                                guard: p.guard.as_ref().map(|g| f(g)),
                            })
                            .collect(),
                        outcome: f(&clause.outcome),
                    })
                    .collect(),
            },
            Expression::Define { definitions, body } => Expression::Define {
                definitions: definitions
                    .iter()
                    .map(|d| Definition {
                        pattern: f(&d.pattern),
                        value: f(&d.value),
                    })
                    .collect(),
                body: boxed(body, f),
            },
            Expression::Record(fields) => Expression::Record(
                fields.iter().map(|(name, e)| (name.clone(), f(e))).collect(),
            ),
            Expression::FieldAccess { record, field } => Expression::FieldAccess {
                record: boxed(record, f),
                field: field.clone(),
            },
            Expression::Call { function, args } => Expression::Call {
                function: boxed(function, f),
                args: args.iter().map(|e| f(e)).collect(),
            },
        }
    }

    /// Replace every subtree equal to `target` with `replacement`.
    ///
    /// Returns a new tree; `self` is untouched.
    pub fn replace_subexpression(&self, target: &Expression, replacement: &Expression) -> Expression {
        if self == target {
            return replacement.clone();
        }
        self.map_children(&mut |child| child.replace_subexpression(target, replacement))
    }

    /// Best-effort exact folding of pure numeric arithmetic.
    ///
    /// Returns `None` when any operand is not a literal (or folding would
    /// overflow). Units on literals are ignored; the checker uses this only
    /// to read exponents, which are unitless.
    pub fn constant_fold(&self) -> Option<Rational> {
        match self {
            Expression::Number { value, .. } => Rational::from_decimal(*value),
            Expression::Negate(inner) => inner.constant_fold()?.checked_neg(),
            Expression::AddSubtract {
                operands,
                operators,
            } => {
                let (first, rest) = operands.split_first()?;
                let mut total = first.constant_fold()?;
                for (op, operand) in operators.iter().zip(rest) {
                    let value = operand.constant_fold()?;
                    total = match op {
                        AddSubtractOp::Add => total.checked_add(value)?,
                        AddSubtractOp::Subtract => total.checked_sub(value)?,
                    };
                }
                Some(total)
            }
            Expression::Times(items) => items
                .iter()
                .try_fold(Rational::ONE, |acc, e| acc.checked_mul(e.constant_fold()?)),
            Expression::Divide {
                numerator,
                denominator,
            } => numerator
                .constant_fold()?
                .checked_div(denominator.constant_fold()?),
            Expression::Raise { base, exponent } => {
                let exponent = exponent.constant_fold()?;
                if !exponent.is_integer() {
                    return None;
                }
                base.constant_fold()?.checked_pow(exponent.numerator())
            }
            Expression::Text(_)
            | Expression::Boolean(_)
            | Expression::Temporal(_)
            | Expression::TypeLiteral(_)
            | Expression::Identifier(_)
            | Expression::EntireColumn { .. }
            | Expression::MatchAnything
            | Expression::Concat(_)
            | Expression::NotEqual { .. }
            | Expression::Comparison { .. }
            | Expression::Equal { .. }
            | Expression::And(_)
            | Expression::Or(_)
            | Expression::IfThenElse { .. }
            | Expression::Match { .. }
            | Expression::Define { .. }
            | Expression::Record(_)
            | Expression::FieldAccess { .. }
            | Expression::Array(_)
            | Expression::Call { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn test_fold_add_subtract() {
        // 1 + 2 - 3
        let expr = Expression::AddSubtract {
            operands: vec![Expression::number(1), Expression::number(2), Expression::number(3)],
            operators: vec![AddSubtractOp::Add, AddSubtractOp::Subtract],
        };
        assert_eq!(expr.constant_fold(), Some(Rational::ZERO));
    }

    #[test]
    fn test_fold_unit_bases_with_huge_exponents() {
        let one = Expression::Raise {
            base: Box::new(Expression::number(1)),
            exponent: Box::new(Expression::number(100_000_000_000_000_000)),
        };
        assert_eq!(one.constant_fold(), Some(Rational::ONE));

        let minus_one = Expression::Raise {
            base: Box::new(Expression::Negate(Box::new(Expression::number(1)))),
            exponent: Box::new(Expression::number(100_000_000_000_000_001)),
        };
        assert_eq!(minus_one.constant_fold(), Some(Rational::integer(-1)));

        let two = Expression::Raise {
            base: Box::new(Expression::number(2)),
            exponent: Box::new(Expression::number(100_000_000_000_000_000)),
        };
        assert_eq!(two.constant_fold(), None);
    }

    #[test]
    fn test_fold_most_negative_literal() {
        let lowest = Expression::Number {
            value: Decimal::from(i64::MIN),
            unit: UnitExpression::Scalar,
        };
        assert_eq!(lowest.constant_fold(), None);
        assert_eq!(Expression::Negate(Box::new(lowest.clone())).constant_fold(), None);
        assert_eq!(
            Expression::subtract(Expression::number(0), lowest).constant_fold(),
            None
        );
    }

    #[test]
    fn test_fold_non_constant() {
        let expr = Expression::add(Expression::number(1), Expression::ident("x"));
        assert_eq!(expr.constant_fold(), None);
    }

    #[test]
    fn test_fold_fraction() {
        let half = Expression::Number {
            value: Decimal::from_str("0.5").unwrap(),
            unit: UnitExpression::Scalar,
        };
        assert_eq!(half.constant_fold(), Some(Rational::new(1, 2)));

        let third = Expression::Divide {
            numerator: Box::new(Expression::number(1)),
            denominator: Box::new(Expression::number(3)),
        };
        assert_eq!(third.constant_fold(), Some(Rational::new(1, 3)));

        let by_zero = Expression::Divide {
            numerator: Box::new(Expression::number(1)),
            denominator: Box::new(Expression::number(0)),
        };
        assert_eq!(by_zero.constant_fold(), None);
    }

    #[test]
    fn test_replace_subexpression() {
        let expr = Expression::Times(vec![
            Expression::ident("x"),
            Expression::add(Expression::ident("x"), Expression::number(1)),
        ]);
        let replaced = expr.replace_subexpression(&Expression::ident("x"), &Expression::number(2));
        assert_eq!(
            replaced,
            Expression::Times(vec![
                Expression::number(2),
                Expression::add(Expression::number(2), Expression::number(1)),
            ])
        );
        assert_eq!(replaced.constant_fold(), Some(Rational::integer(6)));
        // Original untouched
        assert_eq!(expr.children()[0], &Expression::ident("x"));
    }

    #[test]
    fn test_unit_expression_from_unit() {
        let unit = Unit::named("m").divide(&Unit::named("s").raise(2));
        assert_eq!(
            UnitExpression::from_unit(&unit),
            UnitExpression::Divide(
                Box::new(UnitExpression::Named("m".into())),
                Box::new(UnitExpression::Raise(
                    Box::new(UnitExpression::Named("s".into())),
                    Rational::integer(2)
                ))
            )
        );
        assert!(UnitExpression::from_unit(&Unit::scalar()).is_scalar());
    }
}
