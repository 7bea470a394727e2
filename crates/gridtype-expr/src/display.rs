//! Textual rendering of expressions
//!
//! Output is accepted back by [`parse_expression`](crate::parse_expression).
//! Operator operands that are themselves operators are always bracketed, so
//! rendering never depends on precedence.

use crate::ast::{Expression, UnitExpression};
use crate::parser::is_keyword;
use gridtype_core::Rational;
use lazy_regex::regex_is_match;
use std::fmt;

/// Write a name, backtick-quoting it unless it lexes as a plain identifier
pub(crate) fn write_name(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if regex_is_match!(r"^[A-Za-z_][A-Za-z0-9_]*$", name) && name != "_" && !is_keyword(name) {
        write!(f, "{}", name)
    } else {
        write!(f, "`{}`", name.replace('`', "``"))
    }
}

/// Write an operand, bracketed if it is an operator
fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expression) -> fmt::Result {
    if expr.is_operator() {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

fn write_chain<'a, I>(f: &mut fmt::Formatter<'_>, operands: &[Expression], separators: I) -> fmt::Result
where
    I: IntoIterator<Item = &'a str>,
{
    let mut separators = separators.into_iter();
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", separators.next().unwrap_or("?"))?;
        }
        write_operand(f, operand)?;
    }
    Ok(())
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Number { value, unit } => {
                write!(f, "{}", value)?;
                if !unit.is_scalar() {
                    write!(f, "{{{}}}", unit)?;
                }
                Ok(())
            }
            Expression::Text(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Expression::Boolean(b) => write!(f, "{}", b),
            Expression::Temporal(t) => write!(f, "{}{{{}}}", t.kind().keyword(), t),
            Expression::TypeLiteral(ty) => write!(f, "type{{{}}}", ty),
            Expression::Identifier(name) => write_name(f, name),
            Expression::EntireColumn { table, column } => {
                write!(f, "@entire ")?;
                if let Some(table) = table {
                    write_name(f, table.as_str())?;
                    write!(f, ".")?;
                }
                write_name(f, column)
            }
            Expression::MatchAnything => write!(f, "_"),
            Expression::Negate(inner) => {
                write!(f, "-")?;
                write_operand(f, inner)
            }
            Expression::AddSubtract {
                operands,
                operators,
            } => write_chain(f, operands, operators.iter().map(|op| op.symbol())),
            Expression::Times(items) => write_chain(f, items, std::iter::repeat("*")),
            Expression::Divide {
                numerator,
                denominator,
            } => {
                write_operand(f, numerator)?;
                write!(f, " / ")?;
                write_operand(f, denominator)
            }
            Expression::Raise { base, exponent } => {
                write_operand(f, base)?;
                write!(f, " ^ ")?;
                write_operand(f, exponent)
            }
            Expression::Concat(items) => write_chain(f, items, std::iter::repeat(";")),
            Expression::NotEqual { left, right } => {
                write_operand(f, left)?;
                write!(f, " <> ")?;
                write_operand(f, right)
            }
            Expression::Comparison {
                operands,
                operators,
            } => write_chain(f, operands, operators.iter().map(|op| op.symbol())),
            Expression::Equal {
                operands,
                last_is_pattern,
            } => {
                let last = operands.len().saturating_sub(1);
                let separators = (1..operands.len())
                    .map(|i| if *last_is_pattern && i == last { "=~" } else { "=" });
                write_chain(f, operands, separators)
            }
            Expression::And(items) => write_chain(f, items, std::iter::repeat("&")),
            Expression::Or(items) => write_chain(f, items, std::iter::repeat("|")),
            Expression::IfThenElse {
                condition,
                then_branch,
                else_branch,
            } => write!(
                f,
                "if {} then {} else {} endif",
                condition, then_branch, else_branch
            ),
            Expression::Match { subject, clauses } => {
                write!(f, "match {}", subject)?;
                for clause in clauses {
                    for (i, alternative) in clause.patterns.iter().enumerate() {
                        write!(f, " {} {}", if i == 0 { "case" } else { "orcase" }, alternative.pattern)?;
                        if let Some(guard) = &alternative.guard {
                            write!(f, " given {}", guard)?;
                        }
                    }
                    write!(f, " then {}", clause.outcome)?;
                }
                write!(f, " endmatch")
            }
            Expression::Define { definitions, body } => {
                write!(f, "define ")?;
                for (i, definition) in definitions.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_operand(f, &definition.pattern)?;
                    write!(f, " = ")?;
                    write_operand(f, &definition.value)?;
                }
                write!(f, " then {} enddefine", body)
            }
            Expression::Record(fields) => {
                write!(f, "(")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_name(f, name)?;
                    write!(f, ": {}", value)?;
                }
                write!(f, ")")
            }
            Expression::FieldAccess { record, field } => {
                write_operand(f, record)?;
                write!(f, "#")?;
                write_name(f, field)
            }
            Expression::Array(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            Expression::Call { function, args } => {
                match function.as_ref() {
                    Expression::Identifier(_)
                    | Expression::FieldAccess { .. }
                    | Expression::Call { .. } => write!(f, "{}", function)?,
                    other => write!(f, "({})", other)?,
                }
                write!(f, "(")?;
                write_list(f, args)?;
                write!(f, ")")
            }
        }
    }
}

fn write_unit_power(f: &mut fmt::Formatter<'_>, power: Rational) -> fmt::Result {
    if power.is_integer() {
        write!(f, "^{}", power)
    } else {
        write!(f, "^({})", power)
    }
}

impl fmt::Display for UnitExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitExpression::Scalar => write!(f, "1"),
            UnitExpression::Named(name) => write!(f, "{}", name),
            UnitExpression::Times(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, "*")?;
                    }
                    match item {
                        UnitExpression::Divide(..) => write!(f, "({})", item)?,
                        _ => write!(f, "{}", item)?,
                    }
                }
                Ok(())
            }
            UnitExpression::Divide(top, bottom) => {
                write!(f, "{}/", top)?;
                match bottom.as_ref() {
                    UnitExpression::Times(_) | UnitExpression::Divide(..) => {
                        write!(f, "({})", bottom)
                    }
                    _ => write!(f, "{}", bottom),
                }
            }
            UnitExpression::Raise(base, power) => {
                match base.as_ref() {
                    UnitExpression::Named(_) | UnitExpression::Scalar => write!(f, "{}", base)?,
                    _ => write!(f, "({})", base)?,
                }
                write_unit_power(f, *power)
            }
        }
    }
}
