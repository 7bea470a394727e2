//! Unification of type and unit variables
//!
//! A [`Unifier`] is one check session's arena of variable cells. Type
//! variables are union-find nodes: a bound variable points at another
//! variable or at a concrete shape, and [`Unifier::prune`] follows the chain
//! and compresses it. Unit variables are solved over the rationals by
//! substitution.
//!
//! The arena is confined to a single check pass and is not `Sync`-shared;
//! create one per top-level check and drop it afterwards.

use super::unit::{UnitAtom, UnitTerm, UnitVarId};
use super::{TypeClass, TypeExpr, TypeVarId};
use crate::ast::Expression;
use gridtype_core::Rational;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::trace;

/// Why two types failed to unify
#[derive(Debug, Clone, PartialEq)]
pub enum MismatchReason {
    /// Different shapes (e.g. Number vs Text)
    Shape,
    /// Both numbers, units disagree
    Unit { expected: UnitTerm, actual: UnitTerm },
    /// A record field present on one side only
    MissingField(String),
}

/// A unification failure, carrying the types as they were passed in
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMismatch {
    pub expected: TypeExpr,
    pub actual: TypeExpr,
    pub reason: MismatchReason,
}

/// A unit exponent left the range of `i64` rationals
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Unit exponent out of range in {unit}")]
pub struct ExponentOverflow {
    /// The term whose exponents could not be combined
    pub unit: UnitTerm,
}

/// Unification failure
#[derive(Debug, Clone, PartialEq)]
pub enum UnifyError {
    /// A user-visible type error
    Mismatch(TypeMismatch),
    /// Solving a unit equation needed an exponent that does not fit
    Overflow(ExponentOverflow),
    /// Binding would create a cyclic type; the grammar cannot produce one
    Occurs(TypeVarId),
}

/// A pending type-class requirement
#[derive(Debug, Clone)]
pub struct Obligation {
    pub ty: TypeExpr,
    pub class: TypeClass,
    /// Node whose construct needs the capability, for error attribution
    pub node: Expression,
}

/// Arena of type and unit variables for one check session
#[derive(Debug, Default)]
pub struct Unifier {
    types: Vec<Option<TypeExpr>>,
    units: Vec<Option<UnitTerm>>,
    obligations: Vec<Obligation>,
}

impl Unifier {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh, unbound type variable
    pub fn fresh(&mut self) -> TypeExpr {
        self.types.push(None);
        TypeExpr::Var(TypeVarId(self.types.len() - 1))
    }

    /// A fresh, unbound unit variable
    pub fn fresh_unit(&mut self) -> UnitTerm {
        UnitTerm::var(self.fresh_unit_var())
    }

    /// Id of a fresh, unbound unit variable
    pub fn fresh_unit_var(&mut self) -> UnitVarId {
        self.units.push(None);
        UnitVarId(self.units.len() - 1)
    }

    /// A number with a fresh unit variable
    pub fn fresh_number(&mut self) -> TypeExpr {
        TypeExpr::Number(self.fresh_unit())
    }

    /// Number of type variables allocated so far
    pub fn type_variable_count(&self) -> usize {
        self.types.len()
    }

    /// Follow a variable chain to its representative variable, compressing
    /// the path so every variable on it points straight at the representative.
    fn find(&mut self, id: TypeVarId) -> TypeVarId {
        let mut chain = Vec::new();
        let mut current = id;
        while let Some(Some(TypeExpr::Var(next))) = self.types.get(current.0) {
            chain.push(current);
            current = *next;
        }
        // Drop the last hop; it already points at the representative.
        chain.pop();
        for var in chain {
            self.types[var.0] = Some(TypeExpr::Var(current));
        }
        current
    }

    /// Top-level representative of a type: its bound shape, or the
    /// representative unbound variable. Idempotent.
    pub fn prune(&mut self, ty: &TypeExpr) -> TypeExpr {
        match ty {
            TypeExpr::Var(id) => {
                let rep = self.find(*id);
                match &self.types[rep.0] {
                    Some(shape) => shape.clone(),
                    None => TypeExpr::Var(rep),
                }
            }
            other => other.clone(),
        }
    }

    /// Substitute every bound unit variable
    pub fn prune_unit(&self, unit: &UnitTerm) -> Result<UnitTerm, ExponentOverflow> {
        let mut result = unit.clone();
        loop {
            let bound = result
                .variables()
                .find_map(|(id, _)| self.units[id.0].as_ref().map(|b| (id, b.clone())));
            match bound {
                Some((id, binding)) => {
                    result = result
                        .checked_substitute(id, &binding)
                        .ok_or_else(|| ExponentOverflow { unit: unit.clone() })?;
                }
                None => return Ok(result),
            }
        }
    }

    /// Deeply substitute every bound type and unit variable
    pub fn resolve(&mut self, ty: &TypeExpr) -> Result<TypeExpr, ExponentOverflow> {
        Ok(match self.prune(ty) {
            TypeExpr::Var(id) => TypeExpr::Var(id),
            TypeExpr::Number(unit) => TypeExpr::Number(self.prune_unit(&unit)?),
            TypeExpr::Tagged { name, params } => TypeExpr::Tagged {
                name,
                params: params
                    .iter()
                    .map(|p| self.resolve(p))
                    .collect::<Result<_, _>>()?,
            },
            TypeExpr::Record { fields, complete } => TypeExpr::Record {
                fields: fields
                    .iter()
                    .map(|(name, ty)| Ok((name.clone(), self.resolve(ty)?)))
                    .collect::<Result<_, ExponentOverflow>>()?,
                complete,
            },
            TypeExpr::Array(inner) => TypeExpr::Array(Box::new(self.resolve(&inner)?)),
            TypeExpr::Function { args, result } => TypeExpr::Function {
                args: args
                    .iter()
                    .map(|a| self.resolve(a))
                    .collect::<Result<_, _>>()?,
                result: Box::new(self.resolve(&result)?),
            },
            shape @ (TypeExpr::Text | TypeExpr::Boolean | TypeExpr::Temporal(_)) => shape,
        })
    }

    /// Resolved, printable form of a type; the type as given if resolving
    /// it overflows
    pub fn display(&mut self, ty: &TypeExpr) -> String {
        match self.resolve(ty) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => ty.to_string(),
        }
    }

    /// Unify two types.
    ///
    /// On failure the error carries `expected` and `actual` exactly as given.
    pub fn unify(&mut self, expected: &TypeExpr, actual: &TypeExpr) -> Result<(), UnifyError> {
        trace!(expected = %expected, actual = %actual, "unify");
        self.unify_inner(expected, actual).map_err(|err| match err {
            UnifyError::Mismatch(inner) => UnifyError::Mismatch(TypeMismatch {
                expected: expected.clone(),
                actual: actual.clone(),
                reason: inner.reason,
            }),
            occurs => occurs,
        })
    }

    fn unify_inner(&mut self, a: &TypeExpr, b: &TypeExpr) -> Result<(), UnifyError> {
        let holder_a = self.holder(a);
        let holder_b = self.holder(b);
        let pa = self.prune(a);
        let pb = self.prune(b);
        let mismatch = |reason| {
            Err(UnifyError::Mismatch(TypeMismatch {
                expected: pa.clone(),
                actual: pb.clone(),
                reason,
            }))
        };

        match (&pa, &pb) {
            (TypeExpr::Var(x), TypeExpr::Var(y)) if x == y => Ok(()),
            (TypeExpr::Var(x), other) | (other, TypeExpr::Var(x)) => self.bind(*x, other),
            (TypeExpr::Number(u1), TypeExpr::Number(u2)) => match self.unify_units(u1, u2) {
                Err(UnifyError::Mismatch(unit)) => mismatch(unit.reason),
                other => other,
            },
            (TypeExpr::Text, TypeExpr::Text) | (TypeExpr::Boolean, TypeExpr::Boolean) => Ok(()),
            (TypeExpr::Temporal(k1), TypeExpr::Temporal(k2)) if k1 == k2 => Ok(()),
            (
                TypeExpr::Tagged { name: n1, params: p1 },
                TypeExpr::Tagged { name: n2, params: p2 },
            ) if n1 == n2 && p1.len() == p2.len() => {
                for (x, y) in p1.iter().zip(p2) {
                    self.unify_inner(x, y)?;
                }
                Ok(())
            }
            (
                TypeExpr::Record { fields: f1, complete: c1 },
                TypeExpr::Record { fields: f2, complete: c2 },
            ) => {
                if let Some(field) = missing_field(f1, *c1, f2, *c2) {
                    return mismatch(MismatchReason::MissingField(field));
                }
                for (name, t1) in f1 {
                    if let Some(t2) = f2.get(name) {
                        self.unify_inner(t1, t2)?;
                    }
                }
                if !(*c1 && *c2) {
                    // Whichever side was a variable holding a partial record
                    // now learns everything the other side knows.
                    let mut merged = f2.clone();
                    for (name, ty) in f1 {
                        merged.insert(name.clone(), ty.clone());
                    }
                    let upgraded = TypeExpr::Record {
                        fields: merged,
                        complete: *c1 || *c2,
                    };
                    for (holder, complete) in [(holder_a, *c1), (holder_b, *c2)] {
                        if let (Some(var), false) = (holder, complete) {
                            self.types[var.0] = Some(upgraded.clone());
                        }
                    }
                }
                Ok(())
            }
            (TypeExpr::Array(e1), TypeExpr::Array(e2)) => self.unify_inner(e1, e2),
            (
                TypeExpr::Function { args: a1, result: r1 },
                TypeExpr::Function { args: a2, result: r2 },
            ) if a1.len() == a2.len() => {
                for (x, y) in a1.iter().zip(a2) {
                    self.unify_inner(x, y)?;
                }
                self.unify_inner(r1, r2)
            }
            _ => mismatch(MismatchReason::Shape),
        }
    }

    /// Representative variable of `ty` if it is a variable bound to a shape
    fn holder(&mut self, ty: &TypeExpr) -> Option<TypeVarId> {
        match ty {
            TypeExpr::Var(id) => {
                let rep = self.find(*id);
                self.types[rep.0].is_some().then_some(rep)
            }
            _ => None,
        }
    }

    fn bind(&mut self, var: TypeVarId, ty: &TypeExpr) -> Result<(), UnifyError> {
        if self.occurs(var, ty) {
            return Err(UnifyError::Occurs(var));
        }
        trace!(var = var.0, ty = %ty, "bind type variable");
        self.types[var.0] = Some(ty.clone());
        Ok(())
    }

    fn occurs(&mut self, var: TypeVarId, ty: &TypeExpr) -> bool {
        match self.prune(ty) {
            TypeExpr::Var(id) => id == var,
            TypeExpr::Tagged { params, .. } => params.iter().any(|p| self.occurs(var, p)),
            TypeExpr::Record { fields, .. } => fields.values().any(|f| self.occurs(var, f)),
            TypeExpr::Array(inner) => self.occurs(var, &inner),
            TypeExpr::Function { args, result } => {
                args.iter().any(|a| self.occurs(var, a)) || self.occurs(var, &result)
            }
            TypeExpr::Number(_) | TypeExpr::Text | TypeExpr::Boolean | TypeExpr::Temporal(_) => {
                false
            }
        }
    }

    /// Unify two unit terms by solving `expected / actual = 1` over the
    /// rationals.
    ///
    /// A mismatch carries the two terms as given, wrapped as numbers.
    pub fn unify_units(&mut self, expected: &UnitTerm, actual: &UnitTerm) -> Result<(), UnifyError> {
        let overflow = || {
            UnifyError::Overflow(ExponentOverflow {
                unit: expected.clone(),
            })
        };
        let left = self.prune_unit(expected).map_err(UnifyError::Overflow)?;
        let right = self.prune_unit(actual).map_err(UnifyError::Overflow)?;
        let diff = left.checked_divide(&right).ok_or_else(overflow)?;
        if diff.is_scalar() {
            return Ok(());
        }
        let Some((var, exponent)) = diff.variables().next() else {
            return Err(UnifyError::Mismatch(TypeMismatch {
                expected: TypeExpr::Number(expected.clone()),
                actual: TypeExpr::Number(actual.clone()),
                reason: MismatchReason::Unit {
                    expected: expected.clone(),
                    actual: actual.clone(),
                },
            }));
        };
        // var^e * rest = 1  =>  var = rest^(-1/e)
        let rest = diff.without(&UnitAtom::Var(var));
        let solution = Rational::ONE
            .checked_div(exponent)
            .and_then(Rational::checked_neg)
            .and_then(|power| rest.checked_raise(power))
            .ok_or_else(overflow)?;
        trace!(var = var.0, unit = %solution, "bind unit variable");
        self.units[var.0] = Some(solution);
        Ok(())
    }

    // === Type-class obligations ===

    /// Record that `ty` must be in `class`; checked by [`Unifier::discharge`]
    pub fn require(&mut self, ty: TypeExpr, class: TypeClass, node: &Expression) {
        self.obligations.push(Obligation {
            ty,
            class,
            node: node.clone(),
        });
    }

    /// Check every accumulated obligation against the final types.
    ///
    /// Returns the obligations that failed, with their resolved types.
    pub fn discharge(&mut self) -> Result<Vec<Obligation>, ExponentOverflow> {
        let obligations = std::mem::take(&mut self.obligations);
        let mut failed = Vec::new();
        for obligation in obligations {
            let resolved = self.resolve(&obligation.ty)?;
            if !satisfies(&resolved, obligation.class) {
                failed.push(Obligation {
                    ty: resolved,
                    ..obligation
                });
            }
        }
        Ok(failed)
    }
}

/// First field that makes two records incompatible, if any.
///
/// Two complete records need identical field sets. A partial record may
/// leave fields out but cannot demand one a complete record lacks. Two
/// partial records only meet on their shared fields.
fn missing_field(
    f1: &BTreeMap<String, TypeExpr>,
    c1: bool,
    f2: &BTreeMap<String, TypeExpr>,
    c2: bool,
) -> Option<String> {
    let absent = |from: &BTreeMap<String, TypeExpr>, to: &BTreeMap<String, TypeExpr>| {
        from.keys().find(|k| !to.contains_key(*k)).cloned()
    };
    match (c1, c2) {
        (true, true) => absent(f1, f2).or_else(|| absent(f2, f1)),
        (true, false) => absent(f2, f1),
        (false, true) => absent(f1, f2),
        (false, false) => None,
    }
}

/// Whether a resolved type has a type-class capability. Free variables
/// satisfy everything: nothing forces them to be a function.
fn satisfies(ty: &TypeExpr, class: TypeClass) -> bool {
    match ty {
        TypeExpr::Var(_)
        | TypeExpr::Number(_)
        | TypeExpr::Text
        | TypeExpr::Boolean
        | TypeExpr::Temporal(_) => true,
        TypeExpr::Tagged { params, .. } => params.iter().all(|p| satisfies(p, class)),
        TypeExpr::Record { fields, .. } => fields.values().all(|f| satisfies(f, class)),
        TypeExpr::Array(inner) => satisfies(inner, class),
        TypeExpr::Function { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridtype_core::TemporalKind;
    use pretty_assertions::assert_eq;

    fn unit(name: &str) -> UnitTerm {
        UnitTerm::named(name)
    }

    #[test]
    fn test_bind_and_prune() {
        let mut u = Unifier::new();
        let a = u.fresh();
        let b = u.fresh();
        u.unify(&a, &b).unwrap();
        u.unify(&b, &TypeExpr::Text).unwrap();
        assert_eq!(u.prune(&a), TypeExpr::Text);
        assert_eq!(u.prune(&b), TypeExpr::Text);
        // Idempotent
        let once = u.prune(&a);
        assert_eq!(u.prune(&once), once);
    }

    #[test]
    fn test_unified_variables_share_representative() {
        let mut u = Unifier::new();
        let vars: Vec<_> = (0..5).map(|_| u.fresh()).collect();
        for pair in vars.windows(2) {
            u.unify(&pair[0], &pair[1]).unwrap();
        }
        let rep = u.prune(&vars[0]);
        for v in &vars {
            assert_eq!(u.prune(v), rep);
        }
    }

    #[test]
    fn test_shape_mismatch_keeps_originals() {
        let mut u = Unifier::new();
        let a = u.fresh();
        u.unify(&a, &TypeExpr::Text).unwrap();
        let err = u.unify(&a, &TypeExpr::Boolean).unwrap_err();
        match err {
            UnifyError::Mismatch(m) => {
                assert_eq!(m.expected, a);
                assert_eq!(m.actual, TypeExpr::Boolean);
                assert_eq!(m.reason, MismatchReason::Shape);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_occurs_check() {
        let mut u = Unifier::new();
        let a = u.fresh();
        let err = u.unify(&a, &TypeExpr::Array(Box::new(a.clone()))).unwrap_err();
        assert!(matches!(err, UnifyError::Occurs(_)));
    }

    #[test]
    fn test_unit_equations() {
        let mut u = Unifier::new();
        let per_second = unit("s").checked_raise(-Rational::ONE).unwrap();
        let m_per_s = unit("m").checked_divide(&unit("s")).unwrap();
        let also = unit("m").checked_multiply(&per_second).unwrap();
        assert!(u.unify_units(&m_per_s, &also).is_ok());

        let per_second_squared = unit("s").checked_raise(Rational::integer(-2)).unwrap();
        let accel = unit("m").checked_multiply(&per_second_squared).unwrap();
        assert!(u.unify_units(&m_per_s, &accel).is_err());
    }

    #[test]
    fn test_unit_variable_solved_with_fraction() {
        let mut u = Unifier::new();
        let v = u.fresh_unit_var();
        // v^2 = m  =>  v = m^(1/2)
        u.unify_units(&UnitTerm::var_power(v, Rational::integer(2)), &unit("m"))
            .unwrap();
        assert_eq!(u.prune_unit(&UnitTerm::var(v)).unwrap().to_string(), "m^(1/2)");
    }

    #[test]
    fn test_unit_exponent_overflow() {
        let mut u = Unifier::new();
        let huge = Rational::integer(1 << 40);
        let v = u.fresh_unit_var();
        let big = unit("m").checked_raise(huge).unwrap();
        u.unify_units(&UnitTerm::var(v), &big).unwrap();

        let raised = UnitTerm::var_power(v, huge);
        assert!(matches!(u.prune_unit(&raised), Err(ExponentOverflow { .. })));
        assert!(matches!(
            u.unify(&TypeExpr::Number(raised.clone()), &TypeExpr::Number(unit("m"))),
            Err(UnifyError::Overflow(_))
        ));
        assert!(u.resolve(&TypeExpr::Number(raised)).is_err());
    }

    #[test]
    fn test_unit_mismatch_in_numbers() {
        let mut u = Unifier::new();
        let err = u
            .unify(&TypeExpr::Number(unit("m")), &TypeExpr::Number(unit("s")))
            .unwrap_err();
        assert!(matches!(
            err,
            UnifyError::Mismatch(TypeMismatch {
                reason: MismatchReason::Unit { .. },
                ..
            })
        ));
    }

    fn record(fields: &[(&str, TypeExpr)], complete: bool) -> TypeExpr {
        TypeExpr::Record {
            fields: fields
                .iter()
                .map(|(n, t)| (n.to_string(), t.clone()))
                .collect(),
            complete,
        }
    }

    #[test]
    fn test_complete_records_need_same_fields() {
        let mut u = Unifier::new();
        let a = record(&[("x", TypeExpr::Text)], true);
        let b = record(&[("x", TypeExpr::Text), ("y", TypeExpr::Boolean)], true);
        let err = u.unify(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            UnifyError::Mismatch(TypeMismatch {
                reason: MismatchReason::MissingField(ref f),
                ..
            }) if f == "y"
        ));
    }

    #[test]
    fn test_partial_record_learns_fields() {
        let mut u = Unifier::new();
        let field = u.fresh();
        let holder = u.fresh();
        u.unify(&holder, &record(&[("x", field.clone())], false)).unwrap();
        let full = record(
            &[("x", TypeExpr::Temporal(TemporalKind::Date)), ("y", TypeExpr::Text)],
            true,
        );
        u.unify(&holder, &full).unwrap();
        assert_eq!(u.resolve(&field).unwrap(), TypeExpr::Temporal(TemporalKind::Date));
        assert_eq!(u.resolve(&holder).unwrap(), u.resolve(&full).unwrap());
    }

    #[test]
    fn test_discharge_rejects_functions() {
        let mut u = Unifier::new();
        let f = TypeExpr::Function {
            args: vec![TypeExpr::Text],
            result: Box::new(TypeExpr::Text),
        };
        let a = u.fresh();
        u.require(a.clone(), TypeClass::Comparable, &Expression::ident("f"));
        u.require(TypeExpr::Text, TypeClass::Equatable, &Expression::ident("t"));
        u.unify(&a, &f).unwrap();
        let failed = u.discharge().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].class, TypeClass::Comparable);
        assert_eq!(failed[0].ty, f);
    }
}
