//! Unit terms with variables
//!
//! A [`UnitTerm`] is a product of atoms (named base units or unit variables)
//! raised to rational powers. Unit variables are a separate species from
//! type variables and are solved by [`crate::types::unify::Unifier`].

use gridtype_core::{Rational, Unit};
use std::collections::BTreeMap;
use std::fmt;

/// Index of a unit variable in a unifier session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitVarId(pub(crate) usize);

impl UnitVarId {
    /// Position of the variable in its session
    pub fn index(self) -> usize {
        self.0
    }
}

/// Factor of a unit term
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitAtom {
    /// Canonical base unit name
    Named(String),
    /// Unsolved unit variable
    Var(UnitVarId),
}

/// Product of atoms to non-zero rational powers; empty means scalar
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnitTerm {
    powers: BTreeMap<UnitAtom, Rational>,
}

impl UnitTerm {
    /// The dimensionless unit
    pub fn scalar() -> Self {
        Self::default()
    }

    /// A single named unit
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self::atom(UnitAtom::Named(name.into()))
    }

    /// A single unit variable
    pub fn var(id: UnitVarId) -> Self {
        Self::atom(UnitAtom::Var(id))
    }

    /// A unit variable raised to `power`
    pub fn var_power(id: UnitVarId, power: Rational) -> Self {
        if power.is_zero() {
            return Self::scalar();
        }
        let mut powers = BTreeMap::new();
        powers.insert(UnitAtom::Var(id), power);
        UnitTerm { powers }
    }

    fn atom(atom: UnitAtom) -> Self {
        let mut powers = BTreeMap::new();
        powers.insert(atom, Rational::ONE);
        UnitTerm { powers }
    }

    /// Lift a concrete unit
    pub fn from_unit(unit: &Unit) -> Self {
        UnitTerm {
            powers: unit
                .powers()
                .map(|(name, power)| (UnitAtom::Named(name.to_string()), power))
                .collect(),
        }
    }

    /// Check if this is the dimensionless unit
    pub fn is_scalar(&self) -> bool {
        self.powers.is_empty()
    }

    /// Iterate over factors in atom order
    pub fn factors(&self) -> impl Iterator<Item = (&UnitAtom, Rational)> + '_ {
        self.powers.iter().map(|(atom, power)| (atom, *power))
    }

    /// Variables occurring in this term, with their exponents
    pub fn variables(&self) -> impl Iterator<Item = (UnitVarId, Rational)> + '_ {
        self.powers.iter().filter_map(|(atom, power)| match atom {
            UnitAtom::Var(id) => Some((*id, *power)),
            UnitAtom::Named(_) => None,
        })
    }

    /// Check if the term mentions no variables
    pub fn is_ground(&self) -> bool {
        self.variables().next().is_none()
    }

    /// `self * other`; `None` if an exponent leaves the rational range
    pub fn checked_multiply(&self, other: &UnitTerm) -> Option<UnitTerm> {
        let mut result = self.clone();
        for (atom, power) in &other.powers {
            result.accumulate(atom.clone(), *power)?;
        }
        Some(result)
    }

    /// `self / other`
    pub fn checked_divide(&self, other: &UnitTerm) -> Option<UnitTerm> {
        self.checked_multiply(&other.checked_reciprocal()?)
    }

    /// `1 / self`
    pub fn checked_reciprocal(&self) -> Option<UnitTerm> {
        self.checked_raise(-Rational::ONE)
    }

    /// `self ^ r`
    pub fn checked_raise(&self, exponent: Rational) -> Option<UnitTerm> {
        if exponent.is_zero() {
            return Some(UnitTerm::scalar());
        }
        let powers = self
            .powers
            .iter()
            .map(|(atom, power)| Some((atom.clone(), power.checked_mul(exponent)?)))
            .collect::<Option<_>>()?;
        Some(UnitTerm { powers })
    }

    /// Remove one atom, returning the rest
    pub fn without(&self, atom: &UnitAtom) -> UnitTerm {
        let mut result = self.clone();
        result.powers.remove(atom);
        result
    }

    /// Replace variable `id` with `replacement` everywhere
    pub fn checked_substitute(&self, id: UnitVarId, replacement: &UnitTerm) -> Option<UnitTerm> {
        let atom = UnitAtom::Var(id);
        match self.powers.get(&atom) {
            None => Some(self.clone()),
            Some(power) => self
                .without(&atom)
                .checked_multiply(&replacement.checked_raise(*power)?),
        }
    }

    /// The concrete unit, if the term has no variables
    pub fn to_unit(&self) -> Option<Unit> {
        if !self.is_ground() {
            return None;
        }
        Some(self.to_unit_defaulting())
    }

    /// The concrete unit with every variable treated as scalar
    pub fn to_unit_defaulting(&self) -> Unit {
        Unit::from_powers(self.powers.iter().filter_map(|(atom, power)| match atom {
            UnitAtom::Named(name) => Some((name.clone(), *power)),
            UnitAtom::Var(_) => None,
        }))
    }

    fn accumulate(&mut self, atom: UnitAtom, power: Rational) -> Option<()> {
        let entry = self.powers.entry(atom).or_insert(Rational::ZERO);
        *entry = entry.checked_add(power)?;
        if entry.is_zero() {
            self.powers.retain(|_, p| !p.is_zero());
        }
        Some(())
    }
}

impl fmt::Display for UnitTerm {
    /// Same layout as [`Unit`]; variables print as `?uN`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = Unit::from_powers(self.powers.iter().map(|(atom, power)| {
            let name = match atom {
                UnitAtom::Named(name) => name.clone(),
                UnitAtom::Var(id) => format!("?u{}", id.0),
            };
            (name, *power)
        }));
        write!(f, "{}", unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_cancels() {
        let speed = UnitTerm::named("m").checked_divide(&UnitTerm::named("s")).unwrap();
        let back = speed.checked_multiply(&UnitTerm::named("s")).unwrap();
        assert_eq!(back, UnitTerm::named("m"));
        assert!(speed.checked_divide(&speed).unwrap().is_scalar());
    }

    #[test]
    fn test_substitute() {
        let v = UnitVarId(0);
        // m * v^2 with v := s^-1
        let term = UnitTerm::named("m")
            .checked_multiply(&UnitTerm::var_power(v, Rational::integer(2)))
            .unwrap();
        let per_second = UnitTerm::named("s").checked_reciprocal().unwrap();
        let solved = term.checked_substitute(v, &per_second).unwrap();
        assert!(solved.is_ground());
        assert_eq!(solved.to_unit().unwrap().to_string(), "m/s^2");
    }

    #[test]
    fn test_exponent_overflow_is_reported() {
        let huge = Rational::integer(1 << 40);
        let term = UnitTerm::named("m").checked_raise(huge).unwrap();
        assert_eq!(term.checked_raise(huge), None);
        assert_eq!(term.checked_raise(Rational::new(1, 1 << 40)), Some(UnitTerm::named("m")));

        let top = UnitTerm::named("m").checked_raise(Rational::integer(i64::MAX)).unwrap();
        assert_eq!(top.checked_multiply(&UnitTerm::named("m")), None);

        let v = UnitVarId(0);
        assert_eq!(UnitTerm::var_power(v, huge).checked_substitute(v, &term), None);
    }

    #[test]
    fn test_display_with_variable() {
        let term = UnitTerm::named("m")
            .checked_multiply(&UnitTerm::var(UnitVarId(3)))
            .unwrap();
        assert_eq!(term.to_string(), "?u3*m");
        assert_eq!(term.to_unit(), None);
        assert_eq!(term.to_unit_defaulting(), Unit::named("m"));
    }
}
