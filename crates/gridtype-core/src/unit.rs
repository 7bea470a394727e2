//! Concrete units of measure
//!
//! A [`Unit`] is a product of named base units raised to non-zero rational
//! powers. The empty product is the scalar (dimensionless) unit. Units carry
//! no variables; the type checker has its own variable-carrying unit terms
//! that resolve down to a `Unit` once every variable is known.
//!
//! # Examples
//!
//! ```rust
//! use gridtype_core::Unit;
//!
//! let speed = Unit::named("m").divide(&Unit::named("s"));
//! let accel = speed.divide(&Unit::named("s"));
//! assert_eq!(accel.to_string(), "m/s^2");
//! assert_eq!(accel.multiply(&Unit::named("s").raise(2)), Unit::named("m"));
//! ```

use crate::error::{CoreResult, Error};
use crate::rational::Rational;
use ahash::AHashMap;
use std::collections::BTreeMap;
use std::fmt;

/// A concrete unit: base-unit name → non-zero exponent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Unit {
    powers: BTreeMap<String, Rational>,
}

impl Unit {
    /// The dimensionless unit
    pub fn scalar() -> Self {
        Self::default()
    }

    /// A single named base unit with exponent 1
    pub fn named<S: Into<String>>(name: S) -> Self {
        let mut powers = BTreeMap::new();
        powers.insert(name.into(), Rational::ONE);
        Unit { powers }
    }

    /// Build a unit from `(name, exponent)` pairs; zero exponents are dropped
    pub fn from_powers<I, S>(powers: I) -> Self
    where
        I: IntoIterator<Item = (S, Rational)>,
        S: Into<String>,
    {
        let mut unit = Unit::scalar();
        for (name, power) in powers {
            unit.accumulate(name.into(), power);
        }
        unit
    }

    /// Check if this is the dimensionless unit
    pub fn is_scalar(&self) -> bool {
        self.powers.is_empty()
    }

    /// Iterate over `(base unit, exponent)` pairs in name order
    pub fn powers(&self) -> impl Iterator<Item = (&str, Rational)> + '_ {
        self.powers.iter().map(|(name, power)| (name.as_str(), *power))
    }

    /// Exponent of a base unit (zero when absent)
    pub fn power_of(&self, name: &str) -> Rational {
        self.powers.get(name).copied().unwrap_or(Rational::ZERO)
    }

    /// `self * other`
    pub fn multiply(&self, other: &Unit) -> Unit {
        let mut result = self.clone();
        for (name, power) in &other.powers {
            result.accumulate(name.clone(), *power);
        }
        result
    }

    /// `self / other`
    pub fn divide(&self, other: &Unit) -> Unit {
        self.multiply(&other.reciprocal())
    }

    /// `1 / self`
    pub fn reciprocal(&self) -> Unit {
        self.raise_rational(-Rational::ONE)
    }

    /// `self ^ n` for an integer power
    pub fn raise(&self, exponent: i64) -> Unit {
        self.raise_rational(Rational::integer(exponent))
    }

    /// `self ^ r` for a rational power
    pub fn raise_rational(&self, exponent: Rational) -> Unit {
        if exponent.is_zero() {
            return Unit::scalar();
        }
        Unit {
            powers: self
                .powers
                .iter()
                .map(|(name, power)| (name.clone(), *power * exponent))
                .collect(),
        }
    }

    /// The `n`th root of this unit.
    ///
    /// Exponents are rational, so every positive root is exact; a
    /// non-positive `n` has no meaning and is rejected.
    pub fn root(&self, n: i64) -> CoreResult<Unit> {
        if n <= 0 {
            return Err(Error::NoExactRoot {
                unit: self.to_string(),
                root: n,
            });
        }
        Ok(self.raise_rational(Rational::new(1, n)))
    }

    fn accumulate(&mut self, name: String, power: Rational) {
        let entry = self.powers.entry(name).or_insert(Rational::ZERO);
        *entry = *entry + power;
        if entry.is_zero() {
            self.powers.retain(|_, p| !p.is_zero());
        }
    }
}

/// Write one `name^power` factor with `power > 0`.
fn write_factor(f: &mut fmt::Formatter<'_>, name: &str, power: Rational) -> fmt::Result {
    if power == Rational::ONE {
        write!(f, "{}", name)
    } else if power.is_integer() {
        write!(f, "{}^{}", name, power)
    } else {
        write!(f, "{}^({})", name, power)
    }
}

impl fmt::Display for Unit {
    /// Render in literal syntax: positive powers joined by `*`, then each
    /// negative power as a `/` divisor. The scalar unit renders as `1`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let positive: Vec<_> = self.powers.iter().filter(|(_, p)| **p > Rational::ZERO).collect();
        let negative: Vec<_> = self.powers.iter().filter(|(_, p)| **p < Rational::ZERO).collect();

        if positive.is_empty() {
            write!(f, "1")?;
        }
        for (i, (name, power)) in positive.iter().enumerate() {
            if i > 0 {
                write!(f, "*")?;
            }
            write_factor(f, name, **power)?;
        }
        for (name, power) in negative {
            write!(f, "/")?;
            write_factor(f, name, -*power)?;
        }
        Ok(())
    }
}

/// A declared unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDeclaration {
    /// Canonical name used in unit expressions
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Alternative spellings that resolve to this unit
    pub aliases: Vec<String>,
}

/// The set of unit names a check session accepts.
///
/// Every declared unit is an independent base unit: `km` and `m` are
/// distinct dimensions as far as unification is concerned.
#[derive(Debug, Clone)]
pub struct UnitCatalogue {
    units: AHashMap<String, UnitDeclaration>,
    aliases: AHashMap<String, String>,
}

impl UnitCatalogue {
    /// An empty catalogue
    pub fn empty() -> Self {
        Self {
            units: AHashMap::new(),
            aliases: AHashMap::new(),
        }
    }

    /// Declare a unit (replacing any previous declaration of the same name)
    pub fn declare(&mut self, name: &str, description: &str, aliases: &[&str]) -> CoreResult<()> {
        if name.is_empty() || name == "1" || !name.chars().all(|c| c.is_alphabetic() || c == '_')
        {
            return Err(Error::InvalidUnit(name.to_string()));
        }
        for alias in aliases {
            self.aliases.insert((*alias).to_string(), name.to_string());
        }
        self.units.insert(
            name.to_string(),
            UnitDeclaration {
                name: name.to_string(),
                description: description.to_string(),
                aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
            },
        );
        Ok(())
    }

    /// Resolve a name or alias to its canonical unit name
    pub fn canonical(&self, name: &str) -> Option<&str> {
        if let Some(decl) = self.units.get(name) {
            return Some(&decl.name);
        }
        self.aliases.get(name).map(String::as_str)
    }

    /// Case-insensitive near matches, for "did you mean" suggestions
    pub fn similar(&self, name: &str) -> Vec<&str> {
        let mut found: Vec<&str> = self
            .units
            .keys()
            .filter(|known| known.eq_ignore_ascii_case(name))
            .map(String::as_str)
            .collect();
        found.sort_unstable();
        found
    }

    /// Look up a declaration by canonical name
    pub fn get(&self, name: &str) -> Option<&UnitDeclaration> {
        self.units.get(name)
    }

    /// All declarations, sorted by name
    pub fn declarations(&self) -> Vec<&UnitDeclaration> {
        let mut all: Vec<_> = self.units.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}

impl Default for UnitCatalogue {
    fn default() -> Self {
        const BUILTIN: &[(&str, &str, &[&str])] = &[
            ("m", "metre", &["metre", "meter"]),
            ("km", "kilometre", &["kilometre", "kilometer"]),
            ("cm", "centimetre", &[]),
            ("mm", "millimetre", &[]),
            ("s", "second", &["second", "sec"]),
            ("min", "minute", &["minute"]),
            ("hour", "hour", &["h", "hr"]),
            ("day", "day", &["days"]),
            ("kg", "kilogram", &["kilogram"]),
            ("g", "gram", &["gram"]),
            ("K", "kelvin", &["kelvin"]),
            ("A", "ampere", &["ampere", "amp"]),
            ("mol", "mole", &["mole"]),
            ("cd", "candela", &["candela"]),
            ("l", "litre", &["litre", "liter", "L"]),
            ("USD", "US dollar", &["dollar"]),
            ("EUR", "euro", &["euro"]),
            ("GBP", "pound sterling", &[]),
            ("person", "a person", &["people"]),
        ];

        let mut catalogue = Self::empty();
        for (name, description, aliases) in BUILTIN {
            // Builtin names are all valid identifiers.
            let _ = catalogue.declare(name, description, aliases);
        }
        catalogue
    }
}
