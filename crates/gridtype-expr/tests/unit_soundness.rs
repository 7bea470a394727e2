//! Unit unification agrees with exponent-vector equality

use gridtype_core::{Rational, Unit};
use gridtype_expr::types::{Unifier, UnitTerm};
use gridtype_expr::{check_expression, parse_expression, CheckContext, CheckOptions, CollectingRecorder};
use proptest::prelude::*;

const ALPHABET: [&str; 3] = ["m", "s", "kg"];

fn unit_from(exponents: &[i64]) -> Unit {
    Unit::from_powers(
        ALPHABET
            .iter()
            .zip(exponents)
            .map(|(name, power)| (*name, Rational::integer(*power))),
    )
}

fn exponents() -> impl Strategy<Value = Vec<i64>> {
    proptest::collection::vec(-3i64..=3, ALPHABET.len())
}

proptest! {
    #[test]
    fn unify_succeeds_iff_exponents_match(a in exponents(), b in exponents()) {
        let mut unifier = Unifier::new();
        let left = UnitTerm::from_unit(&unit_from(&a));
        let right = UnitTerm::from_unit(&unit_from(&b));
        prop_assert_eq!(unifier.unify_units(&left, &right).is_ok(), a == b);
    }

    #[test]
    fn unit_variable_solves_to_quotient(a in exponents(), b in exponents()) {
        let mut unifier = Unifier::new();
        let var = unifier.fresh_unit();
        let known = unit_from(&a);
        let target = unit_from(&b);
        let product = var.checked_multiply(&UnitTerm::from_unit(&known)).unwrap();
        prop_assert!(unifier.unify_units(&product, &UnitTerm::from_unit(&target)).is_ok());
        prop_assert_eq!(
            unifier.prune_unit(&var).unwrap(),
            UnitTerm::from_unit(&target.divide(&known))
        );
    }
}

fn checks(text: &str) -> bool {
    let options = CheckOptions::default();
    let expr = parse_expression(text).unwrap();
    let mut errors = CollectingRecorder::new();
    check_expression(&expr, &CheckContext::standalone(&options), &mut errors).is_ok()
}

#[test]
fn test_equivalent_unit_spellings() {
    assert!(checks("1{m/s} + 1{m*s^-1}"));
    assert!(!checks("1{m/s} + 1{m/s^2}"));
}
