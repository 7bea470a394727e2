//! Name-binding environments threaded through checking and evaluation
//!
//! Both states are persistent: extending one yields a new state and leaves
//! the original untouched, so branches can diverge from a shared prefix.
//! The maps sit behind an `Arc` and are copied only when extended.

use crate::context::EvaluationOptions;
use crate::error::InternalError;
use crate::types::TypeExpr;
use gridtype_core::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Names starting with this prefix are engine-introduced and may be rebound
pub const IMPLICIT_PREFIX: char = '?';

/// Identifier → type bindings visible to the checker
#[derive(Debug, Clone, Default)]
pub struct TypeState {
    variables: Arc<BTreeMap<String, TypeExpr>>,
}

impl TypeState {
    /// An empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Type bound to a name
    pub fn get(&self, name: &str) -> Option<&TypeExpr> {
        self.variables.get(name)
    }

    /// Check if a name is bound
    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Extend with a new binding. Returns `None` if the name is already
    /// bound (and not implicit).
    pub fn add(&self, name: &str, ty: TypeExpr) -> Option<TypeState> {
        if self.contains(name) && !name.starts_with(IMPLICIT_PREFIX) {
            return None;
        }
        let mut variables = (*self.variables).clone();
        variables.insert(name.to_string(), ty);
        Some(TypeState {
            variables: Arc::new(variables),
        })
    }

    /// Names bound here that are not bound in `earlier`
    pub fn bound_since(&self, earlier: &TypeState) -> BTreeSet<String> {
        self.variables
            .keys()
            .filter(|name| !earlier.contains(name))
            .cloned()
            .collect()
    }

    /// All bound names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }
}

/// Identifier → value bindings, the current row, and whether provenance is
/// being captured
#[derive(Debug, Clone, Default)]
pub struct EvaluateState {
    variables: Arc<BTreeMap<String, Value>>,
    row: Option<usize>,
    record_explanation: bool,
}

impl EvaluateState {
    /// A state with no bindings and no current row
    pub fn new(options: &EvaluationOptions) -> Self {
        Self {
            variables: Arc::default(),
            row: None,
            record_explanation: options.record_explanation,
        }
    }

    /// A state for evaluating at the given row
    pub fn for_row(options: &EvaluationOptions, row: usize) -> Self {
        Self {
            row: Some(row),
            ..Self::new(options)
        }
    }

    /// Current row, if evaluating row by row
    pub fn row(&self) -> Option<usize> {
        self.row
    }

    /// Whether evaluation results keep their children for explanations
    pub fn record_explanation(&self) -> bool {
        self.record_explanation
    }

    /// Value bound to a name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Extend with a new binding.
    ///
    /// The checker has already rejected duplicate names, so a duplicate
    /// here is an internal error.
    pub fn add(&self, name: &str, value: Value) -> Result<EvaluateState, InternalError> {
        if self.variables.contains_key(name) && !name.starts_with(IMPLICIT_PREFIX) {
            return Err(InternalError::new(format!(
                "Duplicate variable binding at evaluation: {}",
                name
            )));
        }
        let mut variables = (*self.variables).clone();
        variables.insert(name.to_string(), value);
        Ok(EvaluateState {
            variables: Arc::new(variables),
            row: self.row,
            record_explanation: self.record_explanation,
        })
    }

    /// All bound names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_state_is_persistent() {
        let base = TypeState::new().add("x", TypeExpr::Text).unwrap();
        let left = base.add("y", TypeExpr::Boolean).unwrap();
        let right = base.add("z", TypeExpr::number()).unwrap();

        assert!(left.contains("y") && !left.contains("z"));
        assert!(right.contains("z") && !right.contains("y"));
        assert!(!base.contains("y"));
        assert_eq!(left.bound_since(&base).into_iter().collect::<Vec<_>>(), vec!["y"]);
    }

    #[test]
    fn test_type_state_rejects_duplicates() {
        let base = TypeState::new().add("x", TypeExpr::Text).unwrap();
        assert!(base.add("x", TypeExpr::Text).is_none());
        let implicit = base.add("?it", TypeExpr::Text).unwrap();
        assert!(implicit.add("?it", TypeExpr::Boolean).is_some());
    }

    #[test]
    fn test_evaluate_state_duplicate_is_internal() {
        let state = EvaluateState::for_row(&EvaluationOptions::default(), 3)
            .add("n", Value::int(1))
            .unwrap();
        assert_eq!(state.row(), Some(3));
        assert_eq!(state.get("n"), Some(&Value::int(1)));
        assert!(state.add("n", Value::int(2)).is_err());
    }
}
