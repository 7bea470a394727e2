//! Declared tagged types

use super::syntax::{TypeSyntax, TypeSyntaxError};
use super::unify::Unifier;
use super::TypeExpr;
use crate::error::DeclarationError;
use ahash::AHashMap;
use gridtype_core::UnitCatalogue;
use std::collections::BTreeMap;

/// Builtin type wrapping a possibly-absent value
pub const OPTIONAL_TYPE: &str = "Optional";

/// Builtin type of `type{...}` literals
pub const TYPE_TYPE: &str = "Type";

/// One tag of a tagged type
#[derive(Debug, Clone, PartialEq)]
pub struct TagDefinition {
    pub name: String,
    /// Type of the carried value; `None` for bare tags
    pub inner: Option<TypeSyntax>,
}

impl TagDefinition {
    /// A tag carrying no value
    pub fn bare<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            inner: None,
        }
    }

    /// A tag carrying a value of the given type
    pub fn carrying<S: Into<String>>(name: S, inner: TypeSyntax) -> Self {
        Self {
            name: name.into(),
            inner: Some(inner),
        }
    }
}

/// A tagged type declaration, e.g. `Optional(a) = None | Some(a)`
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedTypeDefinition {
    pub name: String,
    /// Type parameter names, referenced as [`TypeSyntax::Variable`]
    pub params: Vec<String>,
    /// Tags in declaration order; values order by tag index
    pub tags: Vec<TagDefinition>,
}

impl TaggedTypeDefinition {
    /// A fresh instance of this type: the tagged type over new variables,
    /// plus the parameter bindings for resolving tag inner types
    pub fn instantiate(&self, unifier: &mut Unifier) -> (TypeExpr, BTreeMap<String, TypeExpr>) {
        let bindings: BTreeMap<String, TypeExpr> = self
            .params
            .iter()
            .map(|p| (p.clone(), unifier.fresh()))
            .collect();
        let tagged = TypeExpr::Tagged {
            name: self.name.clone(),
            params: self.params.iter().map(|p| bindings[p].clone()).collect(),
        };
        (tagged, bindings)
    }

    /// Inner type of the tag at `index` under the given parameter bindings
    pub fn inner_type(
        &self,
        index: usize,
        bindings: &BTreeMap<String, TypeExpr>,
        units: &UnitCatalogue,
        types: &TypeCatalogue,
    ) -> Result<Option<TypeExpr>, TypeSyntaxError> {
        match self.tags.get(index).and_then(|t| t.inner.as_ref()) {
            Some(syntax) => syntax.resolve(units, types, bindings).map(Some),
            None => Ok(None),
        }
    }
}

/// The set of tagged types a check or evaluation can see
#[derive(Debug, Clone)]
pub struct TypeCatalogue {
    types: AHashMap<String, TaggedTypeDefinition>,
    // tag name -> (type name, tag index)
    tags: AHashMap<String, (String, usize)>,
}

impl TypeCatalogue {
    /// A catalogue with no types at all
    pub fn empty() -> Self {
        Self {
            types: AHashMap::new(),
            tags: AHashMap::new(),
        }
    }

    /// Declare a tagged type. Type names and tag names must be unique
    /// across the catalogue, since tags are referenced unqualified.
    pub fn declare_tagged(&mut self, definition: TaggedTypeDefinition) -> Result<(), DeclarationError> {
        if self.types.contains_key(&definition.name) {
            return Err(DeclarationError::DuplicateType(definition.name));
        }
        let mut seen: Vec<&str> = Vec::new();
        for tag in &definition.tags {
            if let Some((existing, _)) = self.tags.get(&tag.name) {
                return Err(DeclarationError::DuplicateTag {
                    tag: tag.name.clone(),
                    existing: existing.clone(),
                });
            }
            if seen.contains(&tag.name.as_str()) {
                return Err(DeclarationError::DuplicateTag {
                    tag: tag.name.clone(),
                    existing: definition.name.clone(),
                });
            }
            seen.push(&tag.name);
        }
        for (index, tag) in definition.tags.iter().enumerate() {
            self.tags
                .insert(tag.name.clone(), (definition.name.clone(), index));
        }
        self.types.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Look up a type by name
    pub fn get(&self, name: &str) -> Option<&TaggedTypeDefinition> {
        self.types.get(name)
    }

    /// Look up a tag by name: its type and declaration index
    pub fn tag(&self, name: &str) -> Option<(&TaggedTypeDefinition, usize)> {
        let (type_name, index) = self.tags.get(name)?;
        Some((self.types.get(type_name)?, *index))
    }

    /// All declarations, sorted by name
    pub fn definitions(&self) -> Vec<&TaggedTypeDefinition> {
        let mut all: Vec<_> = self.types.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}

impl Default for TypeCatalogue {
    fn default() -> Self {
        let builtin = [
            TaggedTypeDefinition {
                name: OPTIONAL_TYPE.to_string(),
                params: vec!["a".to_string()],
                tags: vec![
                    TagDefinition::bare("None"),
                    TagDefinition::carrying("Some", TypeSyntax::Variable("a".to_string())),
                ],
            },
            TaggedTypeDefinition {
                name: TYPE_TYPE.to_string(),
                params: vec!["t".to_string()],
                tags: vec![TagDefinition::bare(TYPE_TYPE)],
            },
        ];
        let mut catalogue = Self::empty();
        for definition in builtin {
            // Builtins have distinct names.
            let _ = catalogue.declare_tagged(definition);
        }
        catalogue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_optional() {
        let types = TypeCatalogue::default();
        let (def, index) = types.tag("Some").unwrap();
        assert_eq!(def.name, "Optional");
        assert_eq!(index, 1);

        let mut unifier = Unifier::new();
        let (tagged, bindings) = def.instantiate(&mut unifier);
        let inner = def
            .inner_type(index, &bindings, &UnitCatalogue::default(), &types)
            .unwrap()
            .unwrap();
        assert_eq!(tagged, TypeExpr::Tagged {
            name: "Optional".into(),
            params: vec![inner]
        });
    }

    #[test]
    fn test_duplicate_tags_rejected() {
        let mut types = TypeCatalogue::default();
        let clash = TaggedTypeDefinition {
            name: "Maybe".into(),
            params: vec![],
            tags: vec![TagDefinition::bare("None")],
        };
        assert_eq!(
            types.declare_tagged(clash),
            Err(DeclarationError::DuplicateTag {
                tag: "None".into(),
                existing: "Optional".into()
            })
        );

        let twice = TaggedTypeDefinition {
            name: "Colour".into(),
            params: vec![],
            tags: vec![TagDefinition::bare("Red"), TagDefinition::bare("Red")],
        };
        assert!(types.declare_tagged(twice).is_err());
        assert!(types.get("Colour").is_none());
    }
}
