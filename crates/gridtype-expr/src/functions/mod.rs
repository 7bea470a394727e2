//! Standard functions
//!
//! Each [`FunctionDefinition`] pairs a signature builder, which instantiates
//! fresh type and unit variables for every use site, with a plain
//! implementation over already-evaluated arguments.

pub mod date;
pub mod info;
pub mod list;
pub mod logical;
pub mod math;
pub mod text;

use crate::error::DeclarationError;
use crate::types::{TypeClass, TypeExpr, Unifier};
use ahash::AHashMap;
use gridtype_core::{Decimal, FunctionFailure, FunctionValue, Value, ValueFunction};
use std::fmt;
use std::sync::OnceLock;

static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// The shared registry of builtin functions
pub fn registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// An instantiated function type with its type-class requirements
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub args: Vec<TypeExpr>,
    pub result: TypeExpr,
    pub requirements: Vec<(TypeExpr, TypeClass)>,
}

impl FunctionSignature {
    /// Signature with no requirements
    pub fn new(args: Vec<TypeExpr>, result: TypeExpr) -> Self {
        Self {
            args,
            result,
            requirements: Vec::new(),
        }
    }

    /// Add a type-class requirement
    pub fn requiring(mut self, ty: TypeExpr, class: TypeClass) -> Self {
        self.requirements.push((ty, class));
        self
    }

    /// The signature as a function type
    pub fn function_type(&self) -> TypeExpr {
        TypeExpr::Function {
            args: self.args.clone(),
            result: Box::new(self.result.clone()),
        }
    }
}

/// Builds a signature with fresh variables from the session's unifier
pub type SignatureFn = fn(&mut Unifier) -> FunctionSignature;

/// Function implementation signature
pub type FunctionImpl = fn(&[Value]) -> Result<Value, FunctionFailure>;

/// Function definition
#[derive(Clone, Copy)]
pub struct FunctionDefinition {
    /// Name used in expressions
    pub name: &'static str,
    /// Grouping for listings
    pub namespace: &'static str,
    pub description: &'static str,
    pub signature: SignatureFn,
    pub implementation: FunctionImpl,
}

impl FunctionDefinition {
    /// Signature with fresh variables
    pub fn instantiate(&self, unifier: &mut Unifier) -> FunctionSignature {
        (self.signature)(unifier)
    }

    /// Runtime value of the function
    pub fn to_value(&self) -> Value {
        Value::Function(FunctionValue::new(BuiltinFunction {
            name: self.name,
            implementation: self.implementation,
        }))
    }
}

impl fmt::Debug for FunctionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDefinition")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// A builtin function as a runtime value
struct BuiltinFunction {
    name: &'static str,
    implementation: FunctionImpl,
}

impl fmt::Debug for BuiltinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuiltinFunction({})", self.name)
    }
}

impl ValueFunction for BuiltinFunction {
    fn name(&self) -> &str {
        self.name
    }

    fn call(&self, args: &[Value]) -> Result<Value, FunctionFailure> {
        (self.implementation)(args)
    }
}

/// Resolves function names for the checker and evaluator
pub trait FunctionLookup {
    fn lookup_function(&self, name: &str) -> Option<&FunctionDefinition>;

    /// All functions, sorted by namespace then name
    fn definitions(&self) -> Vec<&FunctionDefinition>;
}

/// Function registry
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: AHashMap<&'static str, FunctionDefinition>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for definition in math::definitions()
            .into_iter()
            .chain(list::definitions())
            .chain(text::definitions())
            .chain(logical::definitions())
            .chain(date::definitions())
            .chain(info::definitions())
        {
            // Builtin names are distinct.
            let _ = registry.register(definition);
        }
        registry
    }

    /// A registry with no functions
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Register a function
    pub fn register(&mut self, definition: FunctionDefinition) -> Result<(), DeclarationError> {
        if self.functions.contains_key(definition.name) {
            return Err(DeclarationError::DuplicateFunction(definition.name.to_string()));
        }
        self.functions.insert(definition.name, definition);
        Ok(())
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionLookup for FunctionRegistry {
    fn lookup_function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.get(name)
    }

    fn definitions(&self) -> Vec<&FunctionDefinition> {
        let mut all: Vec<_> = self.functions.values().collect();
        all.sort_by_key(|d| (d.namespace, d.name));
        all
    }
}

// === Argument helpers ===
//
// Arguments are already type-checked; a wrong shape here means the caller
// bypassed the checker.

fn arg<'a>(args: &'a [Value], index: usize) -> Result<&'a Value, FunctionFailure> {
    args.get(index)
        .ok_or_else(|| FunctionFailure::new(format!("missing argument {}", index + 1)))
}

pub(crate) fn number_arg(args: &[Value], index: usize) -> Result<Decimal, FunctionFailure> {
    let value = arg(args, index)?;
    value.as_number().ok_or_else(|| {
        FunctionFailure::new(format!("expected number, got {}", value.type_name()))
    })
}

pub(crate) fn text_arg(args: &[Value], index: usize) -> Result<&str, FunctionFailure> {
    let value = arg(args, index)?;
    value
        .as_text()
        .ok_or_else(|| FunctionFailure::new(format!("expected text, got {}", value.type_name())))
}

pub(crate) fn bool_arg(args: &[Value], index: usize) -> Result<bool, FunctionFailure> {
    let value = arg(args, index)?;
    value.as_bool().ok_or_else(|| {
        FunctionFailure::new(format!("expected boolean, got {}", value.type_name()))
    })
}

pub(crate) fn array_arg(args: &[Value], index: usize) -> Result<&[Value], FunctionFailure> {
    let value = arg(args, index)?;
    value
        .as_array()
        .ok_or_else(|| FunctionFailure::new(format!("expected array, got {}", value.type_name())))
}

pub(crate) fn any_arg(args: &[Value], index: usize) -> Result<&Value, FunctionFailure> {
    arg(args, index)
}
