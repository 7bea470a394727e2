//! Runtime values
//!
//! Values carry no unit: units are static type information and are checked
//! before evaluation. Numbers are exact decimals.

use crate::temporal::TemporalValue;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A value produced by evaluation or stored in a column
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Exact decimal number
    Number(Decimal),
    /// Text
    Text(String),
    /// Boolean
    Boolean(bool),
    /// Date / time
    Temporal(TemporalValue),
    /// Tagged-union instance
    Tagged(TaggedValue),
    /// Record, keyed by field name
    Record(BTreeMap<String, Value>),
    /// Array
    Array(Vec<Value>),
    /// Callable function (standard function or tag constructor)
    #[cfg_attr(feature = "serde", serde(skip))]
    Function(FunctionValue),
}

/// An instance of one tag of a tagged type
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaggedValue {
    /// Name of the tagged type
    pub type_name: String,
    /// Declaration index of the tag; tags order by this index
    pub tag_index: usize,
    /// Tag name
    pub tag: String,
    /// Inner value for tags that carry one
    pub inner: Option<Box<Value>>,
}

/// Failure reported by a function implementation (e.g. outside its domain)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct FunctionFailure(pub String);

impl FunctionFailure {
    /// Create a failure with a message
    pub fn new<S: Into<String>>(message: S) -> Self {
        FunctionFailure(message.into())
    }
}

/// A function that can be stored in a [`Value`] and called
pub trait ValueFunction: Send + Sync + fmt::Debug {
    /// Name used in messages and explanations
    fn name(&self) -> &str;

    /// Apply the function to already-evaluated arguments
    fn call(&self, args: &[Value]) -> Result<Value, FunctionFailure>;
}

/// Shared handle to a [`ValueFunction`]
#[derive(Debug, Clone)]
pub struct FunctionValue(pub Arc<dyn ValueFunction>);

impl FunctionValue {
    /// Wrap a function implementation
    pub fn new<F: ValueFunction + 'static>(function: F) -> Self {
        FunctionValue(Arc::new(function))
    }

    /// Function name
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Call the function
    pub fn call(&self, args: &[Value]) -> Result<Value, FunctionFailure> {
        self.0.call(args)
    }
}

impl Value {
    /// Create a text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        Value::Text(s.into())
    }

    /// Create a number from an integer
    pub fn int(n: i64) -> Self {
        Value::Number(Decimal::from(n))
    }

    /// Get the number, if this is one
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the boolean, if this is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the text, if this is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the array elements, if this is an array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::Temporal(_) => "temporal",
            Value::Tagged(_) => "tagged",
            Value::Record(_) => "record",
            Value::Array(_) => "array",
            Value::Function(_) => "function",
        }
    }
}

/// Value equality as the language sees it: numbers compare numerically
/// (`1.0 = 1`), compound values compare structurally, functions by identity.
pub fn value_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(&a.0, &b.0),
        _ => compare_values(left, right) == Some(Ordering::Equal),
    }
}

/// Total order over two values of the same type.
///
/// Returns `None` when the values have different shapes or either side is a
/// function; well-typed programs never compare those.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Temporal(a), Value::Temporal(b)) => {
            (a.kind() == b.kind()).then(|| a.cmp(b))
        }
        (Value::Tagged(a), Value::Tagged(b)) => {
            if a.type_name != b.type_name {
                return None;
            }
            match a.tag_index.cmp(&b.tag_index) {
                Ordering::Equal => match (&a.inner, &b.inner) {
                    (Some(x), Some(y)) => compare_values(x, y),
                    (None, None) => Some(Ordering::Equal),
                    _ => None,
                },
                other => Some(other),
            }
        }
        (Value::Record(a), Value::Record(b)) => {
            if a.len() != b.len() {
                return None;
            }
            for ((name_a, va), (name_b, vb)) in a.iter().zip(b.iter()) {
                if name_a != name_b {
                    return None;
                }
                match compare_values(va, vb)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(Ordering::Equal)
        }
        (Value::Array(a), Value::Array(b)) => {
            for (va, vb) in a.iter().zip(b.iter()) {
                match compare_values(va, vb)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(a.len().cmp(&b.len()))
        }
        _ => None,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        value_eq(self, other)
    }
}

impl fmt::Display for Value {
    /// Unit-free display for messages and explanations. Literal rendering
    /// that round-trips (with units) needs the value's type and lives in
    /// the expression crate.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n.normalize()),
            Value::Text(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Temporal(t) => write!(f, "{}{{{}}}", t.kind().keyword(), t),
            Value::Tagged(tagged) => match &tagged.inner {
                Some(inner) => write!(f, "{}({})", tagged.tag, inner),
                None => write!(f, "{}", tagged.tag),
            },
            Value::Record(fields) => {
                write!(f, "(")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, ")")
            }
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Function(func) => write!(f, "<function {}>", func.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::int(n)
    }
}

impl From<Decimal> for Value {
    fn from(n: Decimal) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<TemporalValue> for Value {
    fn from(t: TemporalValue) -> Self {
        Value::Temporal(t)
    }
}
