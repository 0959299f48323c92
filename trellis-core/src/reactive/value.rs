//! Values
//!
//! [`Plain`] is unwrapped data as the application hands it over. [`Value`] is
//! what the runtime stores and returns: scalars stay scalars, structurally
//! mutable containers become [`Tracked`] handles. Wrapping only makes sense
//! for containers; everything else (including [`Plain::Opaque`] values with an
//! external identity) passes through untouched.
//!
//! [`ValueKey`] is the hashable identity of a value. Scalars key by type and
//! value (so `1` and `"1"` differ), containers and opaque values by reference.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::tracked::{Tracked, TrackedKind};

/// A runtime value: a scalar, a tracked container, or an opaque passthrough.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(Tracked),
    Opaque(Rc<dyn Any>),
}

/// Unwrapped data.
#[derive(Clone, Default)]
pub enum Plain {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Record(IndexMap<String, Plain>),
    Array(Vec<Plain>),
    Map(Vec<(Plain, Plain)>),
    Set(Vec<Plain>),
    /// A value with an external identity, never wrapped.
    Opaque(Rc<dyn Any>),
    /// An already-wrapped container; wrapping it again returns it unchanged.
    Tracked(Tracked),
}

/// Hashable identity of a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Undefined,
    Null,
    Bool(bool),
    Number(u64),
    String(Rc<str>),
    Object(usize),
    Opaque(usize),
}

fn number_key(n: f64) -> u64 {
    if n.is_nan() {
        f64::NAN.to_bits()
    } else if n == 0.0 {
        0.0f64.to_bits()
    } else {
        n.to_bits()
    }
}

fn opaque_addr(value: &Rc<dyn Any>) -> usize {
    Rc::as_ptr(value) as *const () as usize
}

impl Value {
    /// Identity comparison used to suppress no-op writes.
    ///
    /// Containers and opaque values compare by reference, scalars by value.
    /// `NaN` is the same as `NaN`, and `0.0` the same as `-0.0`.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Opaque(a), Value::Opaque(b)) => opaque_addr(a) == opaque_addr(b),
            _ => false,
        }
    }

    pub fn key(&self) -> ValueKey {
        match self {
            Value::Undefined => ValueKey::Undefined,
            Value::Null => ValueKey::Null,
            Value::Bool(b) => ValueKey::Bool(*b),
            Value::Number(n) => ValueKey::Number(number_key(*n)),
            Value::String(s) => ValueKey::String(s.clone()),
            Value::Object(t) => ValueKey::Object(t.addr()),
            Value::Opaque(o) => ValueKey::Opaque(opaque_addr(o)),
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Truthiness as used by conditional bindings.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) | Value::Opaque(_) => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Tracked> {
        match self {
            Value::Object(t) => Some(t),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(t) => t.kind().name(),
            Value::Opaque(_) => "opaque",
        }
    }

    /// Text form used by text interpolation bindings.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined | Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.to_string(),
            Value::Object(t) => match t.kind() {
                TrackedKind::Array => t
                    .items()
                    .iter()
                    .map(Value::to_display_string)
                    .collect::<Vec<_>>()
                    .join(","),
                kind => format!("[object {}]", kind.name()),
            },
            Value::Opaque(_) => "[opaque]".to_string(),
        }
    }

    /// Aggregate mutation version of this value and its children, down to
    /// `depth` levels. Scalars report 0.
    pub fn deep_version(&self, depth: usize) -> u64 {
        match self {
            Value::Object(t) => t.deep_version(depth),
            _ => 0,
        }
    }

    /// Recover the unwrapped form. Reads are untracked. Cycles are cut: a
    /// container met again on the current path becomes `Plain::Undefined`.
    pub fn to_plain(&self) -> Plain {
        let mut path = HashSet::new();
        self.to_plain_inner(&mut path)
    }

    pub(crate) fn to_plain_inner(&self, path: &mut HashSet<usize>) -> Plain {
        match self {
            Value::Undefined => Plain::Undefined,
            Value::Null => Plain::Null,
            Value::Bool(b) => Plain::Bool(*b),
            Value::Number(n) => Plain::Number(*n),
            Value::String(s) => Plain::String(s.to_string()),
            Value::Opaque(o) => Plain::Opaque(o.clone()),
            Value::Object(t) => t.to_plain_inner(path),
        }
    }

    /// JSON view of the value. Non-JSON data maps to the nearest JSON shape:
    /// sets become arrays, map keys are stringified, opaque values are null.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_plain().to_json()
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Object(t) => write!(f, "{t:?}"),
            Value::Opaque(o) => write!(f, "Opaque({:#x})", opaque_addr(o)),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::String(s)
    }
}

impl From<Tracked> for Value {
    fn from(t: Tracked) -> Self {
        Value::Object(t)
    }
}

// ----------------------------------------------------------------------------
// Plain data
// ----------------------------------------------------------------------------

impl Plain {
    /// Wrap an external-identity value so it passes through untouched.
    pub fn opaque<T: Any>(value: T) -> Self {
        Plain::Opaque(Rc::new(value))
    }

    /// Key this plain value would have once wrapped, if it can be known
    /// without wrapping. Fresh containers have no identity yet.
    pub(crate) fn lookup_key(&self) -> Option<ValueKey> {
        Some(match self {
            Plain::Undefined => ValueKey::Undefined,
            Plain::Null => ValueKey::Null,
            Plain::Bool(b) => ValueKey::Bool(*b),
            Plain::Number(n) => ValueKey::Number(number_key(*n)),
            Plain::String(s) => ValueKey::String(s.as_str().into()),
            Plain::Opaque(o) => ValueKey::Opaque(opaque_addr(o)),
            Plain::Tracked(t) => ValueKey::Object(t.addr()),
            Plain::Record(_) | Plain::Array(_) | Plain::Map(_) | Plain::Set(_) => return None,
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Plain::Undefined | Plain::Null | Plain::Opaque(_) => Json::Null,
            Plain::Bool(b) => Json::Bool(*b),
            Plain::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 9.0e15 {
                    Json::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(Json::Number)
                        .unwrap_or(Json::Null)
                }
            }
            Plain::String(s) => Json::String(s.clone()),
            Plain::Record(fields) => Json::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Plain::Array(items) | Plain::Set(items) => {
                Json::Array(items.iter().map(Plain::to_json).collect())
            }
            Plain::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (plain_key_string(k), v.to_json()))
                    .collect(),
            ),
            Plain::Tracked(t) => Value::Object(t.clone()).to_json(),
        }
    }
}

fn plain_key_string(key: &Plain) -> String {
    match key {
        Plain::String(s) => s.clone(),
        Plain::Number(n) => format_number(*n),
        Plain::Bool(b) => b.to_string(),
        Plain::Null => "null".to_string(),
        other => other.to_json().to_string(),
    }
}

impl fmt::Debug for Plain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plain::Opaque(o) => write!(f, "Opaque({:#x})", opaque_addr(o)),
            Plain::Tracked(t) => write!(f, "{t:?}"),
            Plain::Map(entries) => f.debug_map().entries(entries.iter().map(|(k, v)| (k, v))).finish(),
            Plain::Set(items) => f.debug_set().entries(items).finish(),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<serde_json::Value> for Plain {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Plain::Null,
            Json::Bool(b) => Plain::Bool(b),
            Json::Number(n) => Plain::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Plain::String(s),
            Json::Array(items) => Plain::Array(items.into_iter().map(Plain::from).collect()),
            Json::Object(fields) => Plain::Record(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Plain::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for Plain {
    /// Keeps identity: tracked containers are carried as `Plain::Tracked`.
    fn from(value: Value) -> Self {
        match value {
            Value::Undefined => Plain::Undefined,
            Value::Null => Plain::Null,
            Value::Bool(b) => Plain::Bool(b),
            Value::Number(n) => Plain::Number(n),
            Value::String(s) => Plain::String(s.to_string()),
            Value::Object(t) => Plain::Tracked(t),
            Value::Opaque(o) => Plain::Opaque(o),
        }
    }
}

impl From<&Value> for Plain {
    fn from(value: &Value) -> Self {
        Plain::from(value.clone())
    }
}

impl From<Tracked> for Plain {
    fn from(t: Tracked) -> Self {
        Plain::Tracked(t)
    }
}

impl From<bool> for Plain {
    fn from(b: bool) -> Self {
        Plain::Bool(b)
    }
}

impl From<f64> for Plain {
    fn from(n: f64) -> Self {
        Plain::Number(n)
    }
}

impl From<i32> for Plain {
    fn from(n: i32) -> Self {
        Plain::Number(n as f64)
    }
}

impl From<i64> for Plain {
    fn from(n: i64) -> Self {
        Plain::Number(n as f64)
    }
}

impl From<usize> for Plain {
    fn from(n: usize) -> Self {
        Plain::Number(n as f64)
    }
}

impl From<&str> for Plain {
    fn from(s: &str) -> Self {
        Plain::String(s.to_string())
    }
}

impl From<String> for Plain {
    fn from(s: String) -> Self {
        Plain::String(s)
    }
}

impl<T: Into<Plain>> From<Vec<T>> for Plain {
    fn from(items: Vec<T>) -> Self {
        Plain::Array(items.into_iter().map(Into::into).collect())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
