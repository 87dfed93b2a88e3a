//! The closed runtime value system.

use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use crate::diagnostics::DslError;
use crate::runtime::procedure::Procedure;

/// Every value a script can produce or a host can bind.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    String(String),
    Procedure(Procedure),
    UserData(UserData),
}

/// Tag of a [`Value`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Int,
    Uint,
    Float,
    Bool,
    String,
    Nil,
    Procedure,
    UserData,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Uint => "uint",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::String => "string",
            ValueType::Nil => "nil",
            ValueType::Procedure => "procedure",
            ValueType::UserData => "userdata",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Nil => ValueType::Nil,
            Value::Int(_) => ValueType::Int,
            Value::Uint(_) => ValueType::Uint,
            Value::Float(_) => ValueType::Float,
            Value::Bool(_) => ValueType::Bool,
            Value::String(_) => ValueType::String,
            Value::Procedure(_) => ValueType::Procedure,
            Value::UserData(_) => ValueType::UserData,
        }
    }

    /// Shorthand for `value_type().as_str()`, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.value_type().as_str()
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::Uint(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_procedure(&self) -> Option<&Procedure> {
        match self {
            Value::Procedure(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_user_data(&self) -> Option<&UserData> {
        match self {
            Value::UserData(u) => Some(u),
            _ => None,
        }
    }

    /// Resolves one dotted path segment. Only selectable user data supports this.
    pub fn select(&self, key: &str) -> Result<Value, SelectError> {
        match self {
            Value::UserData(data) if data.is_selectable() => {
                data.select(key).ok_or(SelectError::NotFound)
            }
            _ => Err(SelectError::NotIndexable),
        }
    }
}

/// Why a dotted path segment could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectError {
    NotIndexable,
    NotFound,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Procedure(a), Value::Procedure(b)) => a.ptr_eq(b),
            (Value::UserData(a), Value::UserData(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Uint(u) => write!(f, "{u}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Procedure(_) => write!(f, "<procedure>"),
            Value::UserData(u) => write!(f, "<userdata {}>", u.type_name()),
        }
    }
}

// ============================================================================
// USER DATA
// ============================================================================

type SelectFn = fn(&(dyn Any + Send + Sync), &str) -> Option<Value>;

/// Path selection for opaque host values, used by `a.b.c` in scripts.
pub trait Selector {
    fn select(&self, key: &str) -> Option<Value>;
}

impl Selector for HashMap<String, Value> {
    fn select(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

impl Selector for BTreeMap<String, Value> {
    fn select(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

fn select_as<T: Selector + 'static>(any: &(dyn Any + Send + Sync), key: &str) -> Option<Value> {
    any.downcast_ref::<T>()?.select(key)
}

/// An opaque, shared host payload.
///
/// Cloning shares the payload. Two `UserData` are equal only if they share it.
#[derive(Clone)]
pub struct UserData {
    inner: Arc<dyn Any + Send + Sync>,
    select: Option<SelectFn>,
    type_name: &'static str,
}

impl UserData {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            select: None,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Wraps a value that resolves dotted path segments through its [`Selector`] impl.
    pub fn selectable<T: Selector + Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            select: Some(select_as::<T>),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn is_selectable(&self) -> bool {
        self.select.is_some()
    }

    pub fn select(&self, key: &str) -> Option<Value> {
        let select = self.select?;
        select(self.inner.as_ref(), key)
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn ptr_eq(&self, other: &UserData) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserData")
            .field("type", &self.type_name)
            .field("selectable", &self.is_selectable())
            .finish()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

macro_rules! impl_from {
    ($($host:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$host> for Value {
                fn from(v: $host) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    i64 => Int,
    i32 => Int,
    u64 => Uint,
    u32 => Uint,
    f64 => Float,
    f32 => Float,
    bool => Bool,
    String => String,
    &str => String,
    Procedure => Procedure,
    UserData => UserData,
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

fn type_mismatch(expected: ValueType, got: &Value) -> DslError {
    DslError::custom(format!(
        "expecting {expected} value, but got {}",
        got.type_name()
    ))
}

macro_rules! impl_try_from {
    ($($host:ty => $variant:ident),* $(,)?) => {
        $(
            impl TryFrom<Value> for $host {
                type Error = DslError;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(type_mismatch(ValueType::$variant, &other)),
                    }
                }
            }
        )*
    };
}

impl_try_from! {
    i64 => Int,
    u64 => Uint,
    f64 => Float,
    bool => Bool,
    String => String,
    Procedure => Procedure,
    UserData => UserData,
}
