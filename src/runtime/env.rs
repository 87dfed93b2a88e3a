//! Identifier bindings for one scope.

use im::HashMap;

use crate::diagnostics::DslError;
use crate::runtime::{Procedure, UserData, Value};

/// Maps identifiers to values.
///
/// Backed by a persistent map: `clone` is cheap and the copy is independent of the
/// original, so a shared base environment can be cloned and extended per evaluation.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `id` to `value`, replacing any previous binding in this scope.
    pub fn with_value(mut self, id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.define(id, value);
        self
    }

    /// Like [`with_value`](Self::with_value), but an absent value is an error; bind
    /// [`Value::Nil`] explicitly to bind nothing.
    pub fn try_with_value(
        self,
        id: impl Into<String>,
        value: Option<Value>,
    ) -> Result<Self, DslError> {
        let id = id.into();
        match value {
            Some(value) => Ok(self.with_value(id, value)),
            None => Err(DslError::EmptyBinding { id }),
        }
    }

    pub fn with_int(self, id: impl Into<String>, value: i64) -> Self {
        self.with_value(id, Value::Int(value))
    }

    pub fn with_uint(self, id: impl Into<String>, value: u64) -> Self {
        self.with_value(id, Value::Uint(value))
    }

    pub fn with_float(self, id: impl Into<String>, value: f64) -> Self {
        self.with_value(id, Value::Float(value))
    }

    pub fn with_bool(self, id: impl Into<String>, value: bool) -> Self {
        self.with_value(id, Value::Bool(value))
    }

    pub fn with_string(self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_value(id, Value::String(value.into()))
    }

    pub fn with_nil(self, id: impl Into<String>) -> Self {
        self.with_value(id, Value::Nil)
    }

    pub fn with_procedure(self, id: impl Into<String>, procedure: Procedure) -> Self {
        self.with_value(id, Value::Procedure(procedure))
    }

    pub fn with_user_data(self, id: impl Into<String>, data: UserData) -> Self {
        self.with_value(id, Value::UserData(data))
    }

    pub fn define(&mut self, id: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(id.into(), value.into());
    }

    pub fn lookup(&self, id: &str) -> Option<&Value> {
        self.bindings.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.bindings.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = Environment::new();
        for (id, value) in iter {
            env.define(id, value);
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fluent_builders_bind_each_variant() {
        let env = Environment::new()
            .with_int("i", -1)
            .with_uint("u", 1)
            .with_float("f", 0.5)
            .with_bool("b", true)
            .with_string("s", "text")
            .with_nil("n")
            .with_user_data("d", UserData::new(7u8))
            .with_procedure("p", Procedure::new(|_, _, _| Ok(Value::Nil)));
        assert_eq!(env.len(), 8);
        assert_eq!(env.lookup("i"), Some(&Value::Int(-1)));
        assert_eq!(env.lookup("s").and_then(Value::as_str), Some("text"));
        assert!(env.lookup("n").is_some_and(Value::is_nil));
        assert!(env.lookup("missing").is_none());
    }

    #[test]
    fn redefinition_overwrites() {
        let env = Environment::new().with_int("x", 1).with_int("x", 2);
        assert_eq!(env.len(), 1);
        assert_eq!(env.lookup("x"), Some(&Value::Int(2)));
    }

    #[test]
    fn clone_is_independent() {
        let base = Environment::new().with_int("x", 1);
        let mut copy = base.clone();
        copy.define("y", 2i64);
        copy.define("x", 10i64);
        assert!(!base.contains("y"));
        assert_eq!(base.lookup("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn absent_payload_is_rejected() {
        let err = Environment::new().try_with_value("x", None).unwrap_err();
        assert!(matches!(err, DslError::EmptyBinding { ref id } if id == "x"));
        assert!(Environment::new().try_with_value("x", Some(Value::Nil)).is_ok());
    }

    #[test]
    fn collects_from_pairs() {
        let env: Environment = [("a", 1i64), ("b", 2i64)].into_iter().collect();
        let mut ids: Vec<&str> = env.identifiers().collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
