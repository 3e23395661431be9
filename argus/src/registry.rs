//! # Predicate registry
//! A [Registry] maps type names to predicates: pure unary tests over [Value]s. A fresh registry
//! knows the six primitive kinds (`nil`, `boolean`, `number`, `string`, `table`, `userdata`),
//! each testing for the corresponding value kind. Callers add their own types with
//! [Registry::register]; a registered type may then be used in any signature, just like a
//! primitive one:
//!
//! ```
//! use argus::registry::Registry;
//! use argus::value::Value;
//!
//! let mut registry = Registry::new();
//! registry
//!     .register("positive", |v| matches!(v, Value::Number(n) if *n > 0.0))
//!     .unwrap();
//! assert!(registry.contains("positive"));
//! assert!(registry.contains("number")); // primitive
//! assert!(!registry.contains("vector"));
//! ```
//!
//! All registrations should happen before signatures referencing them are compiled: a type is
//! resolved once, when the signature's automaton is built, and a missing entry is the build
//! error [UndefinedType](crate::error::BuildError::UndefinedType) at that point. Checkers keep
//! the predicates they were built with; re-registering a name affects later builds only.
//!
//! Predicates are compared by identity, not by name. Two predicates registered under the same
//! name at different times are distinct transitions to the automata built from them.

use crate::error::BuildError;
use crate::value::Value;
use std::collections::HashMap;
use std::rc::Rc;

/// A pure test over a single value. No side effects; identity of the allocation is significant.
pub type Predicate = Rc<dyn Fn(&Value) -> bool>;

/// Stable identity of a predicate, used to key DFA transitions.
pub(crate) fn predicate_id(predicate: &Predicate) -> usize {
    Rc::as_ptr(predicate) as *const () as usize
}

/// Checks the identifier grammar for type and parameter names.
pub(crate) fn is_type_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

struct Entry {
    predicate: Predicate,
    primitive: bool,
}

/// A named mapping from type names to predicates.
pub struct Registry {
    entries: HashMap<Rc<str>, Entry>,
}

impl Registry {
    /// A registry with the six primitive kind predicates pre-registered.
    pub fn new() -> Self {
        let mut registry = Registry {
            entries: HashMap::new(),
        };
        let primitives: [(&str, Predicate); 6] = [
            ("nil", Rc::new(|v: &Value| matches!(v, Value::Nil))),
            ("boolean", Rc::new(|v: &Value| matches!(v, Value::Boolean(_)))),
            ("number", Rc::new(|v: &Value| matches!(v, Value::Number(_)))),
            ("string", Rc::new(|v: &Value| matches!(v, Value::Str(_)))),
            ("table", Rc::new(|v: &Value| matches!(v, Value::Table(_)))),
            ("userdata", Rc::new(|v: &Value| matches!(v, Value::Userdata(_)))),
        ];
        for (name, predicate) in primitives {
            registry.entries.insert(
                Rc::from(name),
                Entry {
                    predicate,
                    primitive: true,
                },
            );
        }
        registry
    }

    /// Adds or replaces a user type. The name must match the identifier grammar
    /// `[A-Za-z_][A-Za-z0-9_]*`.
    pub fn register(
        &mut self,
        name: &str,
        predicate: impl Fn(&Value) -> bool + 'static,
    ) -> Result<(), BuildError> {
        if !is_type_name(name) {
            return Err(BuildError::InvalidTypeName(name.to_string()));
        }
        self.entries.insert(
            Rc::from(name),
            Entry {
                predicate: Rc::new(predicate),
                primitive: false,
            },
        );
        Ok(())
    }

    /// Checks whether a type name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Resolves a name to its predicate and whether the entry is primitive.
    pub(crate) fn resolve(&self, name: &str) -> Option<(Predicate, bool)> {
        self.entries
            .get(name)
            .map(|entry| (entry.predicate.clone(), entry.primitive))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
