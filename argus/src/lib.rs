//!# argus
//!
//! `argus` attaches type signatures written in docstrings to functions over dynamic values and
//! compiles them into argument and return checkers. A signature like
//!
//! ```text
//! file.lines( f, [count,] ... ) ==> string*
//! f : userdata
//! count : number
//! ... : string/number
//! ```
//!
//! is parsed out of the docstring, each parameter's type expression is translated to a
//! nondeterministic finite automaton whose transitions are labeled with *type predicates*
//! (pure tests over values), the per-parameter automata are joined into one automaton for the
//! whole argument list, the subset construction turns that into a DFA, and the DFA is
//! interpreted by a [Checker](checker::Checker) that either passes the values through or
//! rejects them with a message naming every type that would have been accepted at the point of
//! failure.
//!
//! ## Usage
//!
//! ```rust
//! use argus::decorate::{decorate, Config, HostFn};
//! use argus::registry::Registry;
//! use argus::value::Value;
//! use std::rc::Rc;
//!
//! let mut registry = Registry::new();
//! // The six primitive kinds are pre-registered; domain types are added as predicates.
//! registry
//!     .register("point", |v| v.field("x").is_some() && v.field("y").is_some())
//!     .unwrap();
//!
//! let norm: HostFn = Rc::new(|args| {
//!     let x = args[0].field("x");
//!     let y = args[0].field("y");
//!     match (x, y) {
//!         (Some(Value::Number(x)), Some(Value::Number(y))) => {
//!             Ok(vec![Value::Number((x * x + y * y).sqrt())])
//!         }
//!         _ => Ok(vec![Value::Nil]),
//!     }
//! });
//!
//! let norm = decorate(
//!     norm,
//!     "Length of a 2d vector.\n\
//!      \n\
//!      geo.norm( p ) ==> number\n\
//!      p : point",
//!     &registry,
//!     &Config::default(),
//! )
//! .unwrap();
//!
//! let p = Value::table_from([("x", Value::from(3)), ("y", Value::from(4))]);
//! assert_eq!(norm(&[p]).unwrap(), vec![Value::from(5)]);
//!
//! // Rejections name everything that would have been accepted:
//! let err = norm(&[Value::from(7)]).unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "geo.norm: point expected for argument no. 1 (got number)."
//! );
//! ```
//!
//! ## Pipeline
//!
//! * [parser] - extracts the structured [Signature](signature::Signature) from the first
//!   docstring paragraph matching the signature shape
//! * [nfa::build] - translates type expressions to NFAs over predicates and assembles the
//!   argument-list automaton (optional groups, vararg, implicit method receiver)
//! * [Nfa::to_dfa](nfa::Nfa::to_dfa) - subset construction, keyed by predicate identity
//! * [checker] - interprets the DFA over a value slice, in linear or backtracking mode
//! * [decorate] - ties it together and wraps host functions
//!
//! Registrations in the [Registry](registry::Registry) should happen up front: names are
//! resolved when a signature is compiled, and an unknown name is the build error
//! [UndefinedType](error::BuildError::UndefinedType) at that point, never a failure at call
//! time. Everything here is single-threaded and synchronous; checkers are immutable once
//! built and deterministic for fixed registry contents.

pub mod checker;
pub mod decorate;
pub mod dfa;
pub mod error;
pub mod nfa;
pub mod parser;
pub mod registry;
pub mod signature;
pub mod value;

#[cfg(test)]
mod tests;
