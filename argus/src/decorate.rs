//! # Decoration
//! The pipeline's entry points: [decorate] runs a docstring through parsing, automaton
//! construction and checker compilation, and wraps the underlying function so that every call
//! validates its arguments and every return validates its results. [check_args] and
//! [check_rets] build the two checkers stand-alone.
//!
//! ```
//! use argus::decorate::{decorate, Config, HostFn};
//! use argus::registry::Registry;
//! use argus::value::Value;
//! use std::rc::Rc;
//!
//! let registry = Registry::new();
//! let double: HostFn = Rc::new(|args| match args {
//!     [Value::Number(n)] => Ok(vec![Value::Number(n * 2.0)]),
//!     _ => Ok(vec![Value::Nil]),
//! });
//! let wrapped = decorate(
//!     double,
//!     "double( n ) ==> number\nn : number",
//!     &registry,
//!     &Config::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(wrapped(&[Value::from(21)]).unwrap(), vec![Value::from(42)]);
//! let err = wrapped(&[Value::from("x")]).unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "double: number expected for argument no. 1 (got string)."
//! );
//! ```
//!
//! Decoration is configured by a [Config] captured by value: reconfiguring afterwards affects
//! only later decorations, never already produced wrappers. Build failures go through
//! [ErrorHandling]: fatal by default, or reported to a callback, in which case decoration
//! degrades: whichever checker could not be built is skipped, and with no checkers at all the
//! function is returned unwrapped.

use crate::checker::{CheckError, CheckKind, Checker};
use crate::error::BuildError;
use crate::nfa::build;
use crate::parser;
use crate::registry::Registry;
use crate::signature::Signature;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// A host function: takes positional values, produces result values or a check error raised
/// from a nested call.
pub type HostFn = Rc<dyn Fn(&[Value]) -> Result<Vec<Value>, CheckError>>;

/// What to do with a build-time error during decoration.
#[derive(Clone)]
pub enum ErrorHandling {
    /// Fail decoration with the error. The default.
    Fatal,
    /// Pass the error to the callback and degrade: skip the checker that failed to build.
    Report(Rc<dyn Fn(&BuildError)>),
}

impl fmt::Debug for ErrorHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorHandling::Fatal => f.write_str("Fatal"),
            ErrorHandling::Report(_) => f.write_str("Report(..)"),
        }
    }
}

/// Decoration-time configuration, captured by value by [decorate].
#[derive(Clone, Debug)]
pub struct Config {
    /// If false, [decorate] returns the function untouched.
    pub enabled: bool,
    /// Build and apply the argument checker.
    pub check_arguments: bool,
    /// Build and apply the return checker (skipped anyway for signatures without return
    /// clauses).
    pub check_returns: bool,
    /// Opaque stack offset stored on every produced [CheckError], pointing the host's error
    /// facility at the caller.
    pub stack_offset: usize,
    /// Routing for build-time errors.
    pub on_build_error: ErrorHandling,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            enabled: true,
            check_arguments: true,
            check_returns: true,
            stack_offset: 1,
            on_build_error: ErrorHandling::Fatal,
        }
    }
}

/// Wraps `f` with the checkers built from `docstring`.
///
/// With both checkers present the wrapper validates arguments, calls `f`, and validates the
/// results; with only one, the other step is skipped; with neither (both disabled, or both
/// builds failed under [ErrorHandling::Report]), `f` itself is returned.
pub fn decorate(
    f: HostFn,
    docstring: &str,
    registry: &Registry,
    config: &Config,
) -> Result<HostFn, BuildError> {
    if !config.enabled {
        return Ok(f);
    }
    let signature = match parser::signature(docstring) {
        Ok(signature) => signature,
        Err(error) => {
            return match &config.on_build_error {
                ErrorHandling::Fatal => Err(error),
                ErrorHandling::Report(callback) => {
                    callback(&error);
                    Ok(f)
                }
            }
        }
    };

    let arg_checker = if config.check_arguments {
        match compile_args(&signature, registry, config.stack_offset) {
            Ok(checker) => Some(checker),
            Err(error) => match &config.on_build_error {
                ErrorHandling::Fatal => return Err(error),
                ErrorHandling::Report(callback) => {
                    callback(&error);
                    None
                }
            },
        }
    } else {
        None
    };

    let ret_checker = if config.check_returns && !signature.returns.is_empty() {
        match compile_rets(&signature, registry, config.stack_offset) {
            Ok(checker) => Some(checker),
            Err(error) => match &config.on_build_error {
                ErrorHandling::Fatal => return Err(error),
                ErrorHandling::Report(callback) => {
                    callback(&error);
                    None
                }
            },
        }
    } else {
        None
    };

    if arg_checker.is_none() && ret_checker.is_none() {
        return Ok(f);
    }

    Ok(Rc::new(move |args: &[Value]| {
        if let Some(checker) = &arg_checker {
            checker.check(args)?;
        }
        let rets = f(args)?;
        if let Some(checker) = &ret_checker {
            checker.check(&rets)?;
        }
        Ok(rets)
    }))
}

/// Builds the argument checker for a docstring. Used stand-alone and by tests.
pub fn check_args(docstring: &str, registry: &Registry) -> Result<Checker, BuildError> {
    let signature = parser::signature(docstring)?;
    compile_args(&signature, registry, 1)
}

/// Builds the return checker for a docstring. A signature without return clauses yields the
/// checker accepting exactly zero values.
pub fn check_rets(docstring: &str, registry: &Registry) -> Result<Checker, BuildError> {
    let signature = parser::signature(docstring)?;
    compile_rets(&signature, registry, 1)
}

fn compile_args(
    signature: &Signature,
    registry: &Registry,
    stack_offset: usize,
) -> Result<Checker, BuildError> {
    let dfa = build::assemble_args(signature, registry)?.to_dfa();
    // The implicit receiver must not shift user-visible argument numbering: it reports as
    // index 0, the first written argument stays no. 1.
    let index_offset = if signature.is_method { -1 } else { 0 };
    Ok(Checker::new(
        dfa,
        CheckKind::Argument,
        signature.error_prefix(),
        index_offset,
        stack_offset,
    ))
}

fn compile_rets(
    signature: &Signature,
    registry: &Registry,
    stack_offset: usize,
) -> Result<Checker, BuildError> {
    let dfa = build::assemble_returns(signature, registry)?.to_dfa();
    Ok(Checker::new(
        dfa,
        CheckKind::Return,
        signature.error_prefix(),
        0,
        stack_offset,
    ))
}
