//! Errors produced while turning a docstring into a checker. Check-time errors live in
//! [checker](crate::checker); everything that can go wrong *before* a checker exists is a
//! [BuildError].

use thiserror::Error;

/// An error raised while building a checker from a docstring. Build errors are routed to the
/// configured [ErrorHandling](crate::decorate::ErrorHandling); they never surface at check time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    /// No paragraph of the docstring matched the signature shape.
    #[error("no signature found in docstring")]
    NoSignature,
    /// A paragraph looked like a signature but did not parse. `pos` is a byte offset into the
    /// docstring; `reason` is a best-effort description of where parsing stopped.
    #[error("malformed signature at offset {pos}: {reason}")]
    MalformedSignature { pos: usize, reason: String },
    /// The same parameter name appeared in more than one mapping line.
    #[error("type of parameter '{0}' defined twice")]
    ParamRedefined(String),
    /// The same parameter name appeared more than once in the parameter list.
    #[error("parameter '{0}' used twice in parameter list")]
    DuplicateParamUse(String),
    /// A type name was referenced that is not in the predicate registry.
    #[error("undefined type '{0}'")]
    UndefinedType(String),
    /// A name passed to [register](crate::registry::Registry::register) does not match the
    /// identifier grammar.
    #[error("'{0}' is not a valid type name")]
    InvalidTypeName(String),
}
