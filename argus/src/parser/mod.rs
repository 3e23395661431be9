//! # Signature parser
//! This module extracts a [Signature](crate::signature::Signature) from a docstring. The
//! docstring is scanned paragraph by paragraph (a paragraph boundary is one blank line, i.e.
//! `\n\n` with nothing else between); the first paragraph matching the signature shape is
//! taken, and earlier non-matching paragraphs are discarded. Comments of the form `-- …` up to
//! the end of the line count as whitespace everywhere inside a signature paragraph.
//!
//! ## Format
//! A signature paragraph consists of, in order:
//! - The *designator*: an identifier, optionally followed by `.identifier` segments, optionally
//!   ending in a single `:identifier` which marks the function as a method.
//! - The parameter list in parentheses. Items are identifiers, bracketed groups (an optional
//!   subsequence of parameters, which may nest), or `...` as the final item for a vararg.
//!   Commas between items are optional, and a group may keep its separating comma inside the
//!   bracket: `f( a [, b] )`.
//! - Zero or more return clauses, each an arrow (`=>` with any number of `=`) followed by a
//!   type expression. Multiple clauses are alternative return shapes.
//! - Zero or more mapping lines, `name : type` for a parameter or `... : type` for the vararg.
//!   The right-hand side of a named mapping is restricted to an alternation of plain type
//!   names (`number/boolean`); the vararg admits a full type expression.
//!
//! Type expressions are a regular algebra over type names: `,` sequences, `/` alternates
//! (binding tighter than `,`), and the postfix operators `*` (zero or more) and `?` (zero or
//! one) bind tightest. Parentheses group: `((table, string/number) / boolean)*`.
//!
//! A parameter without a mapping line is its own type name, so `f( number )` checks its one
//! argument with the registered `number` predicate. Whether such a name actually resolves is
//! decided when the automaton is built, not here.
//!
//! ## Example
//! ```
//! use argus::parser;
//!
//! let sig = parser::signature(
//!     "Reads from a handle.\n\
//!      \n\
//!      io.read( f, [fmt,] ... ) ==> string/nil -- may fail\n\
//!      f : userdata\n\
//!      fmt : string/number\n\
//!      ... : string/number",
//! )
//! .unwrap();
//! assert_eq!(sig.designator, "io.read");
//! assert_eq!(sig.returns.len(), 1);
//! assert_eq!(sig.param_types.len(), 3);
//!
//! // A docstring without any signature paragraph:
//! assert!(parser::signature("just prose here").is_err());
//! ```

mod sig;

use crate::error::BuildError;
use crate::signature::{ParamNode, Signature};
use nom::combinator::all_consuming;
use nom::Finish;
use std::collections::HashSet;
use std::rc::Rc;

/// Extracts the signature from a docstring.
///
/// The first paragraph matching the signature shape wins. A paragraph that merely *starts*
/// like a signature (a designator followed by `(`) but fails to parse is remembered; if no
/// later paragraph matches, the result is
/// [MalformedSignature](BuildError::MalformedSignature) pointing at it, and if no paragraph
/// ever looked like a signature, [NoSignature](BuildError::NoSignature).
pub fn signature(docstring: &str) -> Result<Signature, BuildError> {
    let mut malformed: Option<BuildError> = None;
    let mut offset = 0usize;
    for paragraph in docstring.split("\n\n") {
        if sig::probe(paragraph) {
            match parse_paragraph(paragraph, offset) {
                Ok(signature) => return Ok(signature),
                Err(error @ BuildError::ParamRedefined(_)) => return Err(error),
                Err(error) => {
                    if malformed.is_none() {
                        malformed = Some(error);
                    }
                }
            }
        }
        offset += paragraph.len() + 2;
    }
    Err(malformed.unwrap_or(BuildError::NoSignature))
}

fn parse_paragraph(paragraph: &str, offset: usize) -> Result<Signature, BuildError> {
    let raw = match all_consuming(sig::full_signature)(paragraph).finish() {
        Ok((_, raw)) => raw,
        Err(error) => {
            let consumed = paragraph.len() - error.input.len();
            let near: String = error.input.chars().take(24).collect();
            return Err(BuildError::MalformedSignature {
                pos: offset + consumed,
                reason: format!("cannot parse signature near '{}'", near.trim_end()),
            });
        }
    };

    // Each parameter may be mapped at most once; this covers `...` as well.
    let mut seen: HashSet<Rc<str>> = HashSet::new();
    for (name, _) in &raw.mappings {
        if !seen.insert(name.clone()) {
            return Err(BuildError::ParamRedefined(name.to_string()));
        }
    }

    if let Some(reason) = vararg_misplaced(&raw.params, true) {
        return Err(BuildError::MalformedSignature {
            pos: offset,
            reason: reason.to_string(),
        });
    }

    let mut params = raw.params;
    if let Some(expr) = raw
        .mappings
        .iter()
        .find(|(name, _)| name.as_ref() == "...")
        .map(|(_, expr)| expr.clone())
    {
        if let Some(ParamNode::Vararg(slot)) = params.last_mut() {
            *slot = expr;
        }
    }

    Ok(Signature {
        designator: raw.designator,
        is_method: raw.is_method,
        params,
        returns: raw.returns,
        param_types: raw.mappings,
        raw_text: paragraph.to_string(),
    })
}

// A vararg is only allowed as the final item of the top-level list.
fn vararg_misplaced(params: &[ParamNode], top: bool) -> Option<&'static str> {
    for (idx, node) in params.iter().enumerate() {
        match node {
            ParamNode::Vararg(_) => {
                if !top {
                    return Some("vararg inside an optional group");
                }
                if idx + 1 != params.len() {
                    return Some("vararg must be the final parameter");
                }
            }
            ParamNode::Group(children) => {
                if let Some(reason) = vararg_misplaced(children, false) {
                    return Some(reason);
                }
            }
            ParamNode::Named(_) => {}
        }
    }
    None
}
