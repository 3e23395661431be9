//! # Signatures
//! The structured form of a docstring signature, as produced by the
//! [parser](crate::parser). A [Signature] has a designator (the dotted, possibly
//! colon-terminated path naming the function), a positional parameter tree of [ParamNode]s, any
//! number of alternative return shapes, and a mapping from parameter names to the
//! [TypeExpr]s they must satisfy.
//!
//! Type expressions form a small regular algebra over type names: sequence, alternation,
//! zero-or-more and zero-or-one. They can be rendered back to canonical signature text, and
//! re-parsing that text yields an equal signature:
//!
//! ```
//! use argus::parser;
//!
//! let sig = parser::signature("vec.scale( v, [factor,] ... ) ==> table\n\
//!                              v : table\n\
//!                              factor : number\n\
//!                              ... : number/string")
//!     .unwrap();
//! assert_eq!(sig.designator, "vec.scale");
//! assert!(!sig.is_method);
//! let reparsed = parser::signature(&sig.to_text()).unwrap();
//! assert!(sig.same_shape(&reparsed));
//! ```

use std::fmt;
use std::rc::Rc;

/// A regular expression over type names. Leaves are names resolved through the predicate
/// registry when the automaton is built; inner nodes are the usual regular operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// A single type name.
    Name(Rc<str>),
    /// Ordered concatenation, two or more children.
    Seq(Vec<TypeExpr>),
    /// Alternation. A single child collapses to the child at parse time.
    Alt(Vec<TypeExpr>),
    /// Zero or more repetitions.
    Star(Box<TypeExpr>),
    /// Zero or one occurrence.
    Opt(Box<TypeExpr>),
}

/// An element of the positional parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamNode {
    /// A required parameter. Its type is looked up by name in
    /// [Signature::param_types]; an unmapped name is its own type name.
    Named(Rc<str>),
    /// A bracketed group: an optional subsequence of parameters. Groups nest.
    Group(Vec<ParamNode>),
    /// The trailing vararg and its type expression. An unmapped vararg carries
    /// `Name("...")`, which can never resolve and so reports an undefined type at build time.
    Vararg(TypeExpr),
}

/// A parsed docstring signature.
#[derive(Debug, Clone)]
pub struct Signature {
    /// Dotted path naming the function, e.g. `m.o:f`. A `:` before the last segment marks a
    /// method.
    pub designator: String,
    /// Whether the designator ends in `:name`.
    pub is_method: bool,
    /// The positional parameter tree, order and nesting preserved.
    pub params: Vec<ParamNode>,
    /// Alternative return shapes, one per `=>` clause. Semantically an alternation.
    pub returns: Vec<TypeExpr>,
    /// Parameter name to type expression, in source order. The vararg maps under `...`.
    pub param_types: Vec<(Rc<str>, TypeExpr)>,
    /// The signature paragraph exactly as matched in the docstring.
    pub raw_text: String,
}

impl Signature {
    /// Looks up the mapped type of a parameter name.
    pub fn type_of(&self, name: &str) -> Option<&TypeExpr> {
        self.param_types
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, expr)| expr)
    }

    /// The designator with `:` replaced by `.`, used as the prefix of every error message
    /// produced by checkers built from this signature.
    pub fn error_prefix(&self) -> String {
        self.designator.replace(':', ".")
    }

    /// Renders the canonical signature text. Parsing the result yields a signature equal to
    /// this one up to [raw_text](Signature::raw_text); see [Signature::same_shape].
    pub fn to_text(&self) -> String {
        let mut out = self.designator.clone();
        out.push_str("( ");
        fmt_params(&self.params, &mut out);
        out.push_str(" )");
        for ret in &self.returns {
            out.push_str(" ==> ");
            out.push_str(&ret.to_string());
        }
        for (name, expr) in &self.param_types {
            out.push('\n');
            out.push_str(name);
            out.push_str(" : ");
            out.push_str(&expr.to_string());
        }
        out
    }

    /// Structural equality, ignoring the raw docstring text.
    pub fn same_shape(&self, other: &Signature) -> bool {
        self.designator == other.designator
            && self.is_method == other.is_method
            && self.params == other.params
            && self.returns == other.returns
            && self.param_types == other.param_types
    }
}

fn fmt_params(params: &[ParamNode], out: &mut String) {
    for (idx, node) in params.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        match node {
            ParamNode::Named(name) => out.push_str(name),
            ParamNode::Group(children) => {
                out.push_str("[ ");
                fmt_params(children, out);
                out.push_str(" ]");
            }
            ParamNode::Vararg(_) => out.push_str("..."),
        }
    }
}

// Precedence levels for rendering: 0 admits sequences, 1 admits alternations, 2 admits
// postfix expressions, 3 only names and parenthesized expressions (the operand position of a
// postfix operator, which must not chain).
impl TypeExpr {
    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, prec: u8) -> fmt::Result {
        match self {
            TypeExpr::Name(name) => write!(f, "{name}"),
            TypeExpr::Seq(items) => {
                if prec > 0 {
                    f.write_str("(")?;
                }
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_prec(f, 1)?;
                }
                if prec > 0 {
                    f.write_str(")")?;
                }
                Ok(())
            }
            TypeExpr::Alt(items) => {
                if prec > 1 {
                    f.write_str("(")?;
                }
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str("/")?;
                    }
                    item.fmt_prec(f, 2)?;
                }
                if prec > 1 {
                    f.write_str(")")?;
                }
                Ok(())
            }
            TypeExpr::Star(inner) | TypeExpr::Opt(inner) => {
                let op = if matches!(self, TypeExpr::Star(_)) { "*" } else { "?" };
                if prec > 2 {
                    f.write_str("(")?;
                    inner.fmt_prec(f, 3)?;
                    write!(f, "{op})")
                } else {
                    inner.fmt_prec(f, 3)?;
                    f.write_str(op)
                }
            }
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}
