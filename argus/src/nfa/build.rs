//! Translation from [TypeExpr]s and parameter trees to [Nfa]s.
//!
//! Type names are resolved through the [Registry] here, which makes a missing entry a
//! build-time error; checkers never see an unresolved name. Assembly of the full argument
//! automaton walks the parameter tree in order, consuming the per-parameter expressions,
//! wrapping groups in an optional construction and splicing the vararg expression in
//! unwrapped (the expression itself already carries its repetition).

use crate::error::BuildError;
use crate::nfa::{Label, Nfa};
use crate::registry::Registry;
use crate::signature::{ParamNode, Signature, TypeExpr};
use std::collections::HashSet;
use std::rc::Rc;

/// Builds the automaton for a single type expression.
pub fn from_expr(expr: &TypeExpr, registry: &Registry) -> Result<Nfa, BuildError> {
    match expr {
        TypeExpr::Name(name) => {
            let (predicate, primitive) = registry
                .resolve(name)
                .ok_or_else(|| BuildError::UndefinedType(name.to_string()))?;
            Ok(Nfa::symbol(Label::new(name.clone(), predicate), !primitive))
        }
        TypeExpr::Seq(items) => {
            let mut iter = items.iter();
            let mut nfa = match iter.next() {
                Some(first) => from_expr(first, registry)?,
                None => return Ok(Nfa::empty()),
            };
            for item in iter {
                nfa.append(from_expr(item, registry)?);
            }
            Ok(nfa)
        }
        TypeExpr::Alt(items) => {
            let children = items
                .iter()
                .map(|item| from_expr(item, registry))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Nfa::alternation(children))
        }
        TypeExpr::Star(inner) => {
            let mut nfa = from_expr(inner, registry)?;
            nfa.star();
            Ok(nfa)
        }
        TypeExpr::Opt(inner) => {
            let mut nfa = from_expr(inner, registry)?;
            nfa.optional();
            Ok(nfa)
        }
    }
}

/// Assembles the automaton for a signature's full argument list. For a method, a synthetic
/// `self` parameter is checked before everything else.
pub fn assemble_args(signature: &Signature, registry: &Registry) -> Result<Nfa, BuildError> {
    let mut nfa = Nfa::empty();
    let mut consumed = HashSet::new();
    if signature.is_method {
        let receiver = ParamNode::Named(Rc::from("self"));
        nfa.append(from_param(&receiver, signature, registry, &mut consumed)?);
    }
    for node in &signature.params {
        nfa.append(from_param(node, signature, registry, &mut consumed)?);
    }
    Ok(nfa)
}

/// Assembles the automaton for a signature's return values: the alternation of all return
/// shapes, or the empty-sequence automaton if the signature has no return clauses.
pub fn assemble_returns(signature: &Signature, registry: &Registry) -> Result<Nfa, BuildError> {
    if signature.returns.is_empty() {
        return Ok(Nfa::empty());
    }
    let children = signature
        .returns
        .iter()
        .map(|shape| from_expr(shape, registry))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Nfa::alternation(children))
}

fn from_param(
    node: &ParamNode,
    signature: &Signature,
    registry: &Registry,
    consumed: &mut HashSet<Rc<str>>,
) -> Result<Nfa, BuildError> {
    match node {
        ParamNode::Named(name) => {
            if !consumed.insert(name.clone()) {
                return Err(BuildError::DuplicateParamUse(name.to_string()));
            }
            from_expr(&param_type(signature, name, registry), registry)
        }
        ParamNode::Group(children) => {
            let mut nfa = Nfa::empty();
            for child in children {
                nfa.append(from_param(child, signature, registry, consumed)?);
            }
            nfa.optional();
            Ok(nfa)
        }
        ParamNode::Vararg(expr) => from_expr(expr, registry),
    }
}

/// Resolves the type of a named parameter: the mapped expression if one exists, the default
/// `self` mapping for methods (`object` when registered, else `userdata / table` when both
/// are), and otherwise the parameter name itself as a type name.
fn param_type(signature: &Signature, name: &str, registry: &Registry) -> TypeExpr {
    if let Some(expr) = signature.type_of(name) {
        return expr.clone();
    }
    if name == "self" && signature.is_method {
        if registry.contains("object") {
            return TypeExpr::Name(Rc::from("object"));
        }
        if registry.contains("userdata") && registry.contains("table") {
            return TypeExpr::Alt(vec![
                TypeExpr::Name(Rc::from("userdata")),
                TypeExpr::Name(Rc::from("table")),
            ]);
        }
    }
    TypeExpr::Name(Rc::from(name))
}
