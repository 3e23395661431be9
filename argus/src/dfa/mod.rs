//! # Deterministic finite automata
//! The [Dfa] produced by [Nfa::to_dfa](crate::nfa::Nfa::to_dfa). State `0` is the start state;
//! each state knows whether it is accepting and carries its outgoing transitions in the
//! canonical `(from, to, name)` order established by the subset construction. For every state
//! there is at most one transition per predicate identity. DFAs are built once and then only
//! read by checkers.

use crate::nfa::Label;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct Dfa {
    pub(crate) states: Vec<DfaState>,
    pub(crate) needs_backtracking: bool,
}

/// A state of the DFA: an accepting bit and the outgoing transitions in canonical order.
#[derive(Clone, Debug)]
pub struct DfaState {
    pub(crate) accepting: bool,
    pub(crate) transitions: Vec<DfaTransition>,
}

#[derive(Clone, Debug)]
pub struct DfaTransition {
    pub(crate) to: usize,
    pub(crate) label: Label,
}

impl Dfa {
    /// The start state.
    pub fn start(&self) -> usize {
        0
    }

    /// All states, indexed by state id.
    pub fn states(&self) -> &[DfaState] {
        &self.states
    }

    /// Whether checkers over this DFA must try alternatives at run time. Inherited verbatim
    /// from the NFA this DFA was built from.
    pub fn needs_backtracking(&self) -> bool {
        self.needs_backtracking
    }

    /// The type names on the transitions out of `state`, in canonical order. This is the
    /// "expected" set reported when a check fails at that state.
    pub(crate) fn expected(&self, state: usize) -> Vec<Rc<str>> {
        self.states[state]
            .transitions
            .iter()
            .map(|t| t.label.name_rc())
            .collect()
    }
}

impl DfaState {
    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    pub fn transitions(&self) -> &[DfaTransition] {
        &self.transitions
    }
}

impl DfaTransition {
    /// The target state id.
    pub fn to(&self) -> usize {
        self.to
    }

    pub fn label(&self) -> &Label {
        &self.label
    }
}
