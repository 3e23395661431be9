//! # Nondeterministic finite automata over type predicates
//! The [Nfa] here recognizes *value sequences* rather than strings: every non-epsilon
//! transition carries a [Label], a type name paired with the predicate it resolved to. NFAs are
//! produced from type expressions and parameter trees by the [build] module, combined with the
//! constructions below, and then converted to a [Dfa] with [Nfa::to_dfa]; the NFA itself is
//! discarded after that.
//!
//! The representation is an edge list: states are integers, transitions live in one flat `Vec`
//! in construction order. State `0` is the only start state and the highest state is the only
//! accepting state, which never has outgoing edges in a finished automaton. Construction keeps
//! that invariant: concatenation renumbers the appended automaton behind the existing states,
//! alternation splices children between a fresh start and a fresh accept, and repetition adds a
//! back edge plus a fresh accept before making the loop optional.
//!
//! Three flags are maintained while building:
//! - `has_user_type`: some transition refers to a user-registered predicate,
//! - `is_nonlinear`: the graph branches or loops,
//! - `needs_backtracking`: the DFA built from this NFA may be ambiguous with respect to
//!   user predicates, so the checker must try alternatives at run time.
//!
//! The last flag is conservative. Primitive kind predicates are mutually exclusive, so purely
//! primitive automata never need backtracking no matter how much they branch; a user predicate
//! is a black box that may overlap any other predicate, so any branching construction that
//! involves one sets the flag.

use crate::dfa::{Dfa, DfaState, DfaTransition};
use crate::registry::{predicate_id, Predicate};
use crate::value::Value;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

pub mod build;

/// A transition label: a type name and the predicate it resolved to when the automaton was
/// built. Labels are compared by predicate identity, never by name.
#[derive(Clone)]
pub struct Label {
    name: Rc<str>,
    predicate: Predicate,
}

impl Label {
    pub(crate) fn new(name: Rc<str>, predicate: Predicate) -> Self {
        Label { name, predicate }
    }

    /// The type name this label was resolved from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_rc(&self) -> Rc<str> {
        self.name.clone()
    }

    pub(crate) fn id(&self) -> usize {
        predicate_id(&self.predicate)
    }

    pub(crate) fn matches(&self, value: &Value) -> bool {
        (self.predicate)(value)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:x}", self.name, self.id())
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Transition {
    from: usize,
    to: usize,
    /// `None` is an epsilon transition.
    label: Option<Label>,
}

/// A nondeterministic finite automaton over value predicates. Start state is `0`, the single
/// accepting state is `num_states - 1`.
#[derive(Clone, Debug)]
pub struct Nfa {
    num_states: usize,
    transitions: Vec<Transition>,
    has_user_type: bool,
    is_nonlinear: bool,
    needs_backtracking: bool,
}

fn eps(from: usize, to: usize) -> Transition {
    debug_assert_ne!(from, to, "epsilon self loop");
    Transition {
        from,
        to,
        label: None,
    }
}

impl Nfa {
    /// The two-state automaton accepting exactly the empty sequence.
    pub(crate) fn empty() -> Self {
        Nfa {
            num_states: 2,
            transitions: vec![eps(0, 1)],
            has_user_type: false,
            is_nonlinear: false,
            needs_backtracking: false,
        }
    }

    /// The two-state automaton accepting exactly one value matching `label`'s predicate.
    pub(crate) fn symbol(label: Label, user: bool) -> Self {
        Nfa {
            num_states: 2,
            transitions: vec![Transition {
                from: 0,
                to: 1,
                label: Some(label),
            }],
            has_user_type: user,
            is_nonlinear: false,
            needs_backtracking: false,
        }
    }

    pub(crate) fn start(&self) -> usize {
        0
    }

    pub(crate) fn accept(&self) -> usize {
        self.num_states - 1
    }

    /// Whether any transition refers to a user-registered predicate.
    pub fn has_user_type(&self) -> bool {
        self.has_user_type
    }

    /// Whether checkers built from this automaton must try alternatives at run time.
    pub fn needs_backtracking(&self) -> bool {
        self.needs_backtracking
    }

    /// Concatenates `next` onto this automaton: `next`'s states are renumbered to follow this
    /// automaton's and an epsilon edge joins the old accepting state to `next`'s start.
    ///
    /// A user-typed automaton appended to an already branching one can make the subset
    /// construction ambiguous, so that combination forces backtracking.
    pub(crate) fn append(&mut self, next: Nfa) {
        if self.is_nonlinear && next.has_user_type {
            self.needs_backtracking = true;
        }
        let offset = self.num_states;
        self.transitions.push(eps(self.accept(), offset));
        self.transitions
            .extend(next.transitions.into_iter().map(|t| Transition {
                from: t.from + offset,
                to: t.to + offset,
                label: t.label,
            }));
        self.num_states += next.num_states;
        self.has_user_type |= next.has_user_type;
        self.is_nonlinear |= next.is_nonlinear;
        self.needs_backtracking |= next.needs_backtracking;
    }

    /// Splices the children between a fresh start and a fresh accept via epsilon edges.
    pub(crate) fn alternation(mut children: Vec<Nfa>) -> Self {
        if children.len() == 1 {
            return children.remove(0);
        }
        let mut nfa = Nfa {
            num_states: 1,
            transitions: Vec::new(),
            has_user_type: false,
            is_nonlinear: true,
            needs_backtracking: false,
        };
        let mut child_accepts = Vec::with_capacity(children.len());
        for child in children {
            let offset = nfa.num_states;
            child_accepts.push(offset + child.accept());
            nfa.transitions.push(eps(0, offset + child.start()));
            nfa.transitions
                .extend(child.transitions.into_iter().map(|t| Transition {
                    from: t.from + offset,
                    to: t.to + offset,
                    label: t.label,
                }));
            nfa.num_states += child.num_states;
            nfa.has_user_type |= child.has_user_type;
            nfa.needs_backtracking |= child.needs_backtracking;
        }
        let accept = nfa.num_states;
        for child_accept in child_accepts {
            nfa.transitions.push(eps(child_accept, accept));
        }
        nfa.num_states += 1;
        if nfa.has_user_type {
            nfa.needs_backtracking = true;
        }
        nfa
    }

    /// Makes the whole automaton optional with an epsilon edge from start to accept.
    pub(crate) fn optional(&mut self) {
        self.transitions.push(eps(self.start(), self.accept()));
        self.is_nonlinear = true;
        if self.has_user_type {
            self.needs_backtracking = true;
        }
    }

    /// Zero-or-more repetition: loop back from accept to start ("one or more"), move acceptance
    /// to a fresh state, then make the result optional.
    pub(crate) fn star(&mut self) {
        let old_accept = self.accept();
        self.transitions.push(eps(old_accept, self.start()));
        let fresh = self.num_states;
        self.transitions.push(eps(old_accept, fresh));
        self.num_states += 1;
        self.optional();
    }

    /// The epsilon closure of a set of states.
    fn epsilon_closure(&self, seed: &BTreeSet<usize>) -> BTreeSet<usize> {
        let mut all = seed.clone();
        let mut new: Vec<usize> = seed.iter().copied().collect();
        while let Some(state) = new.pop() {
            for t in &self.transitions {
                if t.label.is_none() && t.from == state && all.insert(t.to) {
                    new.push(t.to);
                }
            }
        }
        all
    }

    /// Converts this automaton to a DFA using the subset construction.
    ///
    /// DFA transitions are keyed by predicate identity: all transitions out of the current
    /// state set carrying the same predicate merge into one transition whose target is the
    /// epsilon closure of all their targets. Two distinct predicates sharing a type name stay
    /// distinct.
    ///
    /// Exploration is deterministic: NFA transitions are iterated in construction order,
    /// predicates grouped by first occurrence, and new DFA states numbered as discovered. The
    /// resulting per-state transitions are then sorted by `(target, name)`; together with the
    /// discovery numbering this is the canonical `(from, to, name)` order that fixes both the
    /// checker's trial order and the order of names in error messages.
    pub fn to_dfa(&self) -> Dfa {
        let accept = self.accept();
        let start_set = self.epsilon_closure(&BTreeSet::from([self.start()]));
        let start_key: Vec<usize> = start_set.iter().copied().collect();

        // Maps the sorted NFA state set to its DFA state id.
        let mut ids: HashMap<Vec<usize>, usize> = HashMap::new();
        let mut accepting = vec![start_set.contains(&accept)];
        let mut rows: Vec<Vec<(Label, usize)>> = Vec::new();
        ids.insert(start_key, 0);

        // Ids are handed out in enqueue order, so popping front processes state n exactly
        // when rows.len() == n.
        let mut queue = VecDeque::from([start_set]);
        while let Some(set) = queue.pop_front() {
            let mut labels: Vec<Label> = Vec::new();
            let mut targets: HashMap<usize, BTreeSet<usize>> = HashMap::new();
            for t in &self.transitions {
                if let Some(label) = &t.label {
                    if set.contains(&t.from) {
                        targets
                            .entry(label.id())
                            .or_insert_with(|| {
                                labels.push(label.clone());
                                BTreeSet::new()
                            })
                            .insert(t.to);
                    }
                }
            }

            let mut row = Vec::with_capacity(labels.len());
            for label in labels {
                let target_set = self.epsilon_closure(&targets[&label.id()]);
                let key: Vec<usize> = target_set.iter().copied().collect();
                let next = ids.len();
                let id = *ids.entry(key).or_insert_with(|| {
                    accepting.push(target_set.contains(&accept));
                    queue.push_back(target_set);
                    next
                });
                row.push((label, id));
            }
            rows.push(row);
        }

        let states = rows
            .into_iter()
            .zip(accepting)
            .map(|(mut row, accepting)| {
                row.sort_by(|(la, ta), (lb, tb)| ta.cmp(tb).then_with(|| la.name.cmp(&lb.name)));
                DfaState {
                    accepting,
                    transitions: row
                        .into_iter()
                        .map(|(label, to)| DfaTransition { to, label })
                        .collect(),
                }
            })
            .collect();

        Dfa {
            states,
            needs_backtracking: self.needs_backtracking,
        }
    }
}
