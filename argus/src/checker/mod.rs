//! # Checkers
//! A [Checker] validates a sequence of values against the DFA compiled from a signature. It is
//! a pure function over its captured automaton and predicates: on success the input values are
//! passed through, on failure a [CheckError] describes every expected type at the failure
//! position.
//!
//! ```
//! use argus::decorate::check_args;
//! use argus::registry::Registry;
//! use argus::value::Value;
//!
//! let registry = Registry::new();
//! let checker = check_args("clamp( n, [limit] )\nn : number\nlimit : number", &registry)
//!     .unwrap();
//! assert!(checker.check(&[Value::from(4)]).is_ok());
//! assert!(checker.check(&[Value::from(4), Value::from(10)]).is_ok());
//! let err = checker.check(&[Value::from("four")]).unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "clamp: number expected for argument no. 1 (got string)."
//! );
//! ```
//!
//! ## Modes
//! When the automaton's `needs_backtracking` flag is clear, the checker runs in *linear mode*:
//! at each state it commits to the first transition (in canonical order) whose predicate
//! matches the current value. With overlapping user predicates a committed choice may fail
//! further along while another would have succeeded, so such automata run in *backtracking
//! mode*: depth-first trial over matching transitions, and on overall failure a second pass
//! collects the "expected vs got" message at every dead end, joined into one disjunction
//! (any one of them could have been the intended path).

use crate::dfa::Dfa;
use crate::value::Value;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Whether a checker validates arguments or return values. Decides the noun used in error
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Argument,
    Return,
}

impl CheckKind {
    fn noun(self) -> &'static str {
        match self {
            CheckKind::Argument => "argument",
            CheckKind::Return => "return value",
        }
    }

    fn plural(self) -> &'static str {
        match self {
            CheckKind::Argument => "arguments",
            CheckKind::Return => "return values",
        }
    }
}

/// One reason a value sequence was rejected. Backtracking checkers may report several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// A value matched none of the expected types. If the state was also accepting, the value
    /// was surplus as well as wrong and `too_many` carries the accepted length.
    Unexpected {
        position: i64,
        expected: Vec<Rc<str>>,
        got: &'static str,
        too_many: Option<i64>,
    },
    /// Input ran out in a non-accepting state.
    Missing {
        position: i64,
        expected: Vec<Rc<str>>,
    },
    /// Values remained past a state that accepts and expects nothing further.
    Surplus { limit: i64 },
}

impl Failure {
    fn render(&self, kind: CheckKind) -> String {
        match self {
            Failure::Unexpected {
                position,
                expected,
                got,
                too_many,
            } => {
                let mut message = format!(
                    "{} expected for {} no. {} (got {})",
                    expected.join("/"),
                    kind.noun(),
                    position,
                    got
                );
                if let Some(limit) = too_many {
                    message.push_str(&format!(
                        " or too many {} (expected {})",
                        kind.plural(),
                        limit
                    ));
                }
                message
            }
            Failure::Missing { position, expected } => format!(
                "missing {}(s) at index {} (expected {})",
                kind.noun(),
                position,
                expected.join("/")
            ),
            Failure::Surplus { limit } => {
                format!("too many {} (expected {})", kind.plural(), limit)
            }
        }
    }
}

/// A rejected check. The rendered text is a frozen contract:
/// `{prefix}: {failures joined by " , or "}.` with the prefix being the signature's
/// designator, `:` replaced by `.`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckError {
    kind: CheckKind,
    prefix: String,
    failures: Vec<Failure>,
    stack_offset: usize,
}

impl CheckError {
    /// Argument or return check.
    pub fn kind(&self) -> CheckKind {
        self.kind
    }

    /// Every failure point found; exactly one in linear mode.
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// The stack offset configured on the checker, for the host's error facility. Carried,
    /// never interpreted.
    pub fn stack_offset(&self) -> usize {
        self.stack_offset
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self
            .failures
            .iter()
            .map(|failure| failure.render(self.kind))
            .collect();
        write!(f, "{}: {}.", self.prefix, messages.join(" , or "))
    }
}

impl std::error::Error for CheckError {}

/// A compiled value-sequence checker. Long-lived and read-only; see the
/// [module documentation](self) for the two evaluation modes.
#[derive(Debug, Clone)]
pub struct Checker {
    dfa: Dfa,
    kind: CheckKind,
    prefix: String,
    index_offset: i64,
    stack_offset: usize,
}

impl Checker {
    pub(crate) fn new(
        dfa: Dfa,
        kind: CheckKind,
        prefix: String,
        index_offset: i64,
        stack_offset: usize,
    ) -> Self {
        Checker {
            dfa,
            kind,
            prefix,
            index_offset,
            stack_offset,
        }
    }

    /// The automaton this checker interprets.
    pub fn dfa(&self) -> &Dfa {
        &self.dfa
    }

    /// Validates a value sequence, passing it through on success.
    pub fn check<'v>(&self, values: &'v [Value]) -> Result<&'v [Value], CheckError> {
        if self.dfa.needs_backtracking() {
            self.check_backtracking(values)
        } else {
            self.check_linear(values)
        }
    }

    // Reported position of the 1-based raw position: methods shift by -1 so the implicit
    // receiver is index 0 and the user-visible arguments keep their own numbering.
    fn position(&self, raw: usize) -> i64 {
        raw as i64 + self.index_offset
    }

    fn check_linear<'v>(&self, values: &'v [Value]) -> Result<&'v [Value], CheckError> {
        let mut state = self.dfa.start();
        for (idx, value) in values.iter().enumerate() {
            let matched = self.dfa.states()[state]
                .transitions()
                .iter()
                .find(|t| t.label().matches(value));
            match matched {
                Some(t) => state = t.to(),
                None => return Err(self.error(vec![self.stuck(state, idx, value)])),
            }
        }
        if self.dfa.states()[state].is_accepting() {
            Ok(values)
        } else {
            Err(self.error(vec![Failure::Missing {
                position: self.position(values.len() + 1),
                expected: self.dfa.expected(state),
            }]))
        }
    }

    fn check_backtracking<'v>(&self, values: &'v [Value]) -> Result<&'v [Value], CheckError> {
        if self.admits(self.dfa.start(), values, 0) {
            return Ok(values);
        }
        let mut failures = Vec::new();
        let mut seen = HashSet::new();
        self.collect(self.dfa.start(), values, 0, &mut failures, &mut seen);
        Err(self.error(failures))
    }

    // First pass: accept/reject only.
    fn admits(&self, state: usize, values: &[Value], pos: usize) -> bool {
        if pos == values.len() {
            return self.dfa.states()[state].is_accepting();
        }
        let value = &values[pos];
        self.dfa.states()[state]
            .transitions()
            .iter()
            .any(|t| t.label().matches(value) && self.admits(t.to(), values, pos + 1))
    }

    // Second pass: record a failure at every dead end, each (state, position) once, in
    // exploration order.
    fn collect(
        &self,
        state: usize,
        values: &[Value],
        pos: usize,
        failures: &mut Vec<Failure>,
        seen: &mut HashSet<(usize, usize)>,
    ) {
        if pos == values.len() {
            if !self.dfa.states()[state].is_accepting() && seen.insert((state, pos)) {
                failures.push(Failure::Missing {
                    position: self.position(pos + 1),
                    expected: self.dfa.expected(state),
                });
            }
            return;
        }
        let value = &values[pos];
        let mut advanced = false;
        for t in self.dfa.states()[state].transitions() {
            if t.label().matches(value) {
                advanced = true;
                self.collect(t.to(), values, pos + 1, failures, seen);
            }
        }
        if !advanced && seen.insert((state, pos)) {
            failures.push(self.stuck(state, pos, value));
        }
    }

    // The failure for "values[idx] does not advance out of `state`". A non-accepting DFA
    // state always has outgoing transitions (every non-accepting subset has a path to the
    // accept state), so an empty expected set implies the state accepts.
    fn stuck(&self, state: usize, idx: usize, value: &Value) -> Failure {
        let expected = self.dfa.expected(state);
        let limit = self.position(idx + 1) - 1;
        if expected.is_empty() {
            Failure::Surplus { limit }
        } else {
            Failure::Unexpected {
                position: self.position(idx + 1),
                expected,
                got: value.kind(),
                too_many: self.dfa.states()[state]
                    .is_accepting()
                    .then_some(limit),
            }
        }
    }

    fn error(&self, failures: Vec<Failure>) -> CheckError {
        CheckError {
            kind: self.kind,
            prefix: self.prefix.clone(),
            failures,
            stack_offset: self.stack_offset,
        }
    }
}
