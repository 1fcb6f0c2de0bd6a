// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Outcome values: what an evaluation reports.

use std::fmt;
use std::rc::Rc;

use crate::trace::Trace;
use crate::Cycle;

/// The result of one evaluation path.
///
/// An evaluation emits zero or more matches and, for operators that conclude
/// negatively, a failure. Both carry the trace that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Outcome {
    /// The expression held over cycles `[start, end]` inclusive.
    Match { start: Cycle, end: Cycle, trace: Rc<Trace> },
    /// The expression conclusively could not hold; known at cycle `at`.
    Failure { at: Cycle, trace: Rc<Trace> },
}

impl Outcome {
    pub fn matched(start: Cycle, end: Cycle, trace: Rc<Trace>) -> Self {
        Outcome::Match { start, end, trace }
    }

    pub fn failed(at: Cycle, trace: Rc<Trace>) -> Self {
        Outcome::Failure { at, trace }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Outcome::Match { .. })
    }

    /// Start and end cycle of a match; `None` for a failure.
    pub fn span(&self) -> Option<(Cycle, Cycle)> {
        match self {
            Outcome::Match { start, end, .. } => Some((*start, *end)),
            Outcome::Failure { .. } => None,
        }
    }

    /// The cycle at which the outcome was settled: a match's end cycle or a
    /// failure's report cycle.
    pub fn cycle(&self) -> Cycle {
        match self {
            Outcome::Match { end, .. } => *end,
            Outcome::Failure { at, .. } => *at,
        }
    }

    pub fn trace(&self) -> &Rc<Trace> {
        match self {
            Outcome::Match { trace, .. } | Outcome::Failure { trace, .. } => trace,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Match { start, end, trace } => {
                write!(f, "match [{start}, {end}] {trace}")
            }
            Outcome::Failure { at, trace } => write!(f, "fail @{at} {trace}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pred::Pred;

    #[test]
    fn accessors() {
        let t = Trace::leaf(2, &Pred::new("a", || true), true);
        let m = Outcome::matched(2, 2, t.clone());
        assert!(m.is_match());
        assert_eq!(m.span(), Some((2, 2)));
        assert_eq!(m.cycle(), 2);

        let x = Outcome::failed(4, t);
        assert!(!x.is_match());
        assert_eq!(x.span(), None);
        assert_eq!(x.cycle(), 4);
    }

    #[test]
    fn rendering() {
        let t = Trace::leaf(1, &Pred::new("a", || true), false);
        assert_eq!(Outcome::failed(1, t).to_string(), "fail @1 a@1=0");
    }
}
