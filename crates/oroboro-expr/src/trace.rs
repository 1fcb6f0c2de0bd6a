// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Trace trees: how an outcome came to be.
//!
//! A trace mirrors the shape of the operator that produced its outcome and is
//! never mutated after emission; nodes are shared between outcomes by
//! reference count. The `Display` rendering is deterministic and is what the
//! test suite asserts against.

use std::fmt;
use std::rc::Rc;

use crate::pred::Pred;
use crate::Cycle;

/// Which branch of an alternation produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Side {
    Left,
    Right,
}

/// An immutable record of one evaluation path.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Trace {
    /// A predicate sampled at `cycle` with the given verdict.
    Leaf { cycle: Cycle, pred: Rc<str>, held: bool },
    /// Sequencing: left part, then right part (concatenation or fusion).
    Concat(Rc<Trace>, Rc<Trace>),
    /// One branch of an alternation.
    Alt { side: Side, inner: Rc<Trace> },
    /// A pair of intersecting matches.
    Inter(Rc<Trace>, Rc<Trace>),
    /// A pair of matches ending on the same cycle.
    Conj(Rc<Trace>, Rc<Trace>),
    /// One trace per achieved repetition, in order.
    Repeat(Vec<Rc<Trace>>),
    /// Antecedent, and the consequent when one was evaluated.
    Cond { ante: Rc<Trace>, conseq: Option<Rc<Trace>> },
    /// The inverted inner evaluation.
    Inv(Rc<Trace>),
}

impl Trace {
    pub fn leaf(cycle: Cycle, pred: &Pred, held: bool) -> Rc<Trace> {
        Rc::new(Trace::Leaf { cycle, pred: pred.name_shared(), held })
    }

    pub fn concat(left: Rc<Trace>, right: Rc<Trace>) -> Rc<Trace> {
        Rc::new(Trace::Concat(left, right))
    }

    pub fn alt(side: Side, inner: Rc<Trace>) -> Rc<Trace> {
        Rc::new(Trace::Alt { side, inner })
    }

    pub fn inter(left: Rc<Trace>, right: Rc<Trace>) -> Rc<Trace> {
        Rc::new(Trace::Inter(left, right))
    }

    pub fn conj(left: Rc<Trace>, right: Rc<Trace>) -> Rc<Trace> {
        Rc::new(Trace::Conj(left, right))
    }

    pub fn repeat(inners: Vec<Rc<Trace>>) -> Rc<Trace> {
        Rc::new(Trace::Repeat(inners))
    }

    pub fn cond(ante: Rc<Trace>, conseq: Option<Rc<Trace>>) -> Rc<Trace> {
        Rc::new(Trace::Cond { ante, conseq })
    }

    pub fn inv(inner: Rc<Trace>) -> Rc<Trace> {
        Rc::new(Trace::Inv(inner))
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trace::Leaf { cycle, pred, held } => {
                write!(f, "{pred}@{cycle}={}", if *held { 1 } else { 0 })
            }
            Trace::Concat(l, r) => write!(f, "(seq {l} {r})"),
            Trace::Alt { side, inner } => {
                let tag = match side {
                    Side::Left => "alt.l",
                    Side::Right => "alt.r",
                };
                write!(f, "({tag} {inner})")
            }
            Trace::Inter(l, r) => write!(f, "(int {l} {r})"),
            Trace::Conj(l, r) => write!(f, "(con {l} {r})"),
            Trace::Repeat(inners) => {
                write!(f, "(rep")?;
                for t in inners {
                    write!(f, " {t}")?;
                }
                write!(f, ")")
            }
            Trace::Cond { ante, conseq } => match conseq {
                Some(c) => write!(f, "(imp {ante} {c})"),
                None => write!(f, "(imp {ante})"),
            },
            Trace::Inv(inner) => write!(f, "(inv {inner})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, cycle: Cycle, held: bool) -> Rc<Trace> {
        Trace::leaf(cycle, &Pred::new(name, || true), held)
    }

    #[test]
    fn leaf_rendering() {
        assert_eq!(leaf("a", 3, true).to_string(), "a@3=1");
        assert_eq!(leaf("a", 0, false).to_string(), "a@0=0");
    }

    #[test]
    fn nested_rendering_is_deterministic() {
        let t = Trace::cond(
            leaf("req", 0, true),
            Some(Trace::concat(
                Trace::inv(leaf("ack", 1, false)),
                leaf("ack", 2, true),
            )),
        );
        assert_eq!(t.to_string(), "(imp req@0=1 (seq (inv ack@1=0) ack@2=1))");
    }

    #[test]
    fn repeat_and_alt_rendering() {
        let t = Trace::alt(
            Side::Right,
            Trace::repeat(vec![leaf("a", 1, true), leaf("a", 2, true)]),
        );
        assert_eq!(t.to_string(), "(alt.r (rep a@1=1 a@2=1))");
    }

    #[test]
    fn shared_nodes_compare_equal() {
        let inner = leaf("a", 1, true);
        let l = Trace::inv(inner.clone());
        let r = Trace::inv(inner);
        assert_eq!(l, r);
    }
}
