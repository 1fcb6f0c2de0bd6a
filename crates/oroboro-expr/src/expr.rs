// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The temporal-expression tree and its construction sugar.
//!
//! An `Expr` is an immutable value; evaluation never mutates it, and one tree
//! is shared by every evaluation the assertion driver launches. Operator
//! overloads build the tree the way the surface syntax reads: `a + b` for
//! concatenation, `a / b` for fusion, `a | b` for alternation, `a ^ b` for
//! intersection, `a & b` for conjunction, `a * n` / `a * (n, m)` for repeats,
//! `a >> b` for the conditional, and `!a` for inversion.

use std::ops;
use std::rc::Rc;

use crate::pred::Pred;

/// A temporal expression. Cheap to clone; subtrees are shared.
#[derive(Debug, Clone)]
pub struct Expr {
    kind: Rc<ExprKind>,
}

/// The kind of expression node.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A predicate sampled at a single cycle.
    Pred(Pred),
    /// `a + b`: `b` begins the cycle after each match of `a` ends.
    Concat(Expr, Expr),
    /// `a / b`: `b` begins on the same cycle each match of `a` ends.
    Fuse(Expr, Expr),
    /// `a | b`: both evaluated, all matches forwarded.
    Alt(Expr, Expr),
    /// `a ^ b`: pairs of matches, one from each side, keyed by containment
    /// of the shorter within the longer.
    Inter(Expr, Expr),
    /// `a & b`: matches from both sides ending on the same cycle.
    Conj(Expr, Expr),
    /// `a * (min, max)`: between `min` and `max` back-to-back matches of the
    /// body, one cycle apart. `min >= 1` and `min <= max`.
    Repeat { body: Expr, min: u32, max: u32 },
    /// `a >> b`: if `a` matches, `b` must match starting the next cycle;
    /// if `a` fails the whole expression vacuously matches.
    Cond(Expr, Expr),
    /// `!a`: matches become failures and the failure becomes a match.
    Inv(Expr),
    /// `firstof(a)`: first match only, then the evaluation of `a` is stopped.
    FirstOf(Expr),
    /// `once(a)`: at most one match per distinct end cycle.
    Once(Expr),
}

/// Expression construction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("repeat count must be at least 1, got {0}")]
    ZeroRepeat(u32),

    #[error("repeat range is inverted: {min} > {max}")]
    InvertedRange { min: u32, max: u32 },
}

impl Expr {
    fn new(kind: ExprKind) -> Self {
        Self { kind: Rc::new(kind) }
    }

    pub fn pred(pred: Pred) -> Self {
        Self::new(ExprKind::Pred(pred))
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// Exactly `n` repetitions of `self`, one cycle apart. `n >= 1`.
    pub fn repeat(self, n: u32) -> Result<Self, BuildError> {
        self.repeat_range(n, n)
    }

    /// Between `min` and `max` repetitions of `self`, one cycle apart.
    /// Every achieved count in the range yields its own match.
    pub fn repeat_range(self, min: u32, max: u32) -> Result<Self, BuildError> {
        if min == 0 {
            return Err(BuildError::ZeroRepeat(min));
        }
        if min > max {
            return Err(BuildError::InvertedRange { min, max });
        }
        Ok(Self::new(ExprKind::Repeat { body: self, min, max }))
    }
}

impl From<Pred> for Expr {
    fn from(pred: Pred) -> Self {
        Expr::pred(pred)
    }
}

/// Forward only the first match of `a`, then stop its evaluation.
/// Failures pass through unchanged.
pub fn firstof(a: Expr) -> Expr {
    Expr::new(ExprKind::FirstOf(a))
}

/// Forward at most one match of `a` per distinct end cycle; later matches
/// ending on an already-seen cycle are dropped. Failures pass through.
pub fn once(a: Expr) -> Expr {
    Expr::new(ExprKind::Once(a))
}

impl ops::Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::new(ExprKind::Concat(self, rhs))
    }
}

impl ops::Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::new(ExprKind::Fuse(self, rhs))
    }
}

impl ops::BitOr for Expr {
    type Output = Expr;
    fn bitor(self, rhs: Expr) -> Expr {
        Expr::new(ExprKind::Alt(self, rhs))
    }
}

impl ops::BitXor for Expr {
    type Output = Expr;
    fn bitxor(self, rhs: Expr) -> Expr {
        Expr::new(ExprKind::Inter(self, rhs))
    }
}

impl ops::BitAnd for Expr {
    type Output = Expr;
    fn bitand(self, rhs: Expr) -> Expr {
        Expr::new(ExprKind::Conj(self, rhs))
    }
}

impl ops::Shr for Expr {
    type Output = Expr;
    fn shr(self, rhs: Expr) -> Expr {
        Expr::new(ExprKind::Cond(self, rhs))
    }
}

impl ops::Not for Expr {
    type Output = Expr;
    fn not(self) -> Expr {
        Expr::new(ExprKind::Inv(self))
    }
}

/// `a * n`: exactly `n` repetitions.
///
/// Panics if `n == 0`; use [`Expr::repeat`] for a checked build.
impl ops::Mul<u32> for Expr {
    type Output = Expr;
    fn mul(self, n: u32) -> Expr {
        match self.repeat(n) {
            Ok(e) => e,
            Err(err) => panic!("invalid repeat: {err}"),
        }
    }
}

/// `a * (min, max)`: a repetition range.
///
/// Panics on an empty or zero-based range; use [`Expr::repeat_range`] for a
/// checked build.
impl ops::Mul<(u32, u32)> for Expr {
    type Output = Expr;
    fn mul(self, (min, max): (u32, u32)) -> Expr {
        match self.repeat_range(min, max) {
            Ok(e) => e,
            Err(err) => panic!("invalid repeat range: {err}"),
        }
    }
}
