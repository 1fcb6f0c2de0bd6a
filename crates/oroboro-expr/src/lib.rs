// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Temporal-expression value types for the Oroboro engine.
//!
//! This crate defines the immutable data shared between the runtime and the
//! evaluator: named predicates, the expression tree with its operator-overload
//! sugar, outcome values, and the trace trees that accompany every outcome.

pub mod expr;
pub mod outcome;
pub mod pred;
pub mod trace;

pub use expr::{firstof, once, BuildError, Expr, ExprKind};
pub use outcome::Outcome;
pub use pred::Pred;
pub use trace::{Side, Trace};

/// Index of a cycle, counted as postings of a sampling event.
///
/// Cycle 0 begins at the first posting; the interval between two consecutive
/// postings is one cycle.
pub type Cycle = u64;
