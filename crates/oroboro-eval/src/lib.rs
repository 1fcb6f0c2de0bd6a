// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Temporal-expression evaluation.
//!
//! Every operator of the expression algebra becomes a task when evaluated:
//! [`eval_task`] maps an expression node and an evaluation context (which
//! sampling event defines cycles, and the start cycle) to the task that
//! evaluates it. Operator tasks spawn sub-evaluations for their children and
//! combine the outcome streams arriving in their inbox.
//!
//! The [`always`] driver launches a fresh evaluation of one expression at
//! every posting of the sampling event and routes every outcome to a user
//! callback pair.

mod driver;
mod eval;
mod ops;

pub use driver::{always, hooks};
pub use eval::{eval_task, EvalCtx};
