// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Dispatch from expression nodes to evaluator tasks.

use oroboro_expr::{Cycle, Expr, ExprKind};
use oroboro_rt::{EventId, Task};

use crate::ops::alt::AltEval;
use crate::ops::cond::CondEval;
use crate::ops::conj::ConjEval;
use crate::ops::filter::{FirstOfEval, OnceEval};
use crate::ops::inter::InterEval;
use crate::ops::inv::InvEval;
use crate::ops::pred::PredEval;
use crate::ops::repeat::RepeatEval;
use crate::ops::seq::SeqEval;
use crate::ops::Comb;

/// Where and when an evaluation begins: the sampling event that defines
/// cycles, and the cycle the evaluation starts at.
#[derive(Debug, Clone, Copy)]
pub struct EvalCtx {
    pub sampler: EventId,
    pub start: Cycle,
}

impl EvalCtx {
    pub fn new(sampler: EventId, start: Cycle) -> Self {
        Self { sampler, start }
    }
}

/// Build the evaluator task for `expr` beginning at `at`. Each call builds a
/// fresh task; the expression tree itself is shared, never consumed.
pub fn eval_task(expr: &Expr, at: EvalCtx) -> Box<dyn Task> {
    match expr.kind() {
        ExprKind::Pred(pred) => Box::new(PredEval::new(pred.clone(), at.start)),
        ExprKind::Concat(a, b) => Comb::task(SeqEval::concat(a.clone(), b.clone(), at)),
        ExprKind::Fuse(a, b) => Comb::task(SeqEval::fuse(a.clone(), b.clone(), at)),
        ExprKind::Alt(a, b) => Comb::task(AltEval::new(a.clone(), b.clone(), at)),
        ExprKind::Inter(a, b) => Comb::task(InterEval::new(a.clone(), b.clone(), at)),
        ExprKind::Conj(a, b) => Comb::task(ConjEval::new(a.clone(), b.clone(), at)),
        ExprKind::Repeat { body, min, max } => {
            Comb::task(RepeatEval::new(body.clone(), *min, *max, at))
        }
        ExprKind::Cond(a, b) => Comb::task(CondEval::new(a.clone(), b.clone(), at)),
        ExprKind::Inv(a) => Comb::task(InvEval::new(a.clone(), at)),
        ExprKind::FirstOf(a) => Comb::task(FirstOfEval::new(a.clone(), at)),
        ExprKind::Once(a) => Comb::task(OnceEval::new(a.clone(), at)),
    }
}
