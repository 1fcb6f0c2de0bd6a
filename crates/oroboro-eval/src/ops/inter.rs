// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Intersection (convolution): `a ^ b`.
//!
//! Both sides evaluate from the same start. Each new match pairs with every
//! already-seen match of the other side that ends no later, yielding a match
//! at the newer end. Matches arrive in end-cycle order within an evaluation,
//! so every compatible pair is produced exactly once. Failure only when both
//! sides fail.

use std::rc::Rc;

use oroboro_expr::{Cycle, Expr, Outcome, Trace};
use oroboro_rt::{ChildMsg, TaskCtx, TaskId};

use crate::eval::{eval_task, EvalCtx};
use crate::ops::{Logic, Relay};

pub(crate) struct InterEval {
    a: Expr,
    b: Expr,
    at: EvalCtx,
    left: Option<TaskId>,
    seen_left: Vec<(Cycle, Rc<Trace>)>,
    seen_right: Vec<(Cycle, Rc<Trace>)>,
    fail_left: Option<(Cycle, Rc<Trace>)>,
    fail_right: Option<(Cycle, Rc<Trace>)>,
}

impl InterEval {
    pub fn new(a: Expr, b: Expr, at: EvalCtx) -> Self {
        Self {
            a,
            b,
            at,
            left: None,
            seen_left: Vec::new(),
            seen_right: Vec::new(),
            fail_left: None,
            fail_right: None,
        }
    }
}

impl Logic for InterEval {
    const NAME: &'static str = "inter";

    fn boot(&mut self, re: &mut Relay, cx: &mut TaskCtx<'_>) {
        self.left = Some(re.spawn(cx, eval_task(&self.a, self.at)));
        re.spawn(cx, eval_task(&self.b, self.at));
    }

    fn on_msg(&mut self, msg: ChildMsg, re: &mut Relay, _cx: &mut TaskCtx<'_>) {
        let ChildMsg::Outcome(from, outcome) = msg else { return };
        let is_left = Some(from) == self.left;
        match outcome {
            Outcome::Match { end, trace, .. } => {
                let others = if is_left { &self.seen_right } else { &self.seen_left };
                for (other_end, other_trace) in others {
                    if *other_end <= end {
                        // Trace keeps the left side first either way.
                        let paired = if is_left {
                            Trace::inter(trace.clone(), other_trace.clone())
                        } else {
                            Trace::inter(other_trace.clone(), trace.clone())
                        };
                        re.emit(Outcome::matched(self.at.start, end, paired));
                    }
                }
                let seen = if is_left { &mut self.seen_left } else { &mut self.seen_right };
                seen.push((end, trace));
            }
            Outcome::Failure { at, trace } => {
                let slot = if is_left { &mut self.fail_left } else { &mut self.fail_right };
                *slot = Some((at, trace));
            }
        }
    }

    fn conclude(&mut self, re: &mut Relay) {
        if let (Some((at_l, trace_l)), Some((at_r, trace_r))) =
            (self.fail_left.take(), self.fail_right.take())
        {
            re.emit(Outcome::failed(at_l.max(at_r), Trace::inter(trace_l, trace_r)));
        }
    }
}
