// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Conjunction: `a & b`.
//!
//! Both sides evaluate from the same start; a match is emitted only when
//! both sides match with the same end cycle. Matches without a counterpart
//! yet are buffered per end cycle. Failure only when both sides fail and no
//! conjoined match was emitted.

use std::rc::Rc;

use indexmap::IndexMap;
use oroboro_expr::{Cycle, Expr, Outcome, Trace};
use oroboro_rt::{ChildMsg, TaskCtx, TaskId};

use crate::eval::{eval_task, EvalCtx};
use crate::ops::{Logic, Relay};

#[derive(Default)]
struct PerCycle {
    left: Vec<Rc<Trace>>,
    right: Vec<Rc<Trace>>,
}

pub(crate) struct ConjEval {
    a: Expr,
    b: Expr,
    at: EvalCtx,
    left: Option<TaskId>,
    pending: IndexMap<Cycle, PerCycle>,
    emitted_any: bool,
    fail_left: Option<(Cycle, Rc<Trace>)>,
    fail_right: Option<(Cycle, Rc<Trace>)>,
}

impl ConjEval {
    pub fn new(a: Expr, b: Expr, at: EvalCtx) -> Self {
        Self {
            a,
            b,
            at,
            left: None,
            pending: IndexMap::new(),
            emitted_any: false,
            fail_left: None,
            fail_right: None,
        }
    }
}

impl Logic for ConjEval {
    const NAME: &'static str = "conj";

    fn boot(&mut self, re: &mut Relay, cx: &mut TaskCtx<'_>) {
        self.left = Some(re.spawn(cx, eval_task(&self.a, self.at)));
        re.spawn(cx, eval_task(&self.b, self.at));
    }

    fn on_msg(&mut self, msg: ChildMsg, re: &mut Relay, _cx: &mut TaskCtx<'_>) {
        let ChildMsg::Outcome(from, outcome) = msg else { return };
        let is_left = Some(from) == self.left;
        match outcome {
            Outcome::Match { end, trace, .. } => {
                let slot = self.pending.entry(end).or_default();
                let counterparts = if is_left { &slot.right } else { &slot.left };
                for other in counterparts {
                    let paired = if is_left {
                        Trace::conj(trace.clone(), other.clone())
                    } else {
                        Trace::conj(other.clone(), trace.clone())
                    };
                    re.emit(Outcome::matched(self.at.start, end, paired));
                    self.emitted_any = true;
                }
                let own = if is_left { &mut slot.left } else { &mut slot.right };
                own.push(trace);
            }
            Outcome::Failure { at, trace } => {
                let slot = if is_left { &mut self.fail_left } else { &mut self.fail_right };
                *slot = Some((at, trace));
            }
        }
    }

    fn conclude(&mut self, re: &mut Relay) {
        if self.emitted_any {
            return;
        }
        if let (Some((at_l, trace_l)), Some((at_r, trace_r))) =
            (self.fail_left.take(), self.fail_right.take())
        {
            re.emit(Outcome::failed(at_l.max(at_r), Trace::conj(trace_l, trace_r)));
        }
    }
}
