// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Alternation: `a | b`.
//!
//! Both sides evaluate from the same start. Every match from either side is
//! forwarded as it arrives, tagged with the side that produced it. The
//! operator lives until both sides have finished; if any side failed along
//! the way, exactly one failure is emitted at conclusion, carrying the last
//! branch failure that arrived.

use std::rc::Rc;

use oroboro_expr::{Cycle, Expr, Outcome, Side, Trace};
use oroboro_rt::{ChildMsg, TaskCtx, TaskId};

use crate::eval::{eval_task, EvalCtx};
use crate::ops::{Logic, Relay};

pub(crate) struct AltEval {
    a: Expr,
    b: Expr,
    at: EvalCtx,
    left: Option<TaskId>,
    failure: Option<(Cycle, Side, Rc<Trace>)>,
}

impl AltEval {
    pub fn new(a: Expr, b: Expr, at: EvalCtx) -> Self {
        Self { a, b, at, left: None, failure: None }
    }
}

impl Logic for AltEval {
    const NAME: &'static str = "alt";

    fn boot(&mut self, re: &mut Relay, cx: &mut TaskCtx<'_>) {
        self.left = Some(re.spawn(cx, eval_task(&self.a, self.at)));
        re.spawn(cx, eval_task(&self.b, self.at));
    }

    fn on_msg(&mut self, msg: ChildMsg, re: &mut Relay, _cx: &mut TaskCtx<'_>) {
        let ChildMsg::Outcome(from, outcome) = msg else { return };
        let side = if Some(from) == self.left { Side::Left } else { Side::Right };
        match outcome {
            Outcome::Match { start, end, trace } => {
                re.emit(Outcome::matched(start, end, Trace::alt(side, trace)));
            }
            Outcome::Failure { at, trace } => {
                self.failure = Some((at, side, trace));
            }
        }
    }

    fn conclude(&mut self, re: &mut Relay) {
        if let Some((at, side, trace)) = self.failure.take() {
            re.emit(Outcome::failed(at, Trace::alt(side, trace)));
        }
    }
}
