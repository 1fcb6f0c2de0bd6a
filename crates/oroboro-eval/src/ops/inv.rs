// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Inversion: `!a`.
//!
//! The first outcome of the inner evaluation settles the inverted one: a
//! match becomes a failure at the match's end cycle and the inner evaluation
//! is stopped (a second match would be a second failure, which no evaluation
//! may emit); a failure becomes a match ending at the failure's cycle.

use oroboro_expr::{Expr, Outcome, Trace};
use oroboro_rt::{ChildMsg, TaskCtx, TaskId};

use crate::eval::{eval_task, EvalCtx};
use crate::ops::{Logic, Relay};

pub(crate) struct InvEval {
    a: Expr,
    at: EvalCtx,
    child: Option<TaskId>,
    settled: bool,
}

impl InvEval {
    pub fn new(a: Expr, at: EvalCtx) -> Self {
        Self { a, at, child: None, settled: false }
    }
}

impl Logic for InvEval {
    const NAME: &'static str = "inv";

    fn boot(&mut self, re: &mut Relay, cx: &mut TaskCtx<'_>) {
        self.child = Some(re.spawn(cx, eval_task(&self.a, self.at)));
    }

    fn on_msg(&mut self, msg: ChildMsg, re: &mut Relay, cx: &mut TaskCtx<'_>) {
        let ChildMsg::Outcome(_, outcome) = msg else { return };
        if self.settled {
            return;
        }
        self.settled = true;
        match outcome {
            Outcome::Match { end, trace, .. } => {
                re.emit(Outcome::failed(end, Trace::inv(trace)));
                if let Some(child) = self.child {
                    cx.cancel(child);
                }
            }
            Outcome::Failure { at, trace } => {
                re.emit(Outcome::matched(self.at.start, at, Trace::inv(trace)));
            }
        }
    }
}
