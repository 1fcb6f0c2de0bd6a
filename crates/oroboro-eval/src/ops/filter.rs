// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Filters: `firstof(a)` and `once(a)`.
//!
//! Filters restrict the match stream of their argument without reshaping
//! traces. `firstof` forwards the first match and stops the inner
//! evaluation; `once` throttles to one match per distinct end cycle and lets
//! the inner evaluation run on. Failures pass through both.

use indexmap::IndexSet;
use oroboro_expr::{Cycle, Expr, Outcome};
use oroboro_rt::{ChildMsg, TaskCtx, TaskId};

use crate::eval::{eval_task, EvalCtx};
use crate::ops::{Logic, Relay};

pub(crate) struct FirstOfEval {
    a: Expr,
    at: EvalCtx,
    child: Option<TaskId>,
    forwarded: bool,
}

impl FirstOfEval {
    pub fn new(a: Expr, at: EvalCtx) -> Self {
        Self { a, at, child: None, forwarded: false }
    }
}

impl Logic for FirstOfEval {
    const NAME: &'static str = "firstof";

    fn boot(&mut self, re: &mut Relay, cx: &mut TaskCtx<'_>) {
        self.child = Some(re.spawn(cx, eval_task(&self.a, self.at)));
    }

    fn on_msg(&mut self, msg: ChildMsg, re: &mut Relay, cx: &mut TaskCtx<'_>) {
        let ChildMsg::Outcome(_, outcome) = msg else { return };
        match outcome {
            Outcome::Match { .. } => {
                if self.forwarded {
                    return;
                }
                self.forwarded = true;
                re.emit(outcome);
                if let Some(child) = self.child {
                    cx.cancel(child);
                }
            }
            Outcome::Failure { .. } => re.emit(outcome),
        }
    }
}

pub(crate) struct OnceEval {
    a: Expr,
    at: EvalCtx,
    seen: IndexSet<Cycle>,
}

impl OnceEval {
    pub fn new(a: Expr, at: EvalCtx) -> Self {
        Self { a, at, seen: IndexSet::new() }
    }
}

impl Logic for OnceEval {
    const NAME: &'static str = "once";

    fn boot(&mut self, re: &mut Relay, cx: &mut TaskCtx<'_>) {
        re.spawn(cx, eval_task(&self.a, self.at));
    }

    fn on_msg(&mut self, msg: ChildMsg, re: &mut Relay, _cx: &mut TaskCtx<'_>) {
        let ChildMsg::Outcome(_, outcome) = msg else { return };
        match outcome {
            Outcome::Match { end, .. } => {
                // Later matches on an already-seen end cycle are dropped.
                if self.seen.insert(end) {
                    re.emit(outcome);
                }
            }
            Outcome::Failure { .. } => re.emit(outcome),
        }
    }
}
