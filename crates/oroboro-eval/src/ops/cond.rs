// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Conditional: `a >> b`.
//!
//! A failing antecedent makes the whole expression vacuously true: one match
//! ending at the failure cycle, consequent never evaluated. Each antecedent
//! match launches the consequent one cycle later; consequent outcomes come
//! back wrapped in the conditional trace, failures included.

use oroboro_expr::{Expr, Outcome, Trace};
use oroboro_rt::{ChildMsg, TaskCtx, TaskId};

use crate::eval::{eval_task, EvalCtx};
use crate::ops::seq::{Join, Tail};
use crate::ops::{Logic, Relay};

pub(crate) struct CondEval {
    ante: Expr,
    conseq: Expr,
    at: EvalCtx,
    head: Option<TaskId>,
}

impl CondEval {
    pub fn new(ante: Expr, conseq: Expr, at: EvalCtx) -> Self {
        Self { ante, conseq, at, head: None }
    }
}

impl Logic for CondEval {
    const NAME: &'static str = "cond";

    fn boot(&mut self, re: &mut Relay, cx: &mut TaskCtx<'_>) {
        self.head = Some(re.spawn(cx, eval_task(&self.ante, self.at)));
    }

    fn on_msg(&mut self, msg: ChildMsg, re: &mut Relay, cx: &mut TaskCtx<'_>) {
        let ChildMsg::Outcome(from, outcome) = msg else { return };
        if Some(from) == self.head {
            match outcome {
                Outcome::Match { end, trace, .. } => {
                    let join = Join::Cond { start: self.at.start, head: trace };
                    re.spawn(cx, Tail::new(self.at.sampler, end, true, self.conseq.clone(), join));
                }
                // Antecedent unmet: vacuously true.
                Outcome::Failure { at, trace } => {
                    re.emit(Outcome::matched(self.at.start, at, Trace::cond(trace, None)));
                }
            }
        } else {
            re.emit(outcome);
        }
    }
}
