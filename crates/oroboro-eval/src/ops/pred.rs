// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Predicate evaluation: one sample, one outcome.

use oroboro_expr::{Cycle, Outcome, Pred, Trace};
use oroboro_rt::{Directive, Task, TaskCtx};

/// Samples a predicate on its first scheduling tick and reports about the
/// cycle the evaluation started at. Never waits.
pub(crate) struct PredEval {
    pred: Pred,
    start: Cycle,
    fired: bool,
}

impl PredEval {
    pub fn new(pred: Pred, start: Cycle) -> Self {
        Self { pred, start, fired: false }
    }
}

impl Task for PredEval {
    fn name(&self) -> &'static str {
        "pred"
    }

    fn step(&mut self, _cx: &mut TaskCtx<'_>) -> Directive {
        if self.fired {
            return Directive::Done;
        }
        self.fired = true;
        let held = self.pred.sample();
        let trace = Trace::leaf(self.start, &self.pred, held);
        let outcome = if held {
            Outcome::matched(self.start, self.start, trace)
        } else {
            Outcome::failed(self.start, trace)
        };
        Directive::Emit(outcome)
    }
}
