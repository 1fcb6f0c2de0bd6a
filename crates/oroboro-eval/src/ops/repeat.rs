// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Repetition: `a * n` and `a * (min, max)`.
//!
//! The body runs at the start cycle; every match extends its path by one
//! repetition. A path whose count lands in `[min, max]` yields a match, and
//! a path still short of `max` continues with a fresh body evaluation the
//! cycle after its latest match. Counts are independent paths, so several
//! matches per evaluation are normal. Path failures merge into at most one
//! failure at conclusion, like alternation branches.

use std::collections::HashMap;
use std::rc::Rc;

use oroboro_expr::{Cycle, Expr, Outcome, Trace};
use oroboro_rt::{ChildMsg, TaskCtx, TaskId};

use crate::eval::{eval_task, EvalCtx};
use crate::ops::seq::{Join, Tail};
use crate::ops::{Logic, Relay};

pub(crate) struct RepeatEval {
    body: Expr,
    min: u32,
    max: u32,
    at: EvalCtx,
    /// Repetition traces accumulated along the path feeding each live child.
    paths: HashMap<TaskId, Vec<Rc<Trace>>>,
    failure: Option<(Cycle, Rc<Trace>)>,
}

impl RepeatEval {
    pub fn new(body: Expr, min: u32, max: u32, at: EvalCtx) -> Self {
        Self { body, min, max, at, paths: HashMap::new(), failure: None }
    }
}

impl Logic for RepeatEval {
    const NAME: &'static str = "repeat";

    fn boot(&mut self, re: &mut Relay, cx: &mut TaskCtx<'_>) {
        let first = re.spawn(cx, eval_task(&self.body, self.at));
        self.paths.insert(first, Vec::new());
    }

    fn on_msg(&mut self, msg: ChildMsg, re: &mut Relay, cx: &mut TaskCtx<'_>) {
        match msg {
            ChildMsg::Outcome(from, outcome) => {
                let Some(path) = self.paths.get(&from) else { return };
                match outcome {
                    Outcome::Match { end, trace, .. } => {
                        let mut path = path.clone();
                        path.push(trace);
                        let count = path.len() as u32;
                        if count >= self.min && count <= self.max {
                            re.emit(Outcome::matched(
                                self.at.start,
                                end,
                                Trace::repeat(path.clone()),
                            ));
                        }
                        if count < self.max {
                            let next = re.spawn(
                                cx,
                                Tail::new(self.at.sampler, end, true, self.body.clone(), Join::Raw),
                            );
                            self.paths.insert(next, path);
                        }
                    }
                    Outcome::Failure { at, trace } => {
                        let mut path = path.clone();
                        path.push(trace);
                        self.failure = Some((at, Trace::repeat(path)));
                    }
                }
            }
            ChildMsg::Finished(from) => {
                self.paths.remove(&from);
            }
        }
    }

    fn conclude(&mut self, re: &mut Relay) {
        if let Some((at, trace)) = self.failure.take() {
            re.emit(Outcome::failed(at, trace));
        }
    }
}
