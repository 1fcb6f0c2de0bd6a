// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Sequencing: concatenation (`a + b`) and fusion (`a / b`), plus the tail
//! task every cycle-advancing operator reuses.
//!
//! The head expression runs first. Each of its matches launches a [`Tail`]:
//! a continuation that optionally waits one sampling event, evaluates the
//! continuation expression at the continuation cycle, and relays its
//! outcomes joined to the head trace. The operator itself forwards whatever
//! tails produce and finishes when the head and every tail have.

use std::rc::Rc;

use oroboro_expr::{Cycle, Expr, Outcome, Trace};
use oroboro_rt::{ChildMsg, Directive, EventId, Sink, Spawn, Task, TaskCtx, TaskId};

use crate::eval::{eval_task, EvalCtx};
use crate::ops::{Logic, Relay};

/// Whether `b` starts on the cycle after the head match ends (concatenation)
/// or on the same cycle (fusion).
#[derive(Clone, Copy, PartialEq, Eq)]
enum Gap {
    NextCycle,
    SameCycle,
}

pub(crate) struct SeqEval {
    a: Expr,
    b: Expr,
    at: EvalCtx,
    gap: Gap,
    head: Option<TaskId>,
}

impl SeqEval {
    pub fn concat(a: Expr, b: Expr, at: EvalCtx) -> Self {
        Self { a, b, at, gap: Gap::NextCycle, head: None }
    }

    pub fn fuse(a: Expr, b: Expr, at: EvalCtx) -> Self {
        Self { a, b, at, gap: Gap::SameCycle, head: None }
    }
}

impl Logic for SeqEval {
    const NAME: &'static str = "seq";

    fn boot(&mut self, re: &mut Relay, cx: &mut TaskCtx<'_>) {
        self.head = Some(re.spawn(cx, eval_task(&self.a, self.at)));
    }

    fn on_msg(&mut self, msg: ChildMsg, re: &mut Relay, cx: &mut TaskCtx<'_>) {
        let ChildMsg::Outcome(from, outcome) = msg else { return };
        if Some(from) == self.head {
            match outcome {
                // One continuation per head match.
                Outcome::Match { end, trace, .. } => {
                    let join = Join::Seq { start: self.at.start, head: trace };
                    let advance = self.gap == Gap::NextCycle;
                    re.spawn(cx, Tail::new(self.at.sampler, end, advance, self.b.clone(), join));
                }
                // A failing head is the operator's own failure, unchanged.
                Outcome::Failure { .. } => re.emit(outcome),
            }
        } else {
            // Tails emit fully joined outcomes; forward them verbatim.
            re.emit(outcome);
        }
    }
}

/// How a tail folds the head it continues from into relayed outcomes.
pub(crate) enum Join {
    /// Sequencing: wrap as `Concat(head, tail)` and stretch the span back to
    /// the overall start.
    Seq { start: Cycle, head: Rc<Trace> },
    /// Conditional consequent: wrap as `Cond(head, tail)`.
    Cond { start: Cycle, head: Rc<Trace> },
    /// No join; relay raw (repeat bookkeeping lives in the parent).
    Raw,
}

enum TailState {
    Init,
    Launch,
    Relay,
}

/// Continuation of one head match: optionally advance one cycle, evaluate an
/// expression there, and relay its outcome stream to the parent.
pub(crate) struct Tail {
    sampler: EventId,
    from: Cycle,
    advance: bool,
    expr: Expr,
    join: Join,
    state: TailState,
    child_done: bool,
}

impl Tail {
    pub fn new(sampler: EventId, from: Cycle, advance: bool, expr: Expr, join: Join) -> Box<Self> {
        Box::new(Self {
            sampler,
            from,
            advance,
            expr,
            join,
            state: TailState::Init,
            child_done: false,
        })
    }

    fn rejoin(&self, outcome: Outcome) -> Outcome {
        match &self.join {
            Join::Raw => outcome,
            Join::Seq { start, head } => match outcome {
                Outcome::Match { end, trace, .. } => {
                    Outcome::matched(*start, end, Trace::concat(head.clone(), trace))
                }
                Outcome::Failure { at, trace } => {
                    Outcome::failed(at, Trace::concat(head.clone(), trace))
                }
            },
            Join::Cond { start, head } => match outcome {
                Outcome::Match { end, trace, .. } => {
                    Outcome::matched(*start, end, Trace::cond(head.clone(), Some(trace)))
                }
                Outcome::Failure { at, trace } => {
                    Outcome::failed(at, Trace::cond(head.clone(), Some(trace)))
                }
            },
        }
    }
}

impl Task for Tail {
    fn name(&self) -> &'static str {
        "tail"
    }

    fn step(&mut self, cx: &mut TaskCtx<'_>) -> Directive {
        loop {
            match self.state {
                TailState::Init => {
                    self.state = TailState::Launch;
                    if self.advance {
                        return Directive::WaitEvent(self.sampler);
                    }
                }
                TailState::Launch => {
                    self.state = TailState::Relay;
                    let start = if self.advance { self.from + 1 } else { self.from };
                    let at = EvalCtx::new(self.sampler, start);
                    return Directive::Spawn(Spawn {
                        id: cx.fresh_task_id(),
                        task: eval_task(&self.expr, at),
                        sink: Sink::Parent(cx.me()),
                    });
                }
                TailState::Relay => match cx.pop_msg() {
                    Some(ChildMsg::Outcome(_, outcome)) => {
                        return Directive::Emit(self.rejoin(outcome));
                    }
                    Some(ChildMsg::Finished(_)) => self.child_done = true,
                    None if self.child_done => return Directive::Done,
                    None => return Directive::WaitEvent(cx.inbox_event()),
                },
            }
        }
    }
}
