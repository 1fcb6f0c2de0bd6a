// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Operator evaluator tasks.
//!
//! Every combinator follows the same discipline: spawn child evaluations,
//! drain the inbox, react to each message, and finish once every child has.
//! [`Comb`] owns that loop; each operator supplies the reactions as a
//! [`Logic`] implementation. Directives produced by a reaction are queued in
//! the [`Relay`] and flushed one per `step` call, since a task yields exactly
//! one directive at a time.

pub(crate) mod alt;
pub(crate) mod cond;
pub(crate) mod conj;
pub(crate) mod filter;
pub(crate) mod inter;
pub(crate) mod inv;
pub(crate) mod pred;
pub(crate) mod repeat;
pub(crate) mod seq;

use std::collections::VecDeque;

use oroboro_expr::Outcome;
use oroboro_rt::{ChildMsg, Directive, Sink, Spawn, Task, TaskCtx, TaskId};

/// Outbound side of a combinator: queued directives plus the live-child
/// count the shared loop finishes on.
pub(crate) struct Relay {
    out: VecDeque<Directive>,
    live: usize,
}

impl Relay {
    fn new() -> Self {
        Self { out: VecDeque::new(), live: 0 }
    }

    /// Queue a child spawn whose outputs come back to this task's inbox.
    pub fn spawn(&mut self, cx: &mut TaskCtx<'_>, task: Box<dyn Task>) -> TaskId {
        let id = cx.fresh_task_id();
        self.live += 1;
        self.out.push_back(Directive::Spawn(Spawn {
            id,
            task,
            sink: Sink::Parent(cx.me()),
        }));
        id
    }

    /// Queue an outcome for this task's own sink.
    pub fn emit(&mut self, outcome: Outcome) {
        self.out.push_back(Directive::Emit(outcome));
    }
}

/// Inner behavior of a combinator task, driven by the shared [`Comb`] loop.
pub(crate) trait Logic {
    const NAME: &'static str;

    /// Initial child spawns, before any message can arrive.
    fn boot(&mut self, re: &mut Relay, cx: &mut TaskCtx<'_>);

    /// React to one inbox message. `Finished` bookkeeping for the live count
    /// is already done; the message is still passed through for operators
    /// that track which child concluded.
    fn on_msg(&mut self, msg: ChildMsg, re: &mut Relay, cx: &mut TaskCtx<'_>);

    /// Every child has finished and the queue is flushed; emit any merged
    /// verdict before the task is released.
    fn conclude(&mut self, _re: &mut Relay) {}
}

/// The shared combinator loop: flush queued directives, drain the inbox,
/// park on the inbox event when idle, conclude when no children remain.
pub(crate) struct Comb<L: Logic> {
    logic: L,
    relay: Relay,
    booted: bool,
    concluded: bool,
}

impl<L: Logic + 'static> Comb<L> {
    pub fn task(logic: L) -> Box<dyn Task> {
        Box::new(Self { logic, relay: Relay::new(), booted: false, concluded: false })
    }
}

impl<L: Logic> Task for Comb<L> {
    fn name(&self) -> &'static str {
        L::NAME
    }

    fn step(&mut self, cx: &mut TaskCtx<'_>) -> Directive {
        if !self.booted {
            self.booted = true;
            self.logic.boot(&mut self.relay, cx);
        }
        loop {
            if let Some(directive) = self.relay.out.pop_front() {
                return directive;
            }
            match cx.pop_msg() {
                Some(msg) => {
                    if matches!(msg, ChildMsg::Finished(_)) {
                        self.relay.live -= 1;
                    }
                    self.logic.on_msg(msg, &mut self.relay, cx);
                }
                None if self.relay.live == 0 => {
                    if self.concluded {
                        return Directive::Done;
                    }
                    self.concluded = true;
                    self.logic.conclude(&mut self.relay);
                }
                None => return Directive::WaitEvent(cx.inbox_event()),
            }
        }
    }
}
