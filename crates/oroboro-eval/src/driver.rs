// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The `always` assertion driver.
//!
//! One driver task waits on the sampling event and, at every posting, spawns
//! a fresh evaluation of the monitored expression starting at the cycle that
//! posting opens. Evaluations report straight to the user callbacks; the
//! driver itself emits nothing and runs until cancelled or the engine is
//! dropped.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use oroboro_expr::{Cycle, Expr, Outcome};
use oroboro_rt::{Directive, Engine, EventId, Sink, Spawn, Task, TaskCtx, TaskId};

use crate::eval::{eval_task, EvalCtx};

/// Build a hook sink from a callback pair. Hooks run inside `run_until` and
/// must not call back into the engine.
pub fn hooks(
    on_match: impl FnMut(&Outcome) + 'static,
    on_fail: impl FnMut(&Outcome) + 'static,
) -> Sink {
    Sink::Hooks {
        on_match: Rc::new(RefCell::new(on_match)),
        on_fail: Rc::new(RefCell::new(on_fail)),
    }
}

/// Assert `expr` on every cycle: each posting of `sampler` launches a fresh
/// evaluation, and every match or failure any evaluation emits reaches
/// `on_match` or `on_fail`. Returns the driver's task id so the host can
/// cancel the assertion.
pub fn always(
    engine: &mut Engine,
    sampler: EventId,
    expr: Expr,
    on_match: impl FnMut(&Outcome) + 'static,
    on_fail: impl FnMut(&Outcome) + 'static,
) -> TaskId {
    let sink = hooks(on_match, on_fail);
    engine.start(Box::new(AlwaysTask::new(sampler, expr, sink)), Sink::Discard)
}

enum DriverState {
    /// Park until the next sampler posting.
    Wait,
    /// Woken by a posting: launch this cycle's evaluation.
    Fire,
}

struct AlwaysTask {
    sampler: EventId,
    expr: Expr,
    sink: Sink,
    cycle: Cycle,
    state: DriverState,
}

impl AlwaysTask {
    fn new(sampler: EventId, expr: Expr, sink: Sink) -> Self {
        Self { sampler, expr, sink, cycle: 0, state: DriverState::Wait }
    }
}

impl Task for AlwaysTask {
    fn name(&self) -> &'static str {
        "always"
    }

    fn step(&mut self, cx: &mut TaskCtx<'_>) -> Directive {
        match self.state {
            DriverState::Wait => {
                self.state = DriverState::Fire;
                Directive::WaitEvent(self.sampler)
            }
            DriverState::Fire => {
                let at = EvalCtx::new(self.sampler, self.cycle);
                debug!(cycle = self.cycle, "always: launch evaluation");
                self.cycle += 1;
                self.state = DriverState::Wait;
                Directive::Spawn(Spawn {
                    id: cx.fresh_task_id(),
                    task: eval_task(&self.expr, at),
                    sink: self.sink.clone(),
                })
            }
        }
    }
}
