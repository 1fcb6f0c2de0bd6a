// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Tasks: directive-yielding cooperative state machines.
//!
//! A task is not a thread. The engine pops it from the ready queue and calls
//! `step` repeatedly; each call returns one directive. `Spawn` and `Emit` do
//! not suspend (the engine interprets them and steps the task again);
//! `WaitEvent` and `WaitTimeout` park the task; `Done` releases it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use oroboro_expr::Outcome;

use crate::{EventId, TaskId, VirtualTime};

/// A user callback invoked with outcomes routed to a hook sink.
///
/// Hooks run inside `run_until` and must not call back into the engine.
pub type OutcomeHook = Rc<RefCell<dyn FnMut(&Outcome)>>;

/// Where a task's emissions go.
#[derive(Clone)]
pub enum Sink {
    /// Into the inbox of the task that spawned this one.
    Parent(TaskId),
    /// To a user callback pair: matches left, failures right.
    Hooks { on_match: OutcomeHook, on_fail: OutcomeHook },
    /// Dropped. Used by roots that only spawn, like the assertion driver.
    Discard,
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Parent(id) => f.debug_tuple("Parent").field(id).finish(),
            Sink::Hooks { .. } => f.write_str("Hooks"),
            Sink::Discard => f.write_str("Discard"),
        }
    }
}

/// A message delivered into a parent task's inbox.
#[derive(Debug, Clone)]
pub enum ChildMsg {
    /// A child emitted an outcome.
    Outcome(TaskId, Outcome),
    /// A child ran to completion (or was cancelled) and was released.
    Finished(TaskId),
}

/// A spawn request: the child's pre-allocated id (from
/// [`TaskCtx::fresh_task_id`]), its task object, and the sink its outputs
/// route to.
pub struct Spawn {
    pub id: TaskId,
    pub task: Box<dyn Task>,
    pub sink: Sink,
}

/// What a task asks the engine to do next.
pub enum Directive {
    /// Park until `event` is next posted. Earlier postings do not count.
    WaitEvent(EventId),
    /// Park until virtual time advances by `dt`. A `dt` of zero re-queues
    /// the task at the back of the ready queue at the current instant.
    WaitTimeout(VirtualTime),
    /// Hand a child to the engine. Does not suspend the caller.
    Spawn(Spawn),
    /// Deliver an outcome to this task's sink. Does not suspend the caller.
    Emit(Outcome),
    /// Finished; the engine releases the task and notifies its sink parent.
    Done,
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::WaitEvent(e) => f.debug_tuple("WaitEvent").field(e).finish(),
            Directive::WaitTimeout(dt) => f.debug_tuple("WaitTimeout").field(dt).finish(),
            Directive::Spawn(s) => f.debug_tuple("Spawn").field(&s.id).finish(),
            Directive::Emit(o) => f.debug_tuple("Emit").field(o).finish(),
            Directive::Done => f.write_str("Done"),
        }
    }
}

/// A suspendable cooperative computation driven by the engine.
pub trait Task {
    /// Run until the next directive. Called again immediately after `Spawn`
    /// and `Emit`; otherwise called on the next wake.
    fn step(&mut self, cx: &mut TaskCtx<'_>) -> Directive;

    /// Name for logging.
    fn name(&self) -> &'static str {
        "task"
    }
}

/// Per-dispatch view a task gets of the engine.
pub struct TaskCtx<'a> {
    now: VirtualTime,
    me: TaskId,
    inbox_event: EventId,
    inbox: &'a mut VecDeque<ChildMsg>,
    next_task: &'a mut u32,
    cancels: Vec<TaskId>,
}

impl<'a> TaskCtx<'a> {
    pub(crate) fn new(
        now: VirtualTime,
        me: TaskId,
        inbox_event: EventId,
        inbox: &'a mut VecDeque<ChildMsg>,
        next_task: &'a mut u32,
    ) -> Self {
        Self { now, me, inbox_event, inbox, next_task, cancels: Vec::new() }
    }

    /// Current virtual time.
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// This task's own id, used as the sink for spawned children.
    pub fn me(&self) -> TaskId {
        self.me
    }

    /// The event posted whenever a message lands in this task's inbox.
    pub fn inbox_event(&self) -> EventId {
        self.inbox_event
    }

    /// Take the next inbox message, oldest first.
    pub fn pop_msg(&mut self) -> Option<ChildMsg> {
        self.inbox.pop_front()
    }

    /// Allocate an id for a child about to be spawned via
    /// [`Directive::Spawn`].
    pub fn fresh_task_id(&mut self) -> TaskId {
        let id = TaskId(*self.next_task);
        *self.next_task += 1;
        id
    }

    /// Request cancellation of a child. Applied by the engine as soon as the
    /// current `step` returns; the child is released at its next dispatch
    /// without emitting anything further, and its own children go with it.
    pub fn cancel(&mut self, id: TaskId) {
        self.cancels.push(id);
    }

    pub(crate) fn take_cancels(&mut self) -> Vec<TaskId> {
        std::mem::take(&mut self.cancels)
    }
}
