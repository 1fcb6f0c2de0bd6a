// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The engine: a single-threaded cooperative runloop over virtual time.
//!
//! State is a FIFO ready queue, a stable min-ordered timer queue, one FIFO
//! wait list per event, and the virtual clock. The host drives everything:
//! `post_at` schedules an event posting, `run_until` fires due timers in
//! order and drains the ready queue to quiescence at each instant before
//! advancing to the next.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use tracing::trace;

use oroboro_expr::Outcome;

use crate::task::{ChildMsg, Directive, Sink, Spawn, Task, TaskCtx};
use crate::{EventId, TaskId, VirtualTime};

/// Errors from host-facing engine calls.
///
/// After an error from `run_until` the engine state is undefined; the host
/// should drop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RtError {
    #[error("cannot post at {at}: virtual time is already {now}")]
    PastPost { at: VirtualTime, now: VirtualTime },

    #[error("cannot run until {target}: virtual time is already {now}")]
    TimeReversal { target: VirtualTime, now: VirtualTime },

    #[error("event {0:?} does not belong to this engine")]
    UnknownEvent(EventId),
}

/// Where a suspended task is parked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Park {
    /// In the ready queue, or currently being stepped.
    Ready,
    /// On an event's wait list.
    Event(EventId),
    /// On a timer wake.
    Timer,
}

struct TaskEntry {
    task: Option<Box<dyn Task>>,
    sink: Sink,
    parent: Option<TaskId>,
    children: Vec<TaskId>,
    inbox: VecDeque<ChildMsg>,
    inbox_event: EventId,
    park: Park,
    cancelled: bool,
}

/// What a due timer does.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Fire {
    Post(EventId),
    Wake(TaskId),
}

/// A scheduled firing. Ordered by time, then by insertion sequence, so
/// same-instant timers fire in the order they were scheduled.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Timer {
    at: VirtualTime,
    seq: u64,
    fire: Fire,
}

/// A cooperative engine instance. Single-threaded; one per monitored design,
/// any number per process.
pub struct Engine {
    now: VirtualTime,
    ready: VecDeque<TaskId>,
    timers: BinaryHeap<Reverse<Timer>>,
    timer_seq: u64,
    /// FIFO wait list per event, indexed by `EventId`.
    waiters: Vec<VecDeque<TaskId>>,
    tasks: HashMap<TaskId, TaskEntry>,
    next_task: u32,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            now: 0,
            ready: VecDeque::new(),
            timers: BinaryHeap::new(),
            timer_seq: 0,
            waiters: Vec::new(),
            tasks: HashMap::new(),
            next_task: 0,
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Create a new event.
    pub fn event(&mut self) -> EventId {
        let id = EventId(self.waiters.len() as u32);
        self.waiters.push(VecDeque::new());
        id
    }

    pub fn event_count(&self) -> usize {
        self.waiters.len()
    }

    /// Number of live tasks, including parked ones.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Install a root task and queue it ready. It runs on the next
    /// `run_until`.
    pub fn start(&mut self, task: Box<dyn Task>, sink: Sink) -> TaskId {
        let id = TaskId(self.next_task);
        self.next_task += 1;
        let inbox_event = self.event();
        trace!(task = id.0, name = task.name(), "start");
        self.tasks.insert(
            id,
            TaskEntry {
                task: Some(task),
                sink,
                parent: None,
                children: Vec::new(),
                inbox: VecDeque::new(),
                inbox_event,
                park: Park::Ready,
                cancelled: false,
            },
        );
        self.ready.push_back(id);
        id
    }

    /// Schedule `event` to be posted when virtual time reaches `at`.
    pub fn post_at(&mut self, at: VirtualTime, event: EventId) -> Result<(), RtError> {
        self.check_event(event)?;
        if at < self.now {
            return Err(RtError::PastPost { at, now: self.now });
        }
        self.arm_timer(at, Fire::Post(event));
        Ok(())
    }

    /// Post `event` at the current instant. Waiters move to the ready queue
    /// and run on the next `run_until` (or later in the current drain when
    /// called from within it).
    pub fn post_now(&mut self, event: EventId) -> Result<(), RtError> {
        self.check_event(event)?;
        self.do_post(event);
        Ok(())
    }

    /// Cancel a task and everything it spawned. The task is released at its
    /// next dispatch without emitting anything further.
    pub fn cancel(&mut self, id: TaskId) {
        let (park, kids) = {
            let Some(entry) = self.tasks.get_mut(&id) else { return };
            if entry.cancelled {
                return;
            }
            entry.cancelled = true;
            let park = entry.park;
            entry.park = Park::Ready;
            (park, entry.children.clone())
        };
        trace!(task = id.0, "cancel");
        match park {
            Park::Event(ev) => {
                self.waiters[ev.0 as usize].retain(|t| *t != id);
                self.ready.push_back(id);
            }
            // A stale timer wake is ignored: it checks for `Park::Timer`.
            Park::Timer => self.ready.push_back(id),
            // Already queued or currently running; released at dispatch.
            Park::Ready => {}
        }
        for child in kids {
            self.cancel(child);
        }
    }

    /// Advance virtual time to `target`, firing every due timer in order and
    /// draining the ready queue to quiescence at each instant. On return
    /// `now` equals `target`.
    pub fn run_until(&mut self, target: VirtualTime) -> Result<(), RtError> {
        if target < self.now {
            return Err(RtError::TimeReversal { target, now: self.now });
        }
        self.drain_ready()?;
        while self.timers.peek().is_some_and(|t| t.0.at <= target) {
            let Some(Reverse(timer)) = self.timers.pop() else { break };
            self.now = timer.at;
            match timer.fire {
                Fire::Post(event) => self.do_post(event),
                Fire::Wake(task) => self.wake(task),
            }
            self.drain_ready()?;
        }
        self.now = target;
        Ok(())
    }

    fn check_event(&self, event: EventId) -> Result<(), RtError> {
        if (event.0 as usize) < self.waiters.len() {
            Ok(())
        } else {
            Err(RtError::UnknownEvent(event))
        }
    }

    fn arm_timer(&mut self, at: VirtualTime, fire: Fire) {
        let seq = self.timer_seq;
        self.timer_seq += 1;
        self.timers.push(Reverse(Timer { at, seq, fire }));
    }

    /// Move all of an event's waiters to the ready queue, preserving FIFO
    /// order. Posting with no waiters is a no-op; earlier postings never
    /// wake later waits.
    fn do_post(&mut self, event: EventId) {
        let woken = std::mem::take(&mut self.waiters[event.0 as usize]);
        trace!(event = event.0, woken = woken.len(), "post");
        for id in woken {
            if let Some(entry) = self.tasks.get_mut(&id) {
                entry.park = Park::Ready;
                self.ready.push_back(id);
            }
        }
    }

    fn wake(&mut self, id: TaskId) {
        if let Some(entry) = self.tasks.get_mut(&id) {
            if entry.park == Park::Timer {
                entry.park = Park::Ready;
                self.ready.push_back(id);
            }
        }
    }

    fn drain_ready(&mut self) -> Result<(), RtError> {
        while let Some(id) = self.ready.pop_front() {
            self.dispatch(id)?;
        }
        Ok(())
    }

    /// Step one task until it suspends or finishes, interpreting the
    /// non-suspending directives inline.
    fn dispatch(&mut self, id: TaskId) -> Result<(), RtError> {
        let cancelled = match self.tasks.get(&id) {
            None => return Ok(()),
            Some(entry) => entry.cancelled,
        };
        if cancelled {
            self.finish(id);
            return Ok(());
        }

        // Take the task object and inbox out of the entry so the engine can
        // be borrowed freely while the task runs.
        let Some(entry) = self.tasks.get_mut(&id) else { return Ok(()) };
        let Some(mut task) = entry.task.take() else { return Ok(()) };
        let mut inbox = std::mem::take(&mut entry.inbox);
        let inbox_event = entry.inbox_event;
        entry.park = Park::Ready;

        loop {
            let mut cx = TaskCtx::new(self.now, id, inbox_event, &mut inbox, &mut self.next_task);
            let directive = task.step(&mut cx);
            let cancels = cx.take_cancels();
            for child in cancels {
                self.cancel(child);
            }
            match directive {
                Directive::WaitEvent(event) => {
                    self.check_event(event)?;
                    self.suspend(id, task, inbox, Park::Event(event));
                    return Ok(());
                }
                Directive::WaitTimeout(dt) => {
                    let park = if dt == 0 {
                        Park::Ready
                    } else {
                        self.arm_timer(self.now + dt, Fire::Wake(id));
                        Park::Timer
                    };
                    self.suspend(id, task, inbox, park);
                    return Ok(());
                }
                Directive::Spawn(spawn) => self.adopt(id, spawn),
                Directive::Emit(outcome) => self.route(id, outcome),
                Directive::Done => {
                    self.finish(id);
                    return Ok(());
                }
            }
        }
    }

    /// Put a stepped task back into its entry and park it. A cancellation
    /// that arrived while it ran overrides the park so the task is promptly
    /// released.
    fn suspend(&mut self, id: TaskId, task: Box<dyn Task>, inbox: VecDeque<ChildMsg>, park: Park) {
        let Some(entry) = self.tasks.get_mut(&id) else { return };
        entry.task = Some(task);
        entry.inbox = inbox;
        let park = if entry.cancelled { Park::Ready } else { park };
        entry.park = park;
        match park {
            Park::Ready => self.ready.push_back(id),
            Park::Event(event) => self.waiters[event.0 as usize].push_back(id),
            Park::Timer => {}
        }
    }

    /// Install a spawned child: ready immediately, child of the spawner.
    fn adopt(&mut self, parent: TaskId, spawn: Spawn) {
        debug_assert!(!self.tasks.contains_key(&spawn.id), "spawn id reuse");
        let inbox_event = self.event();
        trace!(task = spawn.id.0, parent = parent.0, name = spawn.task.name(), "spawn");
        self.tasks.insert(
            spawn.id,
            TaskEntry {
                task: Some(spawn.task),
                sink: spawn.sink,
                parent: Some(parent),
                children: Vec::new(),
                inbox: VecDeque::new(),
                inbox_event,
                park: Park::Ready,
                cancelled: false,
            },
        );
        if let Some(entry) = self.tasks.get_mut(&parent) {
            entry.children.push(spawn.id);
        }
        self.ready.push_back(spawn.id);
    }

    /// Deliver an emission to the emitter's sink.
    fn route(&mut self, from: TaskId, outcome: Outcome) {
        let sink = match self.tasks.get(&from) {
            Some(entry) => entry.sink.clone(),
            None => return,
        };
        match sink {
            Sink::Parent(parent) => self.deliver(parent, ChildMsg::Outcome(from, outcome)),
            Sink::Hooks { on_match, on_fail } => {
                let hook = if outcome.is_match() { on_match } else { on_fail };
                let mut hook = hook.borrow_mut();
                (&mut *hook)(&outcome);
            }
            Sink::Discard => {}
        }
    }

    /// Push a message into a task's inbox and post its inbox event.
    fn deliver(&mut self, to: TaskId, msg: ChildMsg) {
        let Some(entry) = self.tasks.get_mut(&to) else { return };
        if entry.cancelled {
            return;
        }
        entry.inbox.push_back(msg);
        let inbox_event = entry.inbox_event;
        self.do_post(inbox_event);
    }

    /// Release a task: cancel any children it left behind, unlink it from
    /// its spawner, and tell its sink parent it finished.
    fn finish(&mut self, id: TaskId) {
        let Some(entry) = self.tasks.remove(&id) else { return };
        trace!(task = id.0, "finish");
        for child in entry.children {
            self.cancel(child);
        }
        if let Some(parent) = entry.parent {
            if let Some(parent_entry) = self.tasks.get_mut(&parent) {
                parent_entry.children.retain(|c| *c != id);
            }
        }
        if let Sink::Parent(parent) = entry.sink {
            self.deliver(parent, ChildMsg::Finished(id));
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records its label every time it runs, then parks per its script.
    struct Script {
        label: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
        steps: VecDeque<Directive>,
    }

    impl Script {
        fn new(
            label: &'static str,
            log: &Rc<RefCell<Vec<&'static str>>>,
            steps: Vec<Directive>,
        ) -> Box<Self> {
            Box::new(Self { label, log: log.clone(), steps: steps.into() })
        }
    }

    impl Task for Script {
        fn step(&mut self, _cx: &mut TaskCtx<'_>) -> Directive {
            self.log.borrow_mut().push(self.label);
            self.steps.pop_front().unwrap_or(Directive::Done)
        }
    }

    #[test]
    fn waiters_wake_in_fifo_order() {
        let mut engine = Engine::new();
        let ev = engine.event();
        let log = Rc::new(RefCell::new(Vec::new()));
        engine.start(Script::new("first", &log, vec![Directive::WaitEvent(ev)]), Sink::Discard);
        engine.start(Script::new("second", &log, vec![Directive::WaitEvent(ev)]), Sink::Discard);
        engine.run_until(0).unwrap();
        assert_eq!(*log.borrow(), vec!["first", "second"]);

        engine.post_at(5, ev).unwrap();
        engine.run_until(5).unwrap();
        assert_eq!(*log.borrow(), vec!["first", "second", "first", "second"]);
    }

    #[test]
    fn post_before_wait_does_not_wake() {
        let mut engine = Engine::new();
        let ev = engine.event();
        let log = Rc::new(RefCell::new(Vec::new()));
        // Posting happens at t=0; the task only starts waiting afterwards.
        engine.post_now(ev).unwrap();
        engine.start(Script::new("late", &log, vec![Directive::WaitEvent(ev)]), Sink::Discard);
        engine.run_until(10).unwrap();
        // One run (to the wait), no wake.
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(engine.task_count(), 1);
    }

    #[test]
    fn timeout_zero_requeues_at_the_back() {
        let mut engine = Engine::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        engine.start(
            Script::new("spin", &log, vec![Directive::WaitTimeout(0), Directive::WaitTimeout(0)]),
            Sink::Discard,
        );
        engine.start(Script::new("other", &log, vec![]), Sink::Discard);
        engine.run_until(0).unwrap();
        // The spinner yields between steps, letting the other task in.
        assert_eq!(*log.borrow(), vec!["spin", "other", "spin", "spin"]);
    }

    #[test]
    fn wait_timeout_wakes_after_the_delay() {
        let mut engine = Engine::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        engine.start(
            Script::new("sleeper", &log, vec![Directive::WaitTimeout(5)]),
            Sink::Discard,
        );
        engine.run_until(3).unwrap();
        // Parked; the wake is due at t=5.
        assert_eq!(log.borrow().len(), 1);
        engine.run_until(10).unwrap();
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(engine.task_count(), 0);
    }

    #[test]
    fn timers_fire_in_time_then_insertion_order() {
        let mut engine = Engine::new();
        let ev_a = engine.event();
        let ev_b = engine.event();
        let log = Rc::new(RefCell::new(Vec::new()));
        engine.start(Script::new("a", &log, vec![Directive::WaitEvent(ev_a)]), Sink::Discard);
        engine.start(Script::new("b", &log, vec![Directive::WaitEvent(ev_b)]), Sink::Discard);
        engine.run_until(0).unwrap();
        log.borrow_mut().clear();

        engine.post_at(7, ev_b).unwrap();
        engine.post_at(3, ev_a).unwrap();
        engine.run_until(10).unwrap();
        assert_eq!(*log.borrow(), vec!["a", "b"]);
        assert_eq!(engine.now(), 10);
    }

    #[test]
    fn time_is_monotone_and_reversals_are_rejected() {
        let mut engine = Engine::new();
        let ev = engine.event();
        engine.run_until(5).unwrap();
        assert_eq!(engine.now(), 5);
        assert_eq!(
            engine.run_until(4),
            Err(RtError::TimeReversal { target: 4, now: 5 })
        );
        assert_eq!(engine.post_at(3, ev), Err(RtError::PastPost { at: 3, now: 5 }));
        // Posting at the current instant is allowed.
        engine.post_at(5, ev).unwrap();
    }

    #[test]
    fn foreign_event_is_rejected() {
        let mut other = Engine::new();
        let foreign = {
            other.event();
            other.event()
        };
        let mut engine = Engine::new();
        assert_eq!(engine.post_at(0, foreign), Err(RtError::UnknownEvent(foreign)));
    }

    #[test]
    fn cancelled_task_is_released_without_running() {
        let mut engine = Engine::new();
        let ev = engine.event();
        let log = Rc::new(RefCell::new(Vec::new()));
        let id = engine.start(
            Script::new("victim", &log, vec![Directive::WaitEvent(ev), Directive::WaitEvent(ev)]),
            Sink::Discard,
        );
        engine.run_until(0).unwrap();
        assert_eq!(log.borrow().len(), 1);

        engine.cancel(id);
        engine.post_at(1, ev).unwrap();
        engine.run_until(1).unwrap();
        // Never stepped again, and gone.
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(engine.task_count(), 0);
    }

    #[test]
    fn posting_an_event_with_no_waiters_is_a_noop() {
        let mut engine = Engine::new();
        let ev = engine.event();
        engine.post_now(ev).unwrap();
        engine.run_until(3).unwrap();
        assert_eq!(engine.now(), 3);
    }

    use oroboro_expr::{Outcome, Pred, Trace};

    fn outcome(start: u64, end: u64) -> Outcome {
        Outcome::matched(start, end, Trace::leaf(start, &Pred::new("t", || true), true))
    }

    /// Emits one fixed outcome, then finishes.
    struct Emitter {
        outcome: Option<Outcome>,
    }

    impl Task for Emitter {
        fn step(&mut self, _cx: &mut TaskCtx<'_>) -> Directive {
            match self.outcome.take() {
                Some(out) => Directive::Emit(out),
                None => Directive::Done,
            }
        }
    }

    /// Spawns one emitter child and records everything its inbox receives.
    struct Collector {
        received: Rc<RefCell<Vec<ChildMsg>>>,
        spawned: bool,
    }

    impl Task for Collector {
        fn step(&mut self, cx: &mut TaskCtx<'_>) -> Directive {
            if !self.spawned {
                self.spawned = true;
                return Directive::Spawn(Spawn {
                    id: cx.fresh_task_id(),
                    task: Box::new(Emitter { outcome: Some(outcome(1, 2)) }),
                    sink: Sink::Parent(cx.me()),
                });
            }
            while let Some(msg) = cx.pop_msg() {
                let done = matches!(msg, ChildMsg::Finished(_));
                self.received.borrow_mut().push(msg);
                if done {
                    return Directive::Done;
                }
            }
            Directive::WaitEvent(cx.inbox_event())
        }
    }

    #[test]
    fn child_emissions_arrive_in_order_then_finished() {
        let mut engine = Engine::new();
        let received = Rc::new(RefCell::new(Vec::new()));
        engine.start(
            Box::new(Collector { received: received.clone(), spawned: false }),
            Sink::Discard,
        );
        engine.run_until(0).unwrap();

        let received = received.borrow();
        assert_eq!(received.len(), 2);
        assert!(matches!(&received[0], ChildMsg::Outcome(_, out) if out.span() == Some((1, 2))));
        assert!(matches!(received[1], ChildMsg::Finished(_)));
        // Everything wound down.
        assert_eq!(engine.task_count(), 0);
    }

    #[test]
    fn hook_sink_routes_matches_and_failures_apart() {
        let mut engine = Engine::new();
        let matched = Rc::new(RefCell::new(0u32));
        let failed = Rc::new(RefCell::new(0u32));
        let m = matched.clone();
        let f = failed.clone();
        let sink = Sink::Hooks {
            on_match: Rc::new(RefCell::new(move |_: &Outcome| *m.borrow_mut() += 1)),
            on_fail: Rc::new(RefCell::new(move |_: &Outcome| *f.borrow_mut() += 1)),
        };
        engine.start(Box::new(Emitter { outcome: Some(outcome(0, 0)) }), sink.clone());
        let fail = Outcome::failed(3, Trace::leaf(3, &Pred::new("t", || false), false));
        engine.start(Box::new(Emitter { outcome: Some(fail) }), sink);
        engine.run_until(0).unwrap();
        assert_eq!(*matched.borrow(), 1);
        assert_eq!(*failed.borrow(), 1);
    }
}
