// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The Oroboro cooperative engine.
//!
//! A strictly single-threaded runloop over virtual time. The host advances
//! time with `run_until` and schedules event postings with `post_at`; tasks
//! suspend by yielding directives and wake when an event they wait on is
//! posted or a timeout elapses. There is no preemption and no parallelism:
//! "concurrent" tasks are interleaved at their suspension points, in FIFO
//! order within one virtual instant.
//!
//! Components:
//! - events — identities tasks wait on; posting wakes all current waiters
//! - tasks — directive-yielding state machines with a sink and an inbox
//! - engine — ready queue, stable timer queue, wait lists, virtual clock

pub mod engine;
pub mod task;

pub use engine::{Engine, RtError};
pub use task::{ChildMsg, Directive, OutcomeHook, Sink, Spawn, Task, TaskCtx};

/// Virtual time. Monotonically non-decreasing; supplied by the host and
/// never invented by the engine.
pub type VirtualTime = u64;

/// Identity of an event within one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u32);

/// Identity of a task within one engine. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u32);
