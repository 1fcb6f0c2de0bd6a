// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Shared test bench: a host loop driving boolean signals and one `always`
//! assertion, with the outcome streams collected for assertions.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use oroboro_eval::always;
use oroboro_expr::{Expr, Pred};
use oroboro_rt::{Engine, EventId};

/// One boolean signal the host rewrites before each tick.
#[derive(Clone)]
pub struct Signal {
    name: &'static str,
    level: Rc<Cell<bool>>,
}

impl Signal {
    pub fn new(name: &'static str) -> Self {
        Self { name, level: Rc::new(Cell::new(false)) }
    }

    pub fn set(&self, level: bool) {
        self.level.set(level);
    }

    /// An expression sampling this signal.
    pub fn expr(&self) -> Expr {
        let level = self.level.clone();
        Expr::pred(Pred::new(self.name, move || level.get()))
    }
}

/// An engine plus one monitored expression and its collected outcomes.
pub struct Bench {
    engine: Engine,
    sampler: EventId,
    matches: Rc<RefCell<Vec<(u64, u64)>>>,
    fails: Rc<RefCell<Vec<u64>>>,
    ticks: u64,
}

impl Bench {
    pub fn new(expr: Expr) -> Self {
        let mut engine = Engine::new();
        let sampler = engine.event();
        let matches = Rc::new(RefCell::new(Vec::new()));
        let fails = Rc::new(RefCell::new(Vec::new()));
        let collected_matches = matches.clone();
        let collected_fails = fails.clone();
        always(
            &mut engine,
            sampler,
            expr,
            move |out| {
                let span = out.span().expect("match without span");
                collected_matches.borrow_mut().push(span);
            },
            move |out| collected_fails.borrow_mut().push(out.cycle()),
        );
        Self { engine, sampler, matches, fails, ticks: 0 }
    }

    /// One host tick: signals are already set for the new cycle; post the
    /// sampler and run the engine to quiescence at this instant.
    pub fn tick(&mut self) {
        let t = self.ticks;
        self.ticks += 1;
        self.engine.post_at(t, self.sampler).unwrap();
        self.engine.run_until(t).unwrap();
    }

    /// Drive one signal through a bit pattern, one tick per bit.
    pub fn play(&mut self, signal: &Signal, bits: &[u8]) {
        for &bit in bits {
            signal.set(bit != 0);
            self.tick();
        }
    }

    /// Drive several signals in lockstep, one tick per column.
    pub fn play_all(&mut self, tracks: &[(&Signal, &[u8])]) {
        let len = tracks.iter().map(|(_, bits)| bits.len()).max().unwrap_or(0);
        for i in 0..len {
            for (signal, bits) in tracks {
                if let Some(&bit) = bits.get(i) {
                    signal.set(bit != 0);
                }
            }
            self.tick();
        }
    }

    /// All match spans across all evaluations, sorted.
    pub fn matches(&self) -> Vec<(u64, u64)> {
        let mut spans = self.matches.borrow().clone();
        spans.sort_unstable();
        spans
    }

    /// All failure cycles across all evaluations, sorted.
    pub fn fails(&self) -> Vec<u64> {
        let mut cycles = self.fails.borrow().clone();
        cycles.sort_unstable();
        cycles
    }
}
