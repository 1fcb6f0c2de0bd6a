// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Named boolean predicates over ambient host state.

use std::fmt;
use std::rc::Rc;

/// A pure boolean probe of host state, sampled at a single cycle.
///
/// The closure must not block and must not call back into the engine that is
/// evaluating it; both are contract violations and leave the engine in an
/// undefined state. Predicates are shared by reference: cloning a `Pred`
/// clones a handle, not the closure.
#[derive(Clone)]
pub struct Pred {
    name: Rc<str>,
    probe: Rc<dyn Fn() -> bool>,
}

impl Pred {
    pub fn new(name: impl Into<String>, probe: impl Fn() -> bool + 'static) -> Self {
        Self {
            name: Rc::from(name.into()),
            probe: Rc::new(probe),
        }
    }

    /// The identity that trace leaves carry for this predicate.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_shared(&self) -> Rc<str> {
        self.name.clone()
    }

    /// Sample the predicate against current host state.
    pub fn sample(&self) -> bool {
        (self.probe)()
    }
}

impl fmt::Debug for Pred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pred").field("name", &self.name).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn sample_sees_current_state() {
        let flag = Rc::new(Cell::new(false));
        let f = flag.clone();
        let p = Pred::new("flag", move || f.get());
        assert!(!p.sample());
        flag.set(true);
        assert!(p.sample());
    }

    #[test]
    fn clone_shares_the_probe() {
        let hits = Rc::new(Cell::new(0u32));
        let h = hits.clone();
        let p = Pred::new("counted", move || {
            h.set(h.get() + 1);
            true
        });
        let q = p.clone();
        p.sample();
        q.sample();
        assert_eq!(hits.get(), 2);
        assert_eq!(q.name(), "counted");
    }
}
