// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Quantified invariants, checked on concrete sequences.

mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{Bench, Signal};
use oroboro_expr::{firstof, once, Expr, Pred};

#[test]
fn vacuous_conditional_matches_exactly_once_per_evaluation() {
    let never = Signal::new("never");
    let b = Signal::new("b");
    let mut bench = Bench::new(never.expr() >> b.expr());
    bench.play_all(&[(&never, &[0, 0, 0]), (&b, &[1, 0, 1])]);
    // Each evaluation's antecedent fails at its start cycle; each emits one
    // vacuous match there and no failure.
    assert_eq!(bench.matches(), vec![(0, 0), (1, 1), (2, 2)]);
    assert_eq!(bench.fails(), vec![]);
}

#[test]
fn double_negation_preserves_the_outcome_pattern() {
    let bits = [0, 1, 0, 1, 1];

    let a = Signal::new("a");
    let mut plain = Bench::new(a.expr());
    plain.play(&a, &bits);

    let a2 = Signal::new("a");
    let mut doubled = Bench::new(!!a2.expr());
    doubled.play(&a2, &bits);

    assert_eq!(doubled.matches(), plain.matches());
    assert_eq!(doubled.fails(), plain.fails());
}

#[test]
fn concatenation_spans_start_at_the_start_and_extend() {
    let a = Signal::new("a");
    let mut bench = Bench::new(a.expr() + a.expr());
    bench.play(&a, &[1, 1, 1, 0]);
    for (start, end) in bench.matches() {
        assert!(end >= start + 1);
    }
    assert_eq!(bench.matches(), vec![(0, 1), (1, 2)]);
}

#[test]
fn fusion_can_match_within_a_single_cycle() {
    let a = Signal::new("a");
    let mut bench = Bench::new(a.expr() / a.expr());
    bench.play(&a, &[1, 0]);
    assert_eq!(bench.matches(), vec![(0, 0)]);
}

#[test]
fn alternation_matches_are_the_union_of_branch_matches() {
    let x_bits = [1, 1, 0];
    let y_bits = [0, 1, 0];

    let x = Signal::new("x");
    let mut left_only = Bench::new(x.expr() + x.expr());
    left_only.play(&x, &x_bits);

    let y = Signal::new("y");
    let mut right_only = Bench::new(y.expr());
    right_only.play(&y, &y_bits);

    let x2 = Signal::new("x");
    let y2 = Signal::new("y");
    let mut alt = Bench::new(x2.expr() + x2.expr() | y2.expr());
    alt.play_all(&[(&x2, &x_bits), (&y2, &y_bits)]);

    let mut union = left_only.matches();
    union.extend(right_only.matches());
    union.sort_unstable();
    assert_eq!(alt.matches(), union);
}

#[test]
fn repeat_range_matches_are_the_union_over_counts() {
    let bits = [1, 1, 0, 1];

    let mut per_count = Vec::new();
    for count in 1..=2 {
        let a = Signal::new("a");
        let mut bench = Bench::new(a.expr() * count);
        bench.play(&a, &bits);
        per_count.extend(bench.matches());
    }
    per_count.sort_unstable();

    let a = Signal::new("a");
    let mut ranged = Bench::new(a.expr() * (1, 2));
    ranged.play(&a, &bits);
    assert_eq!(ranged.matches(), per_count);
}

#[test]
fn firstof_emits_at_most_one_match_per_evaluation() {
    let a = Signal::new("a");
    let noisy = (a.expr() | a.expr()) | a.expr();
    let mut bench = Bench::new(firstof(noisy));
    bench.play(&a, &[1, 1, 0]);
    // Three matches per holding cycle collapse to one.
    assert_eq!(bench.matches(), vec![(0, 0), (1, 1)]);
}

#[test]
fn once_emits_at_most_one_match_per_end_cycle() {
    let a = Signal::new("a");
    // Both branches match at the start cycle; the longer one also ends a
    // cycle later. Duplicate ends collapse, distinct ends survive.
    let expr = once(a.expr() | (a.expr() | a.expr() + a.expr()));
    let mut bench = Bench::new(expr);
    bench.play(&a, &[1, 1, 0]);
    assert_eq!(bench.matches(), vec![(0, 0), (0, 1), (1, 1)]);
}

#[test]
fn always_spawns_one_evaluation_per_posting() {
    let samples = Rc::new(Cell::new(0u32));
    let counted = samples.clone();
    let pred = Pred::new("counted", move || {
        counted.set(counted.get() + 1);
        true
    });
    let mut bench = Bench::new(Expr::pred(pred));
    for _ in 0..5 {
        bench.tick();
    }
    // One evaluation per posting, each sampling the predicate exactly once.
    assert_eq!(samples.get(), 5);
    assert_eq!(bench.matches().len(), 5);
}
