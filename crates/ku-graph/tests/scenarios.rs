//! Known-topology regression tests for full resolution.
//!
//! Each case is a small hand-crafted graph with analytically known cohorts,
//! clusters or cycle. Unit-import graphs use strict mode; symbol graphs use
//! ranking mode.

use std::collections::HashSet;

use ku_graph::{
    CohortEntry, ErrorCode, GraphError, Mode, Resolution, ResolveOptions, Resolver,
    prune_unreachable,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Case<'a> = &'a [(&'static str, &'a [&'static str])];

fn resolver(mode: Mode, entities: Case<'_>) -> Resolver<&'static str> {
    let mut resolver = Resolver::with_options(ResolveOptions {
        mode,
        ..ResolveOptions::default()
    });
    for (entity, deps) in entities {
        resolver
            .add(*entity, deps.iter().copied())
            .expect("valid input");
    }
    resolver
}

fn ranked(entities: Case<'_>) -> Resolution<&'static str> {
    resolver(Mode::Ranking, entities)
        .resolve()
        .expect("ranking never fails on valid input")
}

fn strict(entities: Case<'_>) -> Result<Resolution<&'static str>, GraphError<&'static str>> {
    resolver(Mode::StrictAcyclic, entities).resolve()
}

fn strict_cycle(entities: Case<'_>) -> Vec<&'static str> {
    let err = strict(entities).expect_err("graph has a cycle");
    assert_eq!(err.code(), ErrorCode::CycleDetected);
    err.cycle().expect("cycle attached").entities().to_vec()
}

// ---------------------------------------------------------------------------
// Unit import graphs (strict)
// ---------------------------------------------------------------------------

#[test]
fn single_unit() {
    let resolution = strict(&[("foo", &[])]).unwrap();
    assert_eq!(resolution.cohorts(), vec![vec!["foo"]]);
}

#[test]
fn two_independent_units() {
    let resolution = strict(&[("foo", &[]), ("bar", &[])]).unwrap();
    assert_eq!(resolution.cohorts(), vec![vec!["bar", "foo"]]);
}

#[test]
fn two_units() {
    let resolution = strict(&[("foo", &[]), ("bar", &["foo"])]).unwrap();
    assert_eq!(resolution.cohorts(), vec![vec!["foo"], vec!["bar"]]);
}

#[test]
fn two_units_in_cycle() {
    assert_eq!(
        strict_cycle(&[("foo", &["bar"]), ("bar", &["foo"])]),
        vec!["bar", "foo"]
    );
}

#[test]
fn cycle_behind_root() {
    assert_eq!(
        strict_cycle(&[
            ("fmt", &[]),
            ("foo", &["bar", "fmt"]),
            ("bar", &["foo"]),
            ("kar", &["bar"]),
        ]),
        vec!["bar", "foo"]
    );
}

#[test]
fn three_unit_cycle_deep_in_graph() {
    assert_eq!(
        strict_cycle(&[
            ("foo", &[]),
            ("bar", &[]),
            ("fmt", &["foo", "bar"]),
            ("kar", &["fmt", "b"]),
            ("main", &["kar"]),
            ("b", &["c"]),
            ("a", &["b"]),
            ("c", &["a"]),
        ]),
        vec!["a", "b", "c"]
    );
}

#[test]
fn layered_cohorts() {
    let resolution = strict(&[
        ("foo", &[]),
        ("bar", &[]),
        ("fmt", &["foo", "bar"]),
        ("kar", &["fmt", "bar"]),
        ("main", &["kar"]),
    ])
    .unwrap();

    assert_eq!(
        resolution.cohorts(),
        vec![vec!["bar", "foo"], vec!["fmt"], vec!["kar"], vec!["main"]]
    );
}

#[test]
fn cycle_report_carries_import_sites() {
    let err = strict(&[("foo", &["bar"]), ("bar", &["foo"])]).unwrap_err();
    let cycle = err.cycle().unwrap();

    let report = cycle.attach(|from, to| format!("{from}/main.ku: import {to}"));
    assert_eq!(
        report.to_string(),
        "bar/main.ku: import foo: bar imports foo\nfoo/main.ku: import bar: foo imports bar"
    );
}

#[test]
fn cycle_order_does_not_depend_on_declaration_order() {
    let forward = strict_cycle(&[("x", &["y"]), ("y", &["z"]), ("z", &["x"])]);
    let backward = strict_cycle(&[("z", &["x"]), ("y", &["z"]), ("x", &["y"])]);
    assert_eq!(forward, vec!["x", "y", "z"]);
    assert_eq!(forward, backward);
}

// ---------------------------------------------------------------------------
// Symbol graphs (ranking)
// ---------------------------------------------------------------------------

#[test]
fn ring_is_one_cluster_in_one_cohort() {
    let resolution = ranked(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);

    assert_eq!(resolution.clusters(), vec![vec!["a", "b", "c"]]);
    assert_eq!(
        resolution.cohort_entries(),
        vec![vec![CohortEntry::Cluster(vec!["a", "b", "c"])]]
    );
}

#[test]
fn recursive_types_rank_above_their_fields() {
    // Node and List refer to each other and both use Int.
    let resolution = ranked(&[
        ("Int", &[]),
        ("Node", &["List", "Int"]),
        ("List", &["Node", "Int"]),
        ("len", &["List"]),
        ("main", &["len", "Int"]),
    ]);

    assert_eq!(
        resolution.cohort_entries(),
        vec![
            vec![CohortEntry::Entity("Int")],
            vec![CohortEntry::Cluster(vec!["List", "Node"])],
            vec![CohortEntry::Entity("len")],
            vec![CohortEntry::Entity("main")],
        ]
    );
    assert_eq!(resolution.rank_of(&"Node"), resolution.rank_of(&"List"));
}

#[test]
fn components_merge_into_global_cohorts() {
    let resolution = ranked(&[
        ("a1", &[]),
        ("a2", &["a1"]),
        ("a3", &["a2"]),
        ("b1", &[]),
        ("b2", &["b1"]),
        ("solo", &[]),
    ]);

    assert_eq!(resolution.components().len(), 2);
    assert_eq!(
        resolution.cohorts(),
        vec![vec!["a1", "b1", "solo"], vec!["a2", "b2"], vec!["a3"]]
    );
}

#[test]
fn cluster_policy_separates_legal_and_illegal_cycles() {
    let resolution = ranked(&[
        ("fn_even", &["fn_odd"]),
        ("fn_odd", &["fn_even"]),
        ("ONE", &["TWO"]),
        ("TWO", &["ONE"]),
    ]);

    let functions = |e: &&str| e.starts_with("fn_");
    let err = resolution.check_clusters(&functions).unwrap_err();
    assert_eq!(err.code(), ErrorCode::IllegalCluster);

    let only_functions = ranked(&[("fn_even", &["fn_odd"]), ("fn_odd", &["fn_even"])]);
    assert!(only_functions.check_clusters(&functions).is_ok());
}

#[test]
fn private_symbols_pruned_by_visibility() {
    let resolution = ranked(&[
        ("Api", &["helper"]),
        ("helper", &[]),
        ("unused_a", &["unused_b"]),
        ("unused_b", &[]),
        ("scratch", &[]),
    ]);

    let public: HashSet<&str> = ["Api"].into_iter().collect();
    let pruned = resolution.prune(&public);
    assert_eq!(pruned.entities, vec!["scratch", "unused_a", "unused_b"]);
    assert_eq!(pruned.components.len(), 1);
}

#[test]
fn unreachable_symbols_pruned_from_entry_points() {
    let resolution = ranked(&[
        ("main", &["run"]),
        ("run", &["parse", "emit"]),
        ("emit", &[]),
        ("parse", &[]),
        ("debug_dump", &["parse"]),
    ]);

    let pruned = prune_unreachable(resolution.table(), ["main"]);
    assert_eq!(pruned.entities, vec!["debug_dump"]);
}
