//! Property tests over random graphs, cross-checked against petgraph.
//!
//! Random graphs use `u32` entities `0..n`. Edges point from dependent to
//! dependency, both in the resolver input and in the petgraph oracle.

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use proptest::prelude::*;

use ku_graph::{Mode, Resolution, ResolveOptions, Resolver, find_cycle, prune_unreachable};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Dependency lists indexed by entity; may contain self references.
type Deps = Vec<Vec<u32>>;

fn arb_graph(max_nodes: usize) -> impl Strategy<Value = Deps> {
    (1..max_nodes).prop_flat_map(|n| {
        let n32 = u32::try_from(n).unwrap();
        prop::collection::vec((0..n32, 0..n32), 0..n * 3).prop_map(move |edges| to_deps(n, edges))
    })
}

/// Only edges from higher to lower entities, so never a cycle or self-loop.
fn arb_dag(max_nodes: usize) -> impl Strategy<Value = Deps> {
    (1..max_nodes).prop_flat_map(|n| {
        let n32 = u32::try_from(n).unwrap();
        prop::collection::vec((0..n32, 0..n32), 0..n * 3).prop_map(move |edges| {
            let edges = edges
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| (a.max(b), a.min(b)))
                .collect();
            to_deps(n, edges)
        })
    })
}

fn to_deps(n: usize, edges: Vec<(u32, u32)>) -> Deps {
    let mut sets = vec![BTreeSet::new(); n];
    for (from, to) in edges {
        sets[from as usize].insert(to);
    }
    sets.into_iter().map(|s| s.into_iter().collect()).collect()
}

fn entities(deps: &Deps) -> impl Iterator<Item = u32> + '_ {
    (0..deps.len()).map(|i| u32::try_from(i).unwrap())
}

fn resolver(deps: &Deps, mode: Mode) -> Resolver<u32> {
    let mut resolver = Resolver::with_options(ResolveOptions {
        mode,
        check_self_loops: false,
    });
    for (entity, list) in entities(deps).zip(deps) {
        resolver.add(entity, list.iter().copied()).unwrap();
    }
    resolver
}

fn resolve(deps: &Deps) -> Resolution<u32> {
    resolver(deps, Mode::Ranking).resolve().unwrap()
}

/// Oracle graph without self-loops.
fn oracle(deps: &Deps) -> DiGraph<u32, ()> {
    let mut graph = DiGraph::new();
    let nodes: Vec<NodeIndex> = entities(deps).map(|e| graph.add_node(e)).collect();
    for (from, list) in deps.iter().enumerate() {
        for &to in list {
            if to as usize != from {
                graph.add_edge(nodes[from], nodes[to as usize], ());
            }
        }
    }
    graph
}

fn oracle_clusters(deps: &Deps) -> Vec<Vec<u32>> {
    let graph = oracle(deps);
    let mut clusters: Vec<Vec<u32>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| {
            let mut members: Vec<u32> = scc.into_iter().map(|ix| graph[ix]).collect();
            members.sort_unstable();
            members
        })
        .collect();
    clusters.sort();
    clusters
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn clusters_match_petgraph_tarjan(deps in arb_graph(40)) {
        let resolution = resolve(&deps);
        prop_assert_eq!(resolution.clusters(), oracle_clusters(&deps));
    }

    #[test]
    fn clusters_never_overlap(deps in arb_graph(40)) {
        let resolution = resolve(&deps);
        let mut seen = HashSet::new();
        for cluster in resolution.clusters() {
            prop_assert!(cluster.len() >= 2);
            for member in cluster {
                prop_assert!(seen.insert(member), "{} in two clusters", member);
            }
        }
    }

    #[test]
    fn dag_rank_is_one_above_highest_ancestor(deps in arb_dag(40)) {
        let resolution = resolve(&deps);
        for (entity, list) in entities(&deps).zip(&deps) {
            let expected = list
                .iter()
                .map(|a| resolution.rank_of(a).unwrap() + 1)
                .max()
                .unwrap_or(0);
            prop_assert_eq!(resolution.rank_of(&entity), Some(expected));
        }
    }

    #[test]
    fn collapsed_rank_is_one_above_external_ancestors(deps in arb_graph(40)) {
        let resolution = resolve(&deps);
        let clusters = resolution.clusters();

        // Cluster index, or a unique id past the cluster range.
        let mut group: HashMap<u32, usize> = HashMap::new();
        for (k, cluster) in clusters.iter().enumerate() {
            for &m in cluster {
                group.insert(m, k);
            }
        }
        let group_of = |e: u32| group.get(&e).copied().unwrap_or(clusters.len() + e as usize);

        for entity in entities(&deps) {
            let members = group
                .get(&entity)
                .map_or_else(|| vec![entity], |&k| clusters[k].clone());
            let expected = members
                .iter()
                .flat_map(|&m| deps[m as usize].iter().copied())
                .filter(|&a| group_of(a) != group_of(entity))
                .map(|a| resolution.rank_of(&a).unwrap() + 1)
                .max()
                .unwrap_or(0);
            prop_assert_eq!(resolution.rank_of(&entity), Some(expected));
        }
    }

    #[test]
    fn cohorts_hold_every_entity_once_at_its_rank(deps in arb_graph(40)) {
        let resolution = resolve(&deps);
        let mut count = 0;
        for (rank, cohort) in resolution.cohorts().iter().enumerate() {
            prop_assert!(!cohort.is_empty());
            prop_assert!(cohort.windows(2).all(|w| w[0] < w[1]), "cohort sorted");
            for entity in cohort {
                prop_assert_eq!(resolution.rank_of(entity), Some(u32::try_from(rank).unwrap()));
                count += 1;
            }
        }
        prop_assert_eq!(count, deps.len());
    }

    #[test]
    fn two_level_components_have_no_clusters(deps in arb_graph(40)) {
        let resolution = resolve(&deps);
        for comp in resolution.components() {
            if comp.len() == comp.roots().len() + comp.pinnacles().len() {
                prop_assert!(comp.clusters().is_empty());
                prop_assert!(comp.cohorts().len() == 2);
            }
        }
    }

    #[test]
    fn components_are_edge_disjoint(deps in arb_graph(40)) {
        let resolution = resolve(&deps);
        for (entity, list) in entities(&deps).zip(&deps) {
            for dep in list {
                prop_assert_eq!(resolution.component_of(&entity), resolution.component_of(dep));
            }
        }
    }

    #[test]
    fn cycle_found_iff_petgraph_sees_one(deps in arb_graph(30)) {
        let resolver = resolver(&deps, Mode::StrictAcyclic);
        let has_cycle = is_cyclic_directed(&oracle(&deps));
        let self_loops = entities(&deps).zip(&deps).any(|(e, list)| list.contains(&e));

        match resolver.resolve() {
            Ok(_) => prop_assert!(!has_cycle && !self_loops),
            Err(err) => {
                if let Some(cycle) = err.cycle() {
                    prop_assert!(has_cycle);
                    prop_assert!(cycle.len() >= 2);
                    prop_assert!(cycle.is_canonical());
                    for (from, to) in cycle.links() {
                        prop_assert!(deps[*from as usize].contains(to), "{} -> {}", from, to);
                    }
                } else {
                    prop_assert!(self_loops);
                }
            }
        }
    }

    #[test]
    fn canonicalization_is_idempotent(deps in arb_graph(30)) {
        let mut table = ku_graph::NodeTable::new();
        for (entity, list) in entities(&deps).zip(&deps) {
            table.add(entity, list.iter().copied()).unwrap();
        }
        table.build().unwrap();
        if let Some(cycle) = find_cycle(&table) {
            let mut again = cycle.clone();
            again.canonicalize();
            prop_assert_eq!(again, cycle);
        }
    }

    #[test]
    fn private_pruning_is_monotonic(
        deps in arb_graph(30),
        public in prop::collection::hash_set(0..30u32, 0..8),
        extra in prop::collection::hash_set(0..30u32, 0..8),
    ) {
        let resolution = resolve(&deps);
        let wider: HashSet<u32> = public.union(&extra).copied().collect();

        let narrow = resolution.prune(&public);
        let wide = resolution.prune(&wider);
        for entity in &wide.entities {
            prop_assert!(narrow.contains(entity));
        }
        for entity in &public {
            prop_assert!(!narrow.contains(entity));
        }
    }

    #[test]
    fn unreachable_pruning_keeps_ancestor_closure(
        deps in arb_graph(30),
        roots in prop::collection::vec(0..30u32, 0..4),
    ) {
        let resolution = resolve(&deps);
        let pruned = prune_unreachable(resolution.table(), &roots);

        let graph = oracle(&deps);
        let mut reached = HashSet::new();
        for &root in roots.iter().filter(|&&r| (r as usize) < deps.len()) {
            let mut dfs = Dfs::new(&graph, NodeIndex::new(root as usize));
            while let Some(ix) = dfs.next(&graph) {
                reached.insert(graph[ix]);
            }
        }

        let expected: Vec<u32> = entities(&deps).filter(|e| !reached.contains(e)).collect();
        prop_assert_eq!(pruned.entities, expected);
    }
}
