//! Cycle extraction for graphs that must be strictly acyclic.
//!
//! # Overview
//!
//! Compilation-unit imports may never form a cycle. Instead of discovering
//! clusters, the strict mode walks the graph depth first and stops at the
//! first cycle it meets, returning it as an ordered path for the error
//! report.
//!
//! # Cycle Direction
//!
//! A [`Cycle`] lists entities so that each one depends on the next and the
//! last depends on the first: `["a", "b", "c"]` reads "a imports b imports c
//! imports a".
//!
//! # Canonical Form
//!
//! A cycle can be entered at any member. Rotating it to start at the lowest
//! entity makes reports deterministic regardless of traversal order.

#![allow(clippy::module_name_repetitions)]

use std::fmt;

use fixedbitset::FixedBitSet;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::Entity;
use crate::node::{NodeId, NodeTable};

// ---------------------------------------------------------------------------
// Cycle
// ---------------------------------------------------------------------------

/// An ordered dependency cycle of at least two entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Cycle<E> {
    entities: Vec<E>,
}

impl<E: Ord> Cycle<E> {
    /// Build a cycle from an ordered path and canonicalize it.
    #[must_use]
    pub fn new(entities: Vec<E>) -> Self {
        let mut cycle = Self { entities };
        cycle.canonicalize();
        cycle
    }

    /// Rotate so that the lowest entity comes first. Idempotent.
    pub fn canonicalize(&mut self) {
        let Some(start) = self
            .entities
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(i, _)| i)
        else {
            return;
        };
        self.entities.rotate_left(start);
    }

    /// Returns `true` if the cycle starts at its lowest entity.
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.entities
            .first()
            .is_none_or(|first| self.entities.iter().all(|e| first <= e))
    }
}

impl<E> Cycle<E> {
    #[must_use]
    pub fn entities(&self) -> &[E] {
        &self.entities
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn into_entities(self) -> Vec<E> {
        self.entities
    }

    /// `(dependent, dependency)` pairs along the cycle, including the pair
    /// that closes it.
    pub fn links(&self) -> impl Iterator<Item = (&E, &E)> + '_ {
        let n = self.entities.len();
        (0..n).map(move |i| (&self.entities[i], &self.entities[(i + 1) % n]))
    }

    /// Attach a caller-supplied site (e.g. the source position of an import
    /// statement) to every link.
    pub fn attach<S, F>(&self, mut site: F) -> CycleReport<E, S>
    where
        E: Clone,
        F: FnMut(&E, &E) -> S,
    {
        let links = self
            .links()
            .map(|(from, to)| CycleLink {
                site: site(from, to),
                from: from.clone(),
                to: to.clone(),
            })
            .collect();
        CycleReport { links }
    }
}

impl<E: fmt::Display> fmt::Display for Cycle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in &self.entities {
            write!(f, "{e} -> ")?;
        }
        match self.entities.first() {
            Some(first) => write!(f, "{first}"),
            None => Ok(()),
        }
    }
}

/// One edge of a reported cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleLink<E, S> {
    /// Entity that depends on `to`.
    pub from: E,
    pub to: E,
    pub site: S,
}

/// A cycle with a caller-supplied site on every link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport<E, S> {
    pub links: Vec<CycleLink<E, S>>,
}

impl<E: fmt::Display, S: fmt::Display> fmt::Display for CycleReport<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, link) in self.links.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {} imports {}", link.site, link.from, link.to)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scout
// ---------------------------------------------------------------------------

/// Find one cycle in a built node table, if any.
///
/// Depth-first traversal over descendant edges, started from every root in
/// node order and then from every node not visited yet. A graph without
/// roots therefore starts at node 0. Self-loops are not edges and are not
/// reported here.
#[must_use]
#[instrument(skip_all, fields(nodes = table.len()))]
pub fn find_cycle<E: Entity>(table: &NodeTable<E>) -> Option<Cycle<E>> {
    let ids = find_cycle_nodes(table)?;
    let cycle = Cycle::new(ids.into_iter().map(|id| table.entity(id).clone()).collect());
    debug!(len = cycle.len(), "cycle found");
    Some(cycle)
}

/// Same as [`find_cycle`] but returns the raw node path, not canonicalized.
#[must_use]
pub fn find_cycle_nodes<E>(table: &NodeTable<E>) -> Option<Vec<NodeId>> {
    let mut scout = Scout::new(table.len());

    let starts = table.roots().chain(table.ids());
    for start in starts {
        if scout.visited.contains(start.index()) {
            continue;
        }
        if let Some(cycle) = scout.traverse(table, start) {
            return Some(cycle);
        }
    }
    None
}

#[derive(Debug, Clone, Copy)]
struct ScoutPos {
    node: NodeId,

    /// Index into the node's descendant list (not a node id).
    edge: usize,
}

/// Carries the path state of one depth-first cycle search.
struct Scout {
    /// Current path; used both for backtracking and to recover the cycle.
    path: Vec<ScoutPos>,

    /// Node is on the current path.
    on_path: FixedBitSet,

    visited: FixedBitSet,
}

impl Scout {
    fn new(size: usize) -> Self {
        Self {
            path: Vec::new(),
            on_path: FixedBitSet::with_capacity(size),
            visited: FixedBitSet::with_capacity(size),
        }
    }

    fn push(&mut self, node: NodeId) {
        self.visited.insert(node.index());
        self.on_path.insert(node.index());
        self.path.push(ScoutPos { node, edge: 0 });
    }

    fn traverse<E>(&mut self, table: &NodeTable<E>, start: NodeId) -> Option<Vec<NodeId>> {
        self.push(start);

        while let Some(&ScoutPos { node, edge }) = self.path.last() {
            let descendants = table.node(node).descendants();

            let Some(&next) = descendants.get(edge) else {
                self.on_path.set(node.index(), false);
                self.path.pop();
                continue;
            };

            if let Some(tip) = self.path.last_mut() {
                tip.edge += 1;
            }

            if self.on_path.contains(next.index()) {
                return Some(self.cut(next));
            }
            if !self.visited.contains(next.index()) {
                self.push(next);
            }
        }
        None
    }

    /// Path segment from `head` to the tip, reversed so every node depends
    /// on the one after it.
    fn cut(&self, head: NodeId) -> Vec<NodeId> {
        let from = self
            .path
            .iter()
            .position(|pos| pos.node == head)
            .unwrap_or(0);
        self.path[from..].iter().rev().map(|pos| pos.node).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
