//! Cluster discovery inside graph components.
//!
//! A *cluster* is a maximal set of two or more vertices that all (transitively)
//! depend on each other, i.e. a non-trivial strongly connected component.
//! Whether a cluster is legal (mutually recursive symbols) or fatal (an
//! import cycle) is up to the caller.
//!
//! # Algorithm
//!
//! Tarjan's SCC algorithm over descendant edges, with the recursion replaced
//! by an explicit frame stack of `(vertex, next edge index)` so that deep
//! dependency chains cannot overflow the native stack. State lives in plain
//! arrays keyed by local vertex id:
//!
//! - `disc[v]`: discovery step, `0` while undiscovered.
//! - `low[v]`: lowest discovery step reachable from the subtree of `v`
//!   through vertices still on the stack.
//! - `on_stack`: membership bitset for the Tarjan stack.
//!
//! The walk starts from the component roots and then from any vertex left
//! undiscovered, which covers clusters no root can reach.

#![allow(clippy::module_name_repetitions)]

use fixedbitset::FixedBitSet;
use serde::Serialize;
use tracing::{debug, trace};

use crate::Entity;
use crate::node::NodeTable;
use crate::split::{CompId, Component, VertId};

/// Index of a cluster inside its component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ClusterId(pub u32);

impl ClusterId {
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A set of at least two mutually dependent vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    id: ClusterId,
    component: CompId,

    /// Sorted by the entity ordering of the member nodes.
    members: Vec<VertId>,
}

impl Cluster {
    #[must_use]
    pub const fn id(&self) -> ClusterId {
        self.id
    }

    #[must_use]
    pub const fn component(&self) -> CompId {
        self.component
    }

    #[must_use]
    pub fn members(&self) -> &[VertId] {
        &self.members
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member with the lowest entity, used as the cluster's sort key.
    #[must_use]
    pub fn head(&self) -> VertId {
        self.members[0]
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    vert: VertId,

    /// Index into the vertex's descendant list (not a vertex id).
    edge: usize,
}

/// Reusable Tarjan state. One finder can walk many components; buffers are
/// grown to the largest one seen.
#[derive(Debug, Default)]
pub struct ClusterFinder {
    disc: Vec<u32>,
    low: Vec<u32>,
    on_stack: FixedBitSet,
    stack: Vec<VertId>,
    frames: Vec<Frame>,
    step: u32,
}

impl ClusterFinder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preallocate for components of up to `size` vertices.
    #[must_use]
    pub fn with_capacity(size: usize) -> Self {
        let mut finder = Self::default();
        finder.reset(size);
        finder
    }

    fn reset(&mut self, size: usize) {
        self.step = 0;
        self.disc.clear();
        self.disc.resize(size, 0);
        self.low.clear();
        self.low.resize(size, 0);
        self.on_stack.clear();
        self.on_stack.grow(size);
        self.stack.clear();
        self.frames.clear();
    }

    /// Discover all clusters of `comp`.
    ///
    /// Returns an empty list for components on the no-cluster fast path.
    /// Members of each cluster are sorted by entity; clusters are ordered by
    /// their lowest member.
    pub fn find<E: Entity>(&mut self, comp: &Component, table: &NodeTable<E>) -> Vec<Cluster> {
        if comp.no_cluster() {
            return Vec::new();
        }

        self.reset(comp.len());
        let mut found: Vec<Vec<VertId>> = Vec::new();

        for &root in comp.roots() {
            if self.disc[root.index()] == 0 {
                self.walk(comp, root, &mut found);
            }
        }

        // Clusters with no way in from a root (a component whose only entry
        // is a cycle) still need a walk.
        let mut i = 0;
        while (self.step as usize) < comp.len() && i < comp.len() {
            if self.disc[i] == 0 {
                self.walk(comp, VertId::from_index(i), &mut found);
            }
            i += 1;
        }

        let entity = |v: &VertId| table.entity(comp.vertex(*v).node());
        for members in &mut found {
            members.sort_by(|a, b| entity(a).cmp(entity(b)));
        }
        found.sort_by(|a, b| entity(&a[0]).cmp(entity(&b[0])));

        let clusters: Vec<Cluster> = found
            .into_iter()
            .enumerate()
            .map(|(k, members)| Cluster {
                id: ClusterId::from_index(k),
                component: comp.id(),
                members,
            })
            .collect();

        debug!(component = %comp.id(), clusters = clusters.len(), "clusters discovered");
        clusters
    }

    fn enter(&mut self, v: VertId) {
        self.step += 1;
        self.disc[v.index()] = self.step;
        self.low[v.index()] = self.step;
        self.stack.push(v);
        self.on_stack.insert(v.index());
        self.frames.push(Frame { vert: v, edge: 0 });
    }

    fn walk(&mut self, comp: &Component, start: VertId, found: &mut Vec<Vec<VertId>>) {
        self.enter(start);

        while let Some(&Frame { vert, edge }) = self.frames.last() {
            let v = vert.index();
            let descendants = comp.vertex(vert).descendants();

            if let Some(&next) = descendants.get(edge) {
                if let Some(top) = self.frames.last_mut() {
                    top.edge += 1;
                }

                if self.disc[next.index()] == 0 {
                    self.enter(next);
                } else if self.on_stack.contains(next.index()) {
                    // Back edge into the current stack closes a cycle.
                    self.low[v] = self.low[v].min(self.disc[next.index()]);
                }
                continue;
            }

            // All descendants of `vert` handled.
            self.frames.pop();
            if let Some(parent) = self.frames.last() {
                let p = parent.vert.index();
                self.low[p] = self.low[p].min(self.low[v]);
            }

            if self.low[v] == self.disc[v] {
                let members = self.pop_until(vert);
                if members.len() > 1 {
                    trace!(component = %comp.id(), size = members.len(), "cluster");
                    found.push(members);
                }
            }
        }
    }

    /// Pop the Tarjan stack down to and including `head`.
    fn pop_until(&mut self, head: VertId) -> Vec<VertId> {
        let mut members = Vec::with_capacity(2);
        while let Some(v) = self.stack.pop() {
            self.on_stack.set(v.index(), false);
            members.push(v);
            if v == head {
                break;
            }
        }
        members
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
