//! Component splitter: partitions a built node table into independent
//! connected components.
//!
//! # Overview
//!
//! Two nodes belong to the same component when they are connected through
//! the undirected view of the graph (node adjacency). By construction no
//! edge crosses component boundaries, so clustering and ranking can run on
//! each component separately.
//!
//! Nodes with empty adjacency are *isolated*: they are flagged and stored in
//! [`Partition::isolated`] without starting a traversal. Every other node is
//! reached by a breadth-first walk started from the lowest unvisited node id.
//!
//! Inside a component, vertices get compact local ids ([`VertId`]) in BFS
//! visiting order. Ancestor and descendant lists are remapped to those ids,
//! which lets the cluster finder and ranker work on plain index arrays.

#![allow(clippy::module_name_repetitions)]

use std::fmt;

use fixedbitset::FixedBitSet;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::cluster::{Cluster, ClusterId};
use crate::node::{NodeId, NodeTable};
use crate::rank::Rankee;

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Index of a non-trivial component inside [`Partition::components`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CompId(pub u32);

impl CompId {
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CompId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Component-local vertex index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct VertId(pub u32);

impl VertId {
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

// ---------------------------------------------------------------------------
// Vertex / Component
// ---------------------------------------------------------------------------

/// A node as seen from inside its component.
#[derive(Debug, Clone)]
pub struct Vertex {
    node: NodeId,
    ancestors: Vec<VertId>,
    descendants: Vec<VertId>,
    rank: u32,
    cluster: Option<ClusterId>,
}

impl Vertex {
    /// Global node this vertex stands for.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn ancestors(&self) -> &[VertId] {
        &self.ancestors
    }

    #[must_use]
    pub fn descendants(&self) -> &[VertId] {
        &self.descendants
    }

    /// Rank assigned by the cohort ranker. Zero before ranking.
    #[must_use]
    pub const fn rank(&self) -> u32 {
        self.rank
    }

    /// Cluster this vertex belongs to, if any.
    #[must_use]
    pub const fn cluster(&self) -> Option<ClusterId> {
        self.cluster
    }

    pub(crate) const fn set_rank(&mut self, rank: u32) {
        self.rank = rank;
    }
}

/// A maximal connected set of at least two nodes.
#[derive(Debug, Clone)]
pub struct Component {
    id: CompId,
    verts: Vec<Vertex>,

    /// Vertices with no ancestors.
    roots: Vec<VertId>,

    /// Vertices with no descendants.
    pinnacles: Vec<VertId>,

    clusters: Vec<Cluster>,

    /// Filled by the ranker. Index is the rank.
    cohorts: Vec<Vec<Rankee>>,

    /// Every vertex is a root or a pinnacle, so the component has exactly
    /// two cohorts and cannot contain a cluster.
    no_cluster: bool,
}

impl Component {
    #[must_use]
    pub const fn id(&self) -> CompId {
        self.id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.verts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.verts.is_empty()
    }

    #[must_use]
    pub fn verts(&self) -> &[Vertex] {
        &self.verts
    }

    /// # Panics
    ///
    /// Panics if `id` is out of range for this component.
    #[must_use]
    pub fn vertex(&self, id: VertId) -> &Vertex {
        &self.verts[id.index()]
    }

    #[must_use]
    pub fn roots(&self) -> &[VertId] {
        &self.roots
    }

    #[must_use]
    pub fn pinnacles(&self) -> &[VertId] {
        &self.pinnacles
    }

    #[must_use]
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// # Panics
    ///
    /// Panics if `id` is not a cluster of this component.
    #[must_use]
    pub fn cluster(&self, id: ClusterId) -> &Cluster {
        &self.clusters[id.index()]
    }

    #[must_use]
    pub fn cohorts(&self) -> &[Vec<Rankee>] {
        &self.cohorts
    }

    /// Fast path flag: `len() == roots().len() + pinnacles().len()`.
    #[must_use]
    pub const fn no_cluster(&self) -> bool {
        self.no_cluster
    }

    /// Node ids of all members, in local vertex order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.verts.iter().map(Vertex::node)
    }

    /// Record discovered clusters and tag their member vertices.
    pub(crate) fn set_clusters(&mut self, clusters: Vec<Cluster>) {
        for cluster in &clusters {
            for &member in cluster.members() {
                self.verts[member.index()].cluster = Some(cluster.id());
            }
        }
        self.clusters = clusters;
    }

    pub(crate) fn set_cohorts(&mut self, cohorts: Vec<Vec<Rankee>>) {
        self.cohorts = cohorts;
    }

    pub(crate) fn vertex_mut(&mut self, id: VertId) -> &mut Vertex {
        &mut self.verts[id.index()]
    }
}

// ---------------------------------------------------------------------------
// Partition
// ---------------------------------------------------------------------------

/// Result of splitting a node table into components.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    comps: Vec<Component>,

    /// Nodes with no edges at all, in node order. Each one is a trivial
    /// one-vertex component.
    isolated: Vec<NodeId>,

    /// Global node id → local vertex id inside the node's component.
    /// Meaningless for isolated nodes.
    remap: Vec<Option<VertId>>,

    /// Largest component that may hold clusters.
    max_comp_size: usize,
}

impl Partition {
    /// Split a built node table into components.
    ///
    /// Sets each node's component id and isolated flag as a side effect.
    #[instrument(skip(table), fields(nodes = table.len()))]
    pub fn split<E>(table: &mut NodeTable<E>) -> Self {
        if !table.is_frozen() {
            warn!("split called on a table that was not built");
            return Self::default();
        }

        let n = table.len();
        let mut splitter = Splitter {
            visited: FixedBitSet::with_capacity(n),
            visited_count: 0,
            remap: vec![None; n],
            wave: Vec::new(),
            next: Vec::new(),
        };

        let mut isolated = Vec::new();
        for id in table.ids().collect::<Vec<_>>() {
            if table.node(id).adjacency().is_empty() {
                table.node_mut(id).mark_isolated();
                splitter.visit(id);
                isolated.push(id);
            }
        }

        let mut comps: Vec<Component> = Vec::new();
        let mut max_comp_size = 0;
        for i in 0..n {
            if splitter.visited_count >= n {
                break;
            }
            if splitter.visited.contains(i) {
                continue;
            }
            let comp = splitter.bfs(table, NodeId::from_index(i), CompId::from_index(comps.len()));
            if !comp.no_cluster {
                max_comp_size = max_comp_size.max(comp.len());
            }
            comps.push(comp);
        }

        debug!(
            components = comps.len(),
            isolated = isolated.len(),
            max_comp_size,
            "graph split"
        );

        Self {
            comps,
            isolated,
            remap: splitter.remap,
            max_comp_size,
        }
    }

    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.comps
    }

    pub(crate) fn components_mut(&mut self) -> &mut [Component] {
        &mut self.comps
    }

    /// # Panics
    ///
    /// Panics if `id` is out of range.
    #[must_use]
    pub fn component(&self, id: CompId) -> &Component {
        &self.comps[id.index()]
    }

    #[must_use]
    pub fn isolated(&self) -> &[NodeId] {
        &self.isolated
    }

    /// Size of the largest component that is not on the no-cluster fast
    /// path. Zero if there is none.
    #[must_use]
    pub const fn max_comp_size(&self) -> usize {
        self.max_comp_size
    }

    /// Local vertex id of a node that belongs to a non-trivial component.
    /// `None` for isolated or unknown nodes.
    #[must_use]
    pub fn vert_of(&self, node: NodeId) -> Option<VertId> {
        self.remap.get(node.index()).copied().flatten()
    }
}

/// BFS state shared by all component walks of one split.
struct Splitter {
    visited: FixedBitSet,
    visited_count: usize,
    remap: Vec<Option<VertId>>,
    wave: Vec<NodeId>,
    next: Vec<NodeId>,
}

impl Splitter {
    fn visit(&mut self, id: NodeId) {
        self.visited.insert(id.index());
        self.visited_count += 1;
    }

    fn bfs<E>(&mut self, table: &mut NodeTable<E>, start: NodeId, cid: CompId) -> Component {
        let mut verts: Vec<Vertex> = Vec::new();
        let mut roots = Vec::new();
        let mut pinnacles = Vec::new();

        self.wave.clear();
        self.next.clear();
        self.visit(start);
        self.wave.push(start);

        while !self.wave.is_empty() {
            for k in 0..self.wave.len() {
                let id = self.wave[k];
                let vid = VertId::from_index(verts.len());
                self.remap[id.index()] = Some(vid);
                table.node_mut(id).set_component(cid);

                let node = table.node(id);
                if node.is_root() {
                    roots.push(vid);
                }
                if node.is_pinnacle() {
                    pinnacles.push(vid);
                }
                verts.push(Vertex {
                    node: id,
                    ancestors: Vec::new(),
                    descendants: Vec::new(),
                    rank: 0,
                    cluster: None,
                });

                for &adj in node.adjacency() {
                    if !self.visited.contains(adj.index()) {
                        self.visited.insert(adj.index());
                        self.visited_count += 1;
                        self.next.push(adj);
                    }
                }
            }

            std::mem::swap(&mut self.wave, &mut self.next);
            self.next.clear();
        }

        debug_assert!(verts.len() >= 2, "non-trivial component needs two vertices");

        // Every member now has its local id, so lists can be remapped.
        for vert in &mut verts {
            let node = table.node(vert.node);
            vert.ancestors = node
                .ancestors()
                .iter()
                .filter_map(|a| self.remap[a.index()])
                .collect();
            vert.descendants = node
                .descendants()
                .iter()
                .filter_map(|d| self.remap[d.index()])
                .collect();
        }

        let no_cluster = verts.len() == roots.len() + pinnacles.len();

        Component {
            id: cid,
            verts,
            roots,
            pinnacles,
            clusters: Vec::new(),
            cohorts: Vec::new(),
            no_cluster,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
