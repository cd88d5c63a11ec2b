//! Node table: the arena every other phase indexes into.
//!
//! # Overview
//!
//! Callers register entities with [`NodeTable::add`], each with the list of
//! entities it depends on (its *ancestors*). Referencing an unseen entity,
//! either as the declared entity or as a dependency, allocates a node for it
//! with the next dense [`NodeId`].
//!
//! [`NodeTable::build`] freezes the table and derives everything the later
//! phases need:
//!
//! ```text
//! ancestors (fixed at add)
//!        ↓  drop self references, flag SELF_LOOP
//!        ↓  scan all ancestor lists
//! descendants (reverse relation)
//!        ↓  sorted union
//! adjacency (undirected view, used by the component splitter)
//! ```
//!
//! All cross references are `NodeId` indices into the arena, never pointers.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::Entity;
use crate::error::GraphError;
use crate::split::CompId;

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// Dense node index, assigned in order of first reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position of this node in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// One graph vertex.
#[derive(Debug, Clone)]
pub struct Node<E> {
    entity: E,

    /// Nodes this node depends on. Sorted, no duplicates, never self after
    /// build.
    ancestors: Vec<NodeId>,

    /// Nodes depending on this node. Filled by build, sorted.
    descendants: Vec<NodeId>,

    /// Sorted union of ancestors and descendants.
    adjacency: Vec<NodeId>,

    /// Non-trivial component this node belongs to. `None` for isolated
    /// nodes and before splitting.
    component: Option<CompId>,

    /// Entity was declared through `add`, as opposed to only being
    /// referenced as a dependency.
    declared: bool,

    self_loop: bool,
    isolated: bool,
}

impl<E> Node<E> {
    const fn new(entity: E) -> Self {
        Self {
            entity,
            ancestors: Vec::new(),
            descendants: Vec::new(),
            adjacency: Vec::new(),
            component: None,
            declared: false,
            self_loop: false,
            isolated: false,
        }
    }

    #[must_use]
    pub const fn entity(&self) -> &E {
        &self.entity
    }

    #[must_use]
    pub fn ancestors(&self) -> &[NodeId] {
        &self.ancestors
    }

    #[must_use]
    pub fn descendants(&self) -> &[NodeId] {
        &self.descendants
    }

    #[must_use]
    pub fn adjacency(&self) -> &[NodeId] {
        &self.adjacency
    }

    #[must_use]
    pub const fn component(&self) -> Option<CompId> {
        self.component
    }

    #[must_use]
    pub const fn is_declared(&self) -> bool {
        self.declared
    }

    /// Node listed itself among its own dependencies.
    #[must_use]
    pub const fn has_self_loop(&self) -> bool {
        self.self_loop
    }

    /// Node has no edges to other nodes. Set by the component splitter.
    #[must_use]
    pub const fn is_isolated(&self) -> bool {
        self.isolated
    }

    /// No ancestors.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.ancestors.is_empty()
    }

    /// No descendants.
    #[must_use]
    pub fn is_pinnacle(&self) -> bool {
        self.descendants.is_empty()
    }

    pub(crate) const fn set_component(&mut self, component: CompId) {
        self.component = Some(component);
    }

    pub(crate) const fn mark_isolated(&mut self) {
        self.isolated = true;
    }
}

// ---------------------------------------------------------------------------
// NodeTable
// ---------------------------------------------------------------------------

/// Arena of graph nodes plus the entity → node index.
#[derive(Debug, Clone)]
pub struct NodeTable<E> {
    nodes: Vec<Node<E>>,
    index: HashMap<E, NodeId>,
    edge_count: usize,
    frozen: bool,
}

impl<E: Entity> Default for NodeTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> NodeTable<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a table with room for at least `capacity` nodes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            edge_count: 0,
            frozen: false,
        }
    }

    /// Register `entity` with the entities it depends on.
    ///
    /// Unseen dependencies get a node allocated on the spot. A direct
    /// self-reference is accepted here and turned into a self-loop flag by
    /// [`build`](Self::build).
    ///
    /// # Errors
    ///
    /// - [`GraphError::GraphFrozen`] after [`build`](Self::build).
    /// - [`GraphError::DuplicateEntity`] if `entity` was already declared.
    /// - [`GraphError::DuplicateLink`] if `deps` names the same entity twice.
    pub fn add<I>(&mut self, entity: E, deps: I) -> Result<NodeId, GraphError<E>>
    where
        I: IntoIterator<Item = E>,
    {
        if self.frozen {
            warn!(?entity, "add after build");
            return Err(GraphError::GraphFrozen);
        }

        if let Some(&id) = self.index.get(&entity)
            && self.nodes[id.index()].declared
        {
            return Err(GraphError::DuplicateEntity { entity });
        }

        // Validate before interning so a rejected call leaves no nodes behind.
        let deps: Vec<E> = deps.into_iter().collect();
        let mut sorted: Vec<&E> = deps.iter().collect();
        sorted.sort_unstable();
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
            let dependency = pair[0].clone();
            return Err(GraphError::DuplicateLink { entity, dependency });
        }

        let id = self.intern(&entity);
        let mut ancestors: Vec<NodeId> = deps.iter().map(|dep| self.intern(dep)).collect();
        ancestors.sort_unstable();

        trace!(?entity, node = %id, deps = ancestors.len(), "add");

        let node = &mut self.nodes[id.index()];
        node.ancestors = ancestors;
        node.declared = true;
        Ok(id)
    }

    /// Freeze the table and compute descendants and adjacency.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::GraphFrozen`] if the table was already built.
    #[instrument(skip(self), fields(nodes = self.nodes.len()))]
    pub fn build(&mut self) -> Result<(), GraphError<E>> {
        if self.frozen {
            warn!("build called twice");
            return Err(GraphError::GraphFrozen);
        }

        for (i, node) in self.nodes.iter_mut().enumerate() {
            let id = NodeId::from_index(i);
            if let Ok(pos) = node.ancestors.binary_search(&id) {
                node.ancestors.remove(pos);
                node.self_loop = true;
                trace!(entity = ?node.entity, "self loop");
            }
        }

        // Node ids are visited in ascending order, so every descendant list
        // comes out sorted.
        let mut edge_count = 0;
        for i in 0..self.nodes.len() {
            let id = NodeId::from_index(i);
            for k in 0..self.nodes[i].ancestors.len() {
                let ancestor = self.nodes[i].ancestors[k];
                self.nodes[ancestor.index()].descendants.push(id);
                edge_count += 1;
            }
        }

        for node in &mut self.nodes {
            node.adjacency = merge_sorted(&node.ancestors, &node.descendants);
        }

        self.edge_count = edge_count;
        self.frozen = true;

        debug!(
            nodes = self.nodes.len(),
            edges = edge_count,
            self_loops = self.self_loops().count(),
            "node table built"
        );
        Ok(())
    }

    fn intern(&mut self, entity: &E) -> NodeId {
        if let Some(&id) = self.index.get(entity) {
            return id;
        }
        let id = NodeId::from_index(self.nodes.len());
        self.index.insert(entity.clone(), id);
        self.nodes.push(Node::new(entity.clone()));
        id
    }
}

impl<E> NodeTable<E> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of dependency edges, self references excluded. Zero before
    /// build.
    #[must_use]
    pub const fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// `true` once [`build`](NodeTable::build) succeeded.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// # Panics
    ///
    /// Panics if `id` was not allocated by this table.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node<E> {
        &self.nodes[id.index()]
    }

    /// # Panics
    ///
    /// Panics if `id` was not allocated by this table.
    #[must_use]
    pub fn entity(&self, id: NodeId) -> &E {
        &self.nodes[id.index()].entity
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node<E>] {
        &self.nodes
    }

    /// Node ids in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::from_index)
    }

    /// Entities flagged as depending on themselves, in node order.
    pub fn self_loops(&self) -> impl Iterator<Item = &E> + '_ {
        self.nodes.iter().filter(|n| n.self_loop).map(|n| &n.entity)
    }

    /// Nodes without ancestors, in node order.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids().filter(|&id| self.node(id).is_root())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<E> {
        &mut self.nodes[id.index()]
    }
}

impl<E: Entity> NodeTable<E> {
    /// Look up the node allocated for `entity`.
    #[must_use]
    pub fn id_of(&self, entity: &E) -> Option<NodeId> {
        self.index.get(entity).copied()
    }
}

/// Merge two sorted id lists into one sorted list without duplicates.
fn merge_sorted(a: &[NodeId], b: &[NodeId]) -> Vec<NodeId> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
