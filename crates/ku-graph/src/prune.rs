//! Liveness pruning: find entities that no externally visible entity needs.
//!
//! Two strategies:
//!
//! - [`prune_private`] works on an already resolved graph and a set of
//!   public entities. An isolated entity is prunable unless it is public. A
//!   component is kept whole as soon as one member is public, since private
//!   members may still be needed by the public one; otherwise every member
//!   is prunable and the component is flagged once.
//! - [`prune_unreachable`] walks ancestor links from a set of root entities
//!   (e.g. `main` and exported symbols). Everything not reached is dead.
//!
//! Both are monotonic: adding a public entity or a root never grows the
//! prunable set.

#![allow(clippy::module_name_repetitions)]

use std::borrow::Borrow;
use std::collections::HashSet;
use std::hash::BuildHasher;

use fixedbitset::FixedBitSet;
use serde::Serialize;
use tracing::{debug, instrument, trace};

use crate::Entity;
use crate::node::NodeTable;
use crate::resolve::Resolution;
use crate::split::CompId;

/// Entities that downstream phases may skip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prunable<E> {
    /// Sorted.
    pub entities: Vec<E>,

    /// Components pruned as a whole, ascending.
    pub components: Vec<CompId>,
}

impl<E> Default for Prunable<E> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            components: Vec::new(),
        }
    }
}

impl<E: Ord> Prunable<E> {
    #[must_use]
    pub fn contains(&self, entity: &E) -> bool {
        self.entities.binary_search(entity).is_ok()
    }
}

impl<E> Prunable<E> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Prune private isolated entities and components without a public member.
#[must_use]
#[instrument(skip_all, fields(public = public.len()))]
pub fn prune_private<E, S>(resolution: &Resolution<E>, public: &HashSet<E, S>) -> Prunable<E>
where
    E: Entity,
    S: BuildHasher,
{
    let table = resolution.table();
    let mut out = Prunable::default();

    for &id in resolution.partition().isolated() {
        let entity = table.entity(id);
        if !public.contains(entity) {
            out.entities.push(entity.clone());
        }
    }

    for comp in resolution.components() {
        if comp.nodes().any(|n| public.contains(table.entity(n))) {
            continue;
        }
        trace!(component = %comp.id(), size = comp.len(), "component has no public member");
        out.components.push(comp.id());
        out.entities.extend(comp.nodes().map(|n| table.entity(n).clone()));
    }

    out.entities.sort();
    debug!(
        entities = out.entities.len(),
        components = out.components.len(),
        "private entities pruned"
    );
    out
}

/// Prune everything the `roots` do not (transitively) depend on.
///
/// Root entities unknown to the table are ignored.
#[must_use]
#[instrument(skip_all, fields(nodes = table.len()))]
pub fn prune_unreachable<E, I>(table: &NodeTable<E>, roots: I) -> Prunable<E>
where
    E: Entity,
    I: IntoIterator,
    I::Item: Borrow<E>,
{
    let mut reached = FixedBitSet::with_capacity(table.len());
    let mut stack = Vec::new();

    for root in roots {
        let root = root.borrow();
        let Some(id) = table.id_of(root) else {
            debug!(?root, "unknown root ignored");
            continue;
        };
        if !reached.put(id.index()) {
            stack.push(id);
        }
    }

    while let Some(id) = stack.pop() {
        for &ancestor in table.node(id).ancestors() {
            if !reached.put(ancestor.index()) {
                stack.push(ancestor);
            }
        }
    }

    let mut entities: Vec<E> = table
        .ids()
        .filter(|id| !reached.contains(id.index()))
        .map(|id| table.entity(id).clone())
        .collect();
    entities.sort();

    debug!(
        reached = reached.count_ones(..),
        pruned = entities.len(),
        "unreachable entities pruned"
    );
    Prunable {
        entities,
        components: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
