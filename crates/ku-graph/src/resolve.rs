//! Resolution façade: runs the phases in order and exposes their results.
//!
//! # Overview
//!
//! ```text
//! Resolver::add (entity, deps) ...
//!        ↓  NodeTable::build
//!        ↓  self-loop check (strict mode, or when enabled)
//!        ↓  find_cycle (strict mode only; a cycle ends resolution)
//!        ↓  Partition::split
//!        ↓  per component: ClusterFinder::find, CohortRanker::rank
//! Resolution
//! ```
//!
//! # Modes
//!
//! - [`Mode::Ranking`]: cycles are legal. They come back as clusters and
//!   share a rank.
//! - [`Mode::StrictAcyclic`]: any cycle is an error, reported as the first
//!   canonical [`Cycle`](crate::Cycle) found.
//!
//! # Global Cohorts
//!
//! Components are independent, so the global cohort at rank `r` is the
//! union of rank `r` of every component, with isolated entities joining
//! rank 0. Every cohort is sorted by entity.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashSet;
use std::fmt;
use std::hash::BuildHasher;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::Entity;
use crate::cluster::ClusterFinder;
use crate::cycle::find_cycle;
use crate::error::GraphError;
use crate::node::{NodeId, NodeTable};
use crate::policy::ClusterPolicy;
use crate::prune::{Prunable, prune_private};
use crate::rank::{CohortRanker, Rankee};
use crate::split::{CompId, Component, Partition, VertId};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How cycles are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Cycles become clusters.
    #[default]
    Ranking,

    /// Any cycle fails resolution.
    StrictAcyclic,
}

impl Mode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ranking => "ranking",
            Self::StrictAcyclic => "strict-acyclic",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`Mode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode '{0}': expected 'ranking' or 'strict-acyclic'")]
pub struct ParseModeError(pub String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "ranking" => Ok(Self::Ranking),
            "strict-acyclic" | "strict" => Ok(Self::StrictAcyclic),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Resolution settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveOptions {
    pub mode: Mode,

    /// Reject self-loops in ranking mode too. Strict mode always rejects
    /// them.
    pub check_self_loops: bool,
}

impl ResolveOptions {
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            mode: Mode::StrictAcyclic,
            check_self_loops: true,
        }
    }

    const fn rejects_self_loops(self) -> bool {
        matches!(self.mode, Mode::StrictAcyclic) || self.check_self_loops
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Collects entities, then resolves them in one go.
#[derive(Debug, Clone)]
pub struct Resolver<E> {
    table: NodeTable<E>,
    options: ResolveOptions,
}

impl<E: Entity> Default for Resolver<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Resolver<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ResolveOptions::default())
    }

    #[must_use]
    pub fn with_options(options: ResolveOptions) -> Self {
        Self {
            table: NodeTable::new(),
            options,
        }
    }

    #[must_use]
    pub const fn options(&self) -> ResolveOptions {
        self.options
    }

    /// Number of entities known so far, declared or referenced.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Register `entity` and the entities it depends on.
    ///
    /// # Errors
    ///
    /// See [`NodeTable::add`].
    pub fn add<I>(&mut self, entity: E, deps: I) -> Result<NodeId, GraphError<E>>
    where
        I: IntoIterator<Item = E>,
    {
        self.table.add(entity, deps)
    }

    /// Build the graph and run every phase.
    ///
    /// # Errors
    ///
    /// - [`GraphError::SelfLoop`] if self-loops are rejected and one exists.
    /// - [`GraphError::CycleDetected`] in strict mode if the graph has a
    ///   cycle.
    /// - [`GraphError::IncompleteRanking`] on an internal ranking failure.
    #[instrument(skip(self), fields(mode = %self.options.mode, entities = self.table.len()))]
    pub fn resolve(self) -> Result<Resolution<E>, GraphError<E>> {
        let Self { mut table, options } = self;
        table.build()?;

        if options.rejects_self_loops()
            && let Some(entity) = table.self_loops().next()
        {
            warn!(?entity, "self loop rejected");
            return Err(GraphError::SelfLoop {
                entity: entity.clone(),
            });
        }

        if options.mode == Mode::StrictAcyclic
            && let Some(cycle) = find_cycle(&table)
        {
            info!(len = cycle.len(), "dependency cycle rejected");
            return Err(GraphError::CycleDetected(cycle));
        }

        let mut partition = Partition::split(&mut table);
        let mut finder = ClusterFinder::with_capacity(partition.max_comp_size());
        let mut ranker = CohortRanker::new();

        for comp in partition.components_mut() {
            let clusters = finder.find(comp, &table);
            comp.set_clusters(clusters);
            ranker.rank(comp, &table)?;
        }

        let resolution = Resolution {
            table,
            partition,
            options,
        };
        debug!(stats = ?resolution.stats(), "resolved");
        Ok(resolution)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// One entry of a global cohort.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortEntry<E> {
    Entity(E),

    /// Members of a cluster, sorted.
    Cluster(Vec<E>),
}

impl<E> CohortEntry<E> {
    /// Entity this entry sorts by: the entity itself or the lowest cluster
    /// member.
    #[must_use]
    pub fn head(&self) -> &E {
        match self {
            Self::Entity(entity) => entity,
            Self::Cluster(members) => &members[0],
        }
    }

    #[must_use]
    pub fn into_entities(self) -> Vec<E> {
        match self {
            Self::Entity(entity) => vec![entity],
            Self::Cluster(members) => members,
        }
    }
}

/// Counters describing a resolved graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    pub nodes: usize,
    pub edges: usize,
    pub components: usize,
    pub isolated: usize,
    pub clusters: usize,
    pub cohorts: usize,
    pub self_loops: usize,
    pub max_component: usize,
}

/// A fully resolved graph.
#[derive(Debug, Clone)]
pub struct Resolution<E> {
    table: NodeTable<E>,
    partition: Partition,
    options: ResolveOptions,
}

impl<E> Resolution<E> {
    #[must_use]
    pub const fn table(&self) -> &NodeTable<E> {
        &self.table
    }

    #[must_use]
    pub const fn partition(&self) -> &Partition {
        &self.partition
    }

    #[must_use]
    pub const fn options(&self) -> ResolveOptions {
        self.options
    }

    #[must_use]
    pub fn components(&self) -> &[Component] {
        self.partition.components()
    }

    /// Isolated entities, in node order.
    pub fn isolated(&self) -> impl Iterator<Item = &E> + '_ {
        self.partition
            .isolated()
            .iter()
            .map(|&id| self.table.entity(id))
    }

    /// Entities that listed themselves as a dependency, in node order.
    pub fn self_loops(&self) -> impl Iterator<Item = &E> + '_ {
        self.table.self_loops()
    }

    /// Number of global cohorts.
    #[must_use]
    pub fn depth(&self) -> usize {
        let deepest = self
            .components()
            .iter()
            .map(|c| c.cohorts().len())
            .max()
            .unwrap_or(0);
        if self.partition.isolated().is_empty() {
            deepest
        } else {
            deepest.max(1)
        }
    }

    #[must_use]
    pub fn stats(&self) -> ResolutionStats {
        ResolutionStats {
            nodes: self.table.len(),
            edges: self.table.edge_count(),
            components: self.components().len(),
            isolated: self.partition.isolated().len(),
            clusters: self.components().iter().map(|c| c.clusters().len()).sum(),
            cohorts: self.depth(),
            self_loops: self.table.self_loops().count(),
            max_component: self.components().iter().map(Component::len).max().unwrap_or(0),
        }
    }
}

impl<E: Entity> Resolution<E> {
    /// Global cohorts with cluster members listed inline.
    #[must_use]
    pub fn cohorts(&self) -> Vec<Vec<E>> {
        self.cohort_entries()
            .into_iter()
            .map(|cohort| {
                let mut flat: Vec<E> = cohort
                    .into_iter()
                    .flat_map(CohortEntry::into_entities)
                    .collect();
                flat.sort();
                flat
            })
            .collect()
    }

    /// Global cohorts with each cluster as a single entry.
    #[must_use]
    pub fn cohort_entries(&self) -> Vec<Vec<CohortEntry<E>>> {
        let mut out: Vec<Vec<CohortEntry<E>>> = (0..self.depth()).map(|_| Vec::new()).collect();

        for entity in self.isolated() {
            out[0].push(CohortEntry::Entity(entity.clone()));
        }
        for comp in self.components() {
            for (rank, cohort) in comp.cohorts().iter().enumerate() {
                out[rank].extend(cohort.iter().map(|&r| self.entry(comp, r)));
            }
        }
        for cohort in &mut out {
            cohort.sort_by(|a, b| a.head().cmp(b.head()));
        }
        out
    }

    fn entry(&self, comp: &Component, rankee: Rankee) -> CohortEntry<E> {
        let entity = |v: VertId| self.table.entity(comp.vertex(v).node()).clone();
        match rankee {
            Rankee::Vertex(v) => CohortEntry::Entity(entity(v)),
            Rankee::Cluster(c) => {
                let members = comp.cluster(c).members().iter().map(|&v| entity(v));
                CohortEntry::Cluster(members.collect())
            }
        }
    }

    /// Every cluster's members, sorted; clusters ordered by lowest member.
    #[must_use]
    pub fn clusters(&self) -> Vec<Vec<E>> {
        let mut out: Vec<Vec<E>> = self
            .components()
            .iter()
            .flat_map(|comp| {
                comp.clusters().iter().map(move |cluster| {
                    cluster
                        .members()
                        .iter()
                        .map(|&v| self.table.entity(comp.vertex(v).node()).clone())
                        .collect()
                })
            })
            .collect();
        out.sort();
        out
    }

    /// Rank of `entity`; isolated entities are rank 0.
    #[must_use]
    pub fn rank_of(&self, entity: &E) -> Option<u32> {
        let id = self.table.id_of(entity)?;
        let Some(comp) = self.table.node(id).component() else {
            return Some(0);
        };
        let vert = self.partition.vert_of(id)?;
        Some(self.partition.component(comp).vertex(vert).rank())
    }

    /// Component of `entity`. `None` for isolated or unknown entities.
    #[must_use]
    pub fn component_of(&self, entity: &E) -> Option<CompId> {
        let id = self.table.id_of(entity)?;
        self.table.node(id).component()
    }

    /// Check every cluster against `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::IllegalCluster`] for the first cluster (by
    /// lowest member) holding a member the policy does not admit.
    pub fn check_clusters<P>(&self, policy: &P) -> Result<(), GraphError<E>>
    where
        P: ClusterPolicy<E> + ?Sized,
    {
        for members in self.clusters() {
            let rejected: Vec<E> = members
                .iter()
                .filter(|m| !policy.admits(m))
                .cloned()
                .collect();
            if !rejected.is_empty() {
                warn!(?members, ?rejected, "illegal cluster");
                return Err(GraphError::IllegalCluster { members, rejected });
            }
        }
        Ok(())
    }

    /// Shorthand for [`prune_private`].
    #[must_use]
    pub fn prune<S: BuildHasher>(&self, public: &HashSet<E, S>) -> Prunable<E> {
        prune_private(self, public)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
