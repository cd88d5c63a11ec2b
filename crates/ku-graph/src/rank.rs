//! Cohort ranking: layered topological sort of a component.
//!
//! # Overview
//!
//! Every vertex gets a rank: roots are rank 0 and every other vertex sits
//! one rank above its highest ranked ancestor. Vertices of equal rank form a
//! *cohort*, which downstream phases process as a batch.
//!
//! Clusters are collapsed first. Each cluster becomes one super-vertex that
//! carries the union of its members' external edges, so members share a
//! single rank and the collapsed graph is a DAG.
//!
//! # Algorithm
//!
//! Kahn-style waves. Each super-vertex starts with a count of unranked
//! ancestors; the first wave holds those with a count of zero. Processing a
//! super-vertex decrements the count of its descendants and raises their
//! candidate rank to `rank + 1`. A descendant whose count drops to zero is
//! final and joins the next wave.
//!
//! Cohorts are sorted by entity (a cluster sorts by its lowest member), so
//! the result does not depend on wave processing order.

#![allow(clippy::module_name_repetitions)]

use serde::Serialize;
use tracing::{debug, error, instrument};

use crate::Entity;
use crate::cluster::ClusterId;
use crate::error::GraphError;
use crate::node::NodeTable;
use crate::split::{Component, VertId};

/// One entry of a component cohort: a plain vertex or a collapsed cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Rankee {
    Vertex(VertId),
    Cluster(ClusterId),
}

/// Reusable ranking buffers.
#[derive(Debug, Default)]
pub struct CohortRanker {
    /// Unranked ancestor count per super-vertex.
    left: Vec<u32>,
    rank: Vec<u32>,
    wave: Vec<usize>,
    next: Vec<usize>,
}

impl CohortRanker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rank every vertex of `comp` and store its cohorts.
    ///
    /// Clusters must already be recorded on the component.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::IncompleteRanking`] if some super-vertex never
    /// became ready. This cannot happen for a correctly collapsed component
    /// and indicates a bug.
    #[instrument(skip_all, fields(component = %comp.id(), size = comp.len()))]
    pub fn rank<E: Entity>(
        &mut self,
        comp: &mut Component,
        table: &NodeTable<E>,
    ) -> Result<(), GraphError<E>> {
        if comp.no_cluster() {
            rank_two_levels(comp, table);
            return Ok(());
        }

        let collapsed = Collapsed::new(comp);
        let total = collapsed.len();

        self.left.clear();
        self.left.resize(total, 0);
        self.rank.clear();
        self.rank.resize(total, 0);
        self.wave.clear();
        self.next.clear();

        for descendants in &collapsed.descendants {
            for &d in descendants {
                self.left[d] += 1;
            }
        }

        self.wave.extend((0..total).filter(|&s| self.left[s] == 0));

        let mut cohorts: Vec<Vec<usize>> = vec![self.wave.clone()];
        let mut ranked = 0;

        while !self.wave.is_empty() {
            for k in 0..self.wave.len() {
                let s = self.wave[k];
                let passed = self.rank[s] + 1;

                for &d in &collapsed.descendants[s] {
                    self.left[d] -= 1;
                    self.rank[d] = self.rank[d].max(passed);

                    if self.left[d] == 0 {
                        let r = self.rank[d] as usize;
                        if cohorts.len() <= r {
                            cohorts.resize_with(r + 1, Vec::new);
                        }
                        cohorts[r].push(d);
                        self.next.push(d);
                    }
                }
            }

            ranked += self.wave.len();
            std::mem::swap(&mut self.wave, &mut self.next);
            self.next.clear();
        }

        if ranked < total {
            error!(component = %comp.id(), ranked, total, "ranking left vertices unranked");
            return Err(GraphError::IncompleteRanking {
                component: comp.id(),
                ranked,
                total,
            });
        }

        for (s, members) in collapsed.members.iter().enumerate() {
            for &v in members {
                comp.vertex_mut(v).set_rank(self.rank[s]);
            }
        }

        let key = |r: &Rankee| representative(comp, table, *r);
        let cohorts: Vec<Vec<Rankee>> = cohorts
            .into_iter()
            .map(|cohort| {
                let mut entries: Vec<Rankee> =
                    cohort.into_iter().map(|s| collapsed.rankees[s]).collect();
                entries.sort_by(|a, b| key(a).cmp(key(b)));
                entries
            })
            .collect();

        debug!(cohorts = cohorts.len(), "component ranked");
        comp.set_cohorts(cohorts);
        Ok(())
    }
}

/// Fast path: every vertex is a root (rank 0) or a pinnacle (rank 1).
fn rank_two_levels<E: Entity>(comp: &mut Component, table: &NodeTable<E>) {
    let pinnacles = comp.pinnacles().to_vec();
    for &v in &pinnacles {
        comp.vertex_mut(v).set_rank(1);
    }

    let sorted = |list: &[VertId]| {
        let mut list = list.to_vec();
        list.sort_by(|a, b| {
            let a = table.entity(comp.vertex(*a).node());
            let b = table.entity(comp.vertex(*b).node());
            a.cmp(b)
        });
        list.into_iter().map(Rankee::Vertex).collect::<Vec<_>>()
    };
    let cohorts = vec![sorted(comp.roots()), sorted(&pinnacles)];
    comp.set_cohorts(cohorts);
}

/// Entity a cohort entry sorts by.
fn representative<'a, E>(comp: &Component, table: &'a NodeTable<E>, rankee: Rankee) -> &'a E {
    let vert = match rankee {
        Rankee::Vertex(v) => v,
        Rankee::Cluster(c) => comp.cluster(c).head(),
    };
    table.entity(comp.vertex(vert).node())
}

/// Component view with every cluster collapsed into one super-vertex.
struct Collapsed {
    rankees: Vec<Rankee>,

    /// Vertices standing behind each super-vertex.
    members: Vec<Vec<VertId>>,

    /// Sorted, de-duplicated super-vertex descendants.
    descendants: Vec<Vec<usize>>,
}

impl Collapsed {
    fn new(comp: &Component) -> Self {
        let mut rankees = Vec::with_capacity(comp.len());
        let mut members: Vec<Vec<VertId>> = Vec::with_capacity(comp.len());

        // Super-vertex of each vertex.
        let mut sv = vec![usize::MAX; comp.len()];

        for cluster in comp.clusters() {
            let s = rankees.len();
            rankees.push(Rankee::Cluster(cluster.id()));
            members.push(cluster.members().to_vec());
            for &v in cluster.members() {
                sv[v.index()] = s;
            }
        }
        for (i, vert) in comp.verts().iter().enumerate() {
            if vert.cluster().is_none() {
                let v = VertId::from_index(i);
                sv[i] = rankees.len();
                rankees.push(Rankee::Vertex(v));
                members.push(vec![v]);
            }
        }

        let mut descendants: Vec<Vec<usize>> = vec![Vec::new(); rankees.len()];
        for (i, vert) in comp.verts().iter().enumerate() {
            let from = sv[i];
            for d in vert.descendants() {
                let to = sv[d.index()];
                if to != from {
                    descendants[from].push(to);
                }
            }
        }
        for list in &mut descendants {
            list.sort_unstable();
            list.dedup();
        }

        Self {
            rankees,
            members,
            descendants,
        }
    }

    fn len(&self) -> usize {
        self.rankees.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
