#![forbid(unsafe_code)]
//! Dependency-graph resolution engine.
//!
//! # Overview
//!
//! Given a set of entities (compilation units, or unit-level symbols) and
//! what each one depends on, the engine detects illegal cycles, groups
//! legal ones into clusters, splits the graph into independent components,
//! ranks every entity topologically and finds entities nothing public
//! needs. Entities are opaque: anything [`Entity`] works.
//!
//! ## Pipeline
//!
//! ```text
//! (entity, deps) pairs
//!        ↓  node::NodeTable::add / build
//! NodeTable (ancestors, descendants, adjacency)
//!        ↓  cycle::find_cycle           (strict mode: first cycle is fatal)
//!        ↓  split::Partition::split
//! Components + isolated nodes
//!        ↓  cluster::ClusterFinder      (Tarjan, per component)
//!        ↓  rank::CohortRanker          (clusters collapsed, Kahn waves)
//! Resolution: cohorts, clusters, ranks
//!        ↓  prune::prune_private / prune_unreachable
//! Prunable entities
//! ```
//!
//! ## Typical Usage
//!
//! ```rust
//! use ku_graph::{Resolver, ResolveOptions};
//!
//! let mut resolver = Resolver::new();
//! resolver.add("fmt", ["io"]).unwrap();
//! resolver.add("main", ["fmt", "io"]).unwrap();
//!
//! let resolution = resolver.resolve().unwrap();
//! assert_eq!(resolution.cohorts(), vec![vec!["io"], vec!["fmt"], vec!["main"]]);
//!
//! let mut strict = Resolver::with_options(ResolveOptions::strict());
//! strict.add("a", ["b"]).unwrap();
//! strict.add("b", ["a"]).unwrap();
//! let err = strict.resolve().unwrap_err();
//! assert_eq!(err.cycle().unwrap().to_string(), "a -> b -> a");
//! ```
//!
//! # Conventions
//!
//! - **Errors**: [`GraphError`] via `thiserror`; nothing panics on bad input.
//! - **Logging**: `tracing` macros. Phase summaries at `debug!`, per-node
//!   detail at `trace!`.

use std::fmt::Debug;
use std::hash::Hash;

pub mod cluster;
pub mod cycle;
pub mod error;
pub mod node;
pub mod policy;
pub mod prune;
pub mod rank;
pub mod resolve;
pub mod split;

pub use cluster::{Cluster, ClusterFinder, ClusterId};
pub use cycle::{Cycle, CycleLink, CycleReport, find_cycle};
pub use error::{ErrorCode, GraphError};
pub use node::{Node, NodeId, NodeTable};
pub use policy::{AnyCluster, ClusterPolicy, NoCluster};
pub use prune::{Prunable, prune_private, prune_unreachable};
pub use rank::{CohortRanker, Rankee};
pub use resolve::{
    CohortEntry, Mode, ParseModeError, Resolution, ResolutionStats, ResolveOptions, Resolver,
};
pub use split::{CompId, Component, Partition, VertId, Vertex};

/// Identifier of something the graph tracks.
///
/// The ordering decides cohort order and canonical cycle start, so it must
/// be stable across runs.
pub trait Entity: Clone + Ord + Hash + Debug {}

impl<T: Clone + Ord + Hash + Debug> Entity for T {}
