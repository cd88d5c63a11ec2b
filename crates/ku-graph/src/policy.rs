//! Cluster admission policies.
//!
//! The engine does not know what kind of thing an entity is. Whether a
//! cluster of mutually dependent entities is acceptable (recursive types,
//! mutually recursive functions) or an error (recursive constants) is
//! decided by the caller through a [`ClusterPolicy`], checked with
//! [`Resolution::check_clusters`](crate::Resolution::check_clusters).

/// Decides which entities may take part in a cluster.
pub trait ClusterPolicy<E> {
    /// Returns `true` if `member` may be part of a cluster.
    fn admits(&self, member: &E) -> bool;
}

impl<E, F> ClusterPolicy<E> for F
where
    F: Fn(&E) -> bool,
{
    fn admits(&self, member: &E) -> bool {
        self(member)
    }
}

/// Admits every entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnyCluster;

impl<E> ClusterPolicy<E> for AnyCluster {
    fn admits(&self, _member: &E) -> bool {
        true
    }
}

/// Admits no entity: any cluster is illegal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoCluster;

impl<E> ClusterPolicy<E> for NoCluster {
    fn admits(&self, _member: &E) -> bool {
        false
    }
}
