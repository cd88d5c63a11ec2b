//! Error taxonomy for graph construction and resolution.
//!
//! Errors fall into three groups:
//!
//! - **Contract violations** (`G1xxx`): the caller fed the engine data it
//!   promised not to (duplicate links, mutation after build).
//! - **User-facing failures** (`G2xxx`): properties of the input graph the
//!   caller's semantics forbid, such as an import cycle.
//! - **Internal invariant failures** (`G9xxx`): the engine itself produced
//!   an inconsistent result. These must never be swallowed.

use std::fmt;

use crate::cycle::Cycle;
use crate::split::CompId;

/// Machine-readable error codes for graph errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    DuplicateLink,
    DuplicateEntity,
    GraphFrozen,
    CycleDetected,
    SelfLoop,
    IllegalCluster,
    IncompleteRanking,
}

impl ErrorCode {
    /// Stable code identifier (`G####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::DuplicateLink => "G1001",
            Self::DuplicateEntity => "G1002",
            Self::GraphFrozen => "G1003",
            Self::CycleDetected => "G2001",
            Self::SelfLoop => "G2002",
            Self::IllegalCluster => "G2003",
            Self::IncompleteRanking => "G9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::DuplicateLink => "Dependency link registered twice",
            Self::DuplicateEntity => "Entity declared twice",
            Self::GraphFrozen => "Graph mutated after build",
            Self::CycleDetected => "Dependency cycle detected",
            Self::SelfLoop => "Entity depends on itself",
            Self::IllegalCluster => "Cluster contains members that cannot be mutually dependent",
            Self::IncompleteRanking => "Ranking left entities unranked",
        }
    }

    /// Optional remediation hint for the operator.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::DuplicateLink => Some("De-duplicate dependency lists before adding entities."),
            Self::DuplicateEntity => Some("Add each entity exactly once with its full dependency list."),
            Self::GraphFrozen => Some("Add all entities before calling build."),
            Self::CycleDetected => Some("Remove one of the listed dependencies to break the cycle."),
            Self::SelfLoop => Some("Remove the dependency of the entity on itself."),
            Self::IllegalCluster => None,
            Self::IncompleteRanking => Some("This is a bug in the resolver. Report it with the input graph."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors returned by graph construction and resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError<E: fmt::Debug> {
    /// The same dependency was listed twice for one entity.
    #[error("duplicate dependency link: {entity:?} -> {dependency:?}")]
    DuplicateLink { entity: E, dependency: E },

    /// An entity was declared twice; ancestors are fixed at creation.
    #[error("entity {entity:?} declared more than once")]
    DuplicateEntity { entity: E },

    /// `add` or `build` was called on an already built graph.
    #[error("graph is frozen: mutation after build")]
    GraphFrozen,

    /// Strict-acyclic resolution found a cycle.
    #[error("dependency cycle detected: {:?}", .0.entities())]
    CycleDetected(Cycle<E>),

    /// An entity depends directly on itself where that is forbidden.
    #[error("entity {entity:?} depends on itself")]
    SelfLoop { entity: E },

    /// A cluster contains members the caller's policy does not admit.
    #[error("cluster {members:?} has members that cannot be mutually dependent: {rejected:?}")]
    IllegalCluster { members: Vec<E>, rejected: Vec<E> },

    /// Ranking terminated with unranked vertices left in a component.
    #[error("incomplete ranking in component {component}: ranked {ranked} of {total}")]
    IncompleteRanking {
        component: CompId,
        ranked: usize,
        total: usize,
    },
}

impl<E: fmt::Debug> GraphError<E> {
    /// Machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateLink { .. } => ErrorCode::DuplicateLink,
            Self::DuplicateEntity { .. } => ErrorCode::DuplicateEntity,
            Self::GraphFrozen => ErrorCode::GraphFrozen,
            Self::CycleDetected(_) => ErrorCode::CycleDetected,
            Self::SelfLoop { .. } => ErrorCode::SelfLoop,
            Self::IllegalCluster { .. } => ErrorCode::IllegalCluster,
            Self::IncompleteRanking { .. } => ErrorCode::IncompleteRanking,
        }
    }

    /// Returns `true` for internal invariant failures.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::IncompleteRanking { .. })
    }

    /// Returns the cycle carried by a [`GraphError::CycleDetected`].
    #[must_use]
    pub fn cycle(&self) -> Option<&Cycle<E>> {
        match self {
            Self::CycleDetected(cycle) => Some(cycle),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL: [ErrorCode; 7] = [
        ErrorCode::DuplicateLink,
        ErrorCode::DuplicateEntity,
        ErrorCode::GraphFrozen,
        ErrorCode::CycleDetected,
        ErrorCode::SelfLoop,
        ErrorCode::IllegalCluster,
        ErrorCode::IncompleteRanking,
    ];

    #[test]
    fn all_codes_are_unique() {
        let codes: HashSet<&str> = ALL.iter().map(|c| c.code()).collect();
        assert_eq!(codes.len(), ALL.len());
    }

    #[test]
    fn codes_have_group_prefixes() {
        for code in ALL {
            assert!(code.code().starts_with('G'), "{code}");
            assert!(!code.message().is_empty());
        }
        assert!(ErrorCode::IncompleteRanking.code().starts_with("G9"));
    }

    #[test]
    fn only_ranking_failure_is_internal() {
        let err: GraphError<u32> = GraphError::IncompleteRanking {
            component: CompId(0),
            ranked: 1,
            total: 3,
        };
        assert!(err.is_internal());
        assert!(!GraphError::<u32>::GraphFrozen.is_internal());
        assert_eq!(err.code(), ErrorCode::IncompleteRanking);
    }

    #[test]
    fn cycle_display_lists_path() {
        let err = GraphError::CycleDetected(Cycle::new(vec!["foo", "bar"]));
        assert_eq!(err.to_string(), r#"dependency cycle detected: ["bar", "foo"]"#);
        assert_eq!(err.cycle().map(Cycle::len), Some(2));
    }

    #[test]
    fn display_mentions_entities() {
        let err = GraphError::DuplicateLink {
            entity: "foo",
            dependency: "bar",
        };
        let text = err.to_string();
        assert!(text.contains("foo"));
        assert!(text.contains("bar"));
    }
}
