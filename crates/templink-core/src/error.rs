use std::fmt;

use thiserror::Error;

use crate::domain::entity::EntityId;

/// Convenience alias for results of engine operations.
pub type LinkageResult<T> = Result<T, LinkageError>;

/// Error type for the linkage engine.
///
/// The display strings of the rejection variants are user-facing diagnostics;
/// callers surface them verbatim.
#[derive(Error, Debug)]
pub enum LinkageError {
    /// A referenced template is not readable by the caller, or does not exist.
    #[error("No permissions to referred object or it does not exist")]
    PermissionDenied,

    /// The same template id was passed more than once in one linkage request.
    #[error("Cannot pass duplicate template IDs for the linkage: {0}")]
    DuplicateInput(DuplicateTemplates),

    /// Linking would violate a trigger-dependency constraint between templates.
    #[error("{0}")]
    DependencyViolation(DependencyViolation),

    /// The proposed edge set would create a cycle.
    #[error("Circular template linkage is not allowed")]
    CyclicLinkage,

    /// An entity would be reachable through two distinct linkage paths from
    /// the same root.
    #[error("Template cannot be linked to another template more than once even through other templates")]
    DiamondLinkage,

    /// Malformed tag or value-map input.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Storage failure; the operation was aborted with prior state intact.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Error type produced by store adapters.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A write referenced an entity the store does not know.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The backing storage failed.
    #[error("Storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Duplicated template ids with their repeat counts, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateTemplates(pub Vec<(EntityId, usize)>);

impl fmt::Display for DuplicateTemplates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (id, count) in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "template ID \"{id}\" is passed {count} times")?;
            first = false;
        }
        Ok(())
    }
}

/// Details of a trigger-dependency rule violated by a link request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyViolation {
    /// A trigger on `template` depends on a trigger hosted on `depends_on`,
    /// and `depends_on` is not linked to the same targets.
    CrossTemplateDependency {
        /// Display name of the template being linked.
        template: String,
        /// Display name of the template its trigger depends on.
        depends_on: String,
    },
    /// A trigger references items provided by `template`, and `template` is
    /// not linked to the host.
    UnlinkedItems {
        /// Display name of the template providing the items.
        template: String,
    },
}

impl fmt::Display for DependencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CrossTemplateDependency {
                template,
                depends_on,
            } => write!(
                f,
                "Trigger in template \"{template}\" has dependency with trigger in template \"{depends_on}\""
            ),
            Self::UnlinkedItems { template } => write!(
                f,
                "Trigger has items from template \"{template}\" that is not linked to host"
            ),
        }
    }
}
