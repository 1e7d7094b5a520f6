//!
//! Templink Core - Template linkage consistency engine
//!
//! This crate keeps the template-to-target linkage of a monitoring
//! configuration backend consistent. It validates and applies linkage
//! changes (link, unlink), reconciles entity tags against desired state,
//! and replaces the value maps attached to hosts and templates, while
//! enforcing the graph invariants: no cycles and no template reachable
//! from a target along two distinct paths.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - entities, the linkage graph, and store traits
pub mod domain;

/// Application services - linkage, tag, and value map operations
pub mod application;

/// Request context - authorization and audit plumbing
pub mod context;

/// Error types
pub mod error;

// Re-export key types
pub use context::{AuditSink, Authorizer, RequestContext, TracingAuditSink};
pub use error::{DependencyViolation, DuplicateTemplates, LinkageError, LinkageResult, StoreError};

// Re-export main API types for easy use
pub use application::linkage_service::LinkageService;
pub use application::tag_service::{TagReconciler, TAG_NAME_MAX, TAG_VALUE_MAX};
pub use application::validator::LinkageValidator;
pub use application::value_map_service::{
    validate_value_maps, ValueMapService, MAPPING_DISPLAY_MAX, MAPPING_KEY_MAX, VALUE_MAP_NAME_MAX,
};
pub use domain::entity::{
    Entity, EntityId, EntityKind, EntityStatus, LinkageEdge, Mapping, NewTag, Tag, TagRow,
    TagRowId, TriggerId, TriggerSpan, ValueMap, ValueMapId, ValueMapInput,
};
pub use domain::graph::LinkageGraph;
pub use domain::store::{EntityDirectory, LinkageStore, TagStore, TriggerCatalog, ValueMapStore};
