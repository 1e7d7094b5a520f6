//! Store and catalog traits for the linkage engine.
//!
//! This module defines the persistence seams the engine operates through.
//! External crates implement these traits to provide different storage
//! backends; each method call must be applied atomically by the
//! implementation, and a deployment must give the link operation
//! serializable isolation on the edge relation.

use async_trait::async_trait;

use super::entity::{
    Entity, EntityId, EntityStatus, LinkageEdge, NewTag, TagRow, TagRowId, TriggerId, TriggerSpan,
    ValueMap, ValueMapId, ValueMapInput,
};
use crate::error::StoreError;

/// Read/write access to the linkage edge relation
#[async_trait]
pub trait LinkageStore: Send + Sync {
    /// Edges matching the given template and/or target sets; a `None` side is
    /// unconstrained
    async fn edges_matching(
        &self,
        template_ids: Option<&[EntityId]>,
        target_ids: Option<&[EntityId]>,
    ) -> Result<Vec<LinkageEdge>, StoreError>;

    /// Every edge whose child (target) entity carries one of the given
    /// statuses
    async fn edges_by_child_status(
        &self,
        statuses: &[EntityStatus],
    ) -> Result<Vec<LinkageEdge>, StoreError>;

    /// Insert a batch of edges atomically
    async fn insert_edges(&self, edges: &[LinkageEdge]) -> Result<(), StoreError>;

    /// Delete edges matching the template set and, when given, the target
    /// set; returns the number of edges removed
    async fn delete_edges(
        &self,
        template_ids: &[EntityId],
        target_ids: Option<&[EntityId]>,
    ) -> Result<u64, StoreError>;
}

/// Read/write access to the tag relation
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Persisted tags for the given targets
    async fn tags_for_targets(&self, target_ids: &[EntityId]) -> Result<Vec<TagRow>, StoreError>;

    /// Apply a tag change set atomically, deletions before insertions
    async fn apply_tag_changes(
        &self,
        delete: &[TagRowId],
        insert: &[NewTag],
    ) -> Result<(), StoreError>;
}

/// Read/write access to the value-map relation
#[async_trait]
pub trait ValueMapStore: Send + Sync {
    /// Persisted value maps with their mappings for the given targets
    async fn value_maps_for(&self, target_ids: &[EntityId]) -> Result<Vec<ValueMap>, StoreError>;

    /// Delete every value map owned by `target_id` and recreate the given
    /// maps, returning the newly assigned ids in input order
    ///
    /// The delete and the inserts run as one transaction; an empty `maps`
    /// list deletes without recreating anything.
    async fn replace_value_maps(
        &self,
        target_id: EntityId,
        maps: &[ValueMapInput],
    ) -> Result<Vec<ValueMapId>, StoreError>;

    /// Delete every value map owned by any of the given targets
    async fn delete_value_maps(&self, target_ids: &[EntityId]) -> Result<(), StoreError>;
}

/// Permission-free entity metadata lookups
#[async_trait]
pub trait EntityDirectory: Send + Sync {
    /// Entities for the given ids; unknown ids are omitted from the result
    async fn entities_by_ids(&self, ids: &[EntityId]) -> Result<Vec<Entity>, StoreError>;
}

/// Read access to triggers and their cross-template relations
#[async_trait]
pub trait TriggerCatalog: Send + Sync {
    /// Triggers defined on the given template
    async fn triggers_on(&self, template_id: EntityId) -> Result<Vec<TriggerId>, StoreError>;

    /// Distinct template-status entities hosting a trigger that any of the
    /// given triggers declare a dependency on
    async fn dependency_templates_of(
        &self,
        trigger_ids: &[TriggerId],
    ) -> Result<Vec<EntityId>, StoreError>;

    /// Item spans of every trigger referencing items from at least one of
    /// the given templates
    ///
    /// Each span lists every template-status entity whose items that trigger
    /// references, including the matched one.
    async fn trigger_item_spans(
        &self,
        template_ids: &[EntityId],
    ) -> Result<Vec<TriggerSpan>, StoreError>;
}
