use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use templink_core::{
    context::Authorizer,
    domain::entity::{
        Entity, EntityId, EntityKind, EntityStatus, LinkageEdge, NewTag, TagRow, TagRowId,
        TriggerId, TriggerSpan, ValueMap, ValueMapId, ValueMapInput,
    },
    domain::store::{EntityDirectory, LinkageStore, TagStore, TriggerCatalog, ValueMapStore},
    error::StoreError,
};

#[derive(Default)]
struct StoreInner {
    entities: BTreeMap<EntityId, Entity>,
    edges: Vec<LinkageEdge>,
    tags: BTreeMap<TagRowId, TagRow>,
    value_maps: BTreeMap<ValueMapId, ValueMap>,
    // trigger -> owning template
    triggers: BTreeMap<TriggerId, EntityId>,
    // (dependent trigger, depended-upon trigger)
    trigger_deps: Vec<(TriggerId, TriggerId)>,
    // trigger -> template providing one of its items
    trigger_items: Vec<(TriggerId, EntityId)>,
    next_tag_row: u64,
    next_value_map: u64,
}

impl StoreInner {
    fn is_template(&self, id: EntityId) -> bool {
        self.entities
            .get(&id)
            .map(|entity| entity.status == EntityStatus::Template)
            .unwrap_or(false)
    }
}

/// In-memory implementation of every Templink store trait
///
/// All collections live behind one lock, so each store call observes and
/// mutates a single consistent state. Primarily useful for development and
/// testing.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl InMemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity
    pub async fn add_entity(&self, entity: Entity) {
        let mut inner = self.inner.write().await;
        inner.entities.insert(entity.id, entity);
    }

    /// Register a template entity
    pub async fn add_template(&self, id: EntityId, name: &str) {
        self.add_entity(Entity::template(id, name)).await;
    }

    /// Register a monitored host entity
    pub async fn add_host(&self, id: EntityId, name: &str) {
        self.add_entity(Entity::host(id, name)).await;
    }

    /// Insert a linkage edge directly, bypassing validation
    pub async fn add_edge(&self, target_id: EntityId, template_id: EntityId) {
        let mut inner = self.inner.write().await;
        inner.edges.push(LinkageEdge::new(target_id, template_id));
    }

    /// Register a trigger owned by a template
    pub async fn add_trigger(&self, trigger_id: TriggerId, template_id: EntityId) {
        let mut inner = self.inner.write().await;
        inner.triggers.insert(trigger_id, template_id);
    }

    /// Record that `dependent` fires only in terms of `depends_on`
    pub async fn add_trigger_dependency(&self, dependent: TriggerId, depends_on: TriggerId) {
        let mut inner = self.inner.write().await;
        inner.trigger_deps.push((dependent, depends_on));
    }

    /// Record that a trigger's expression uses an item from a template
    pub async fn add_trigger_item(&self, trigger_id: TriggerId, template_id: EntityId) {
        let mut inner = self.inner.write().await;
        inner.trigger_items.push((trigger_id, template_id));
    }

    /// Current `(target, template)` edge pairs, in insertion order
    pub async fn edge_pairs(&self) -> Vec<(EntityId, EntityId)> {
        let inner = self.inner.read().await;
        inner
            .edges
            .iter()
            .map(|edge| (edge.target_id, edge.template_id))
            .collect()
    }

    /// Current tag rows, in row-id order
    pub async fn tag_rows(&self) -> Vec<TagRow> {
        let inner = self.inner.read().await;
        inner.tags.values().cloned().collect()
    }
}

#[async_trait]
impl LinkageStore for InMemoryStore {
    async fn edges_matching(
        &self,
        template_ids: Option<&[EntityId]>,
        target_ids: Option<&[EntityId]>,
    ) -> Result<Vec<LinkageEdge>, StoreError> {
        let inner = self.inner.read().await;
        let edges = inner
            .edges
            .iter()
            .filter(|edge| match template_ids {
                Some(ids) => ids.contains(&edge.template_id),
                None => true,
            })
            .filter(|edge| match target_ids {
                Some(ids) => ids.contains(&edge.target_id),
                None => true,
            })
            .copied()
            .collect();
        Ok(edges)
    }

    async fn edges_by_child_status(
        &self,
        statuses: &[EntityStatus],
    ) -> Result<Vec<LinkageEdge>, StoreError> {
        let inner = self.inner.read().await;
        let edges = inner
            .edges
            .iter()
            .filter(|edge| {
                inner
                    .entities
                    .get(&edge.target_id)
                    .map(|entity| statuses.contains(&entity.status))
                    .unwrap_or(false)
            })
            .copied()
            .collect();
        Ok(edges)
    }

    async fn insert_edges(&self, edges: &[LinkageEdge]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for edge in edges {
            if !inner.entities.contains_key(&edge.target_id) {
                return Err(StoreError::EntityNotFound(edge.target_id));
            }
            if !inner.entities.contains_key(&edge.template_id) {
                return Err(StoreError::EntityNotFound(edge.template_id));
            }
        }
        inner.edges.extend_from_slice(edges);
        debug!("Inserted {} linkage edges", edges.len());
        Ok(())
    }

    async fn delete_edges(
        &self,
        template_ids: &[EntityId],
        target_ids: Option<&[EntityId]>,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.edges.len();
        inner.edges.retain(|edge| {
            let template_match = template_ids.contains(&edge.template_id);
            let target_match = match target_ids {
                Some(ids) => ids.contains(&edge.target_id),
                None => true,
            };
            !(template_match && target_match)
        });
        let removed = (before - inner.edges.len()) as u64;
        debug!("Deleted {} linkage edges", removed);
        Ok(removed)
    }
}

#[async_trait]
impl TagStore for InMemoryStore {
    async fn tags_for_targets(&self, target_ids: &[EntityId]) -> Result<Vec<TagRow>, StoreError> {
        let inner = self.inner.read().await;
        let rows = inner
            .tags
            .values()
            .filter(|row| target_ids.contains(&row.target_id))
            .cloned()
            .collect();
        Ok(rows)
    }

    async fn apply_tag_changes(
        &self,
        delete: &[TagRowId],
        insert: &[NewTag],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for tag in insert {
            if !inner.entities.contains_key(&tag.target_id) {
                return Err(StoreError::EntityNotFound(tag.target_id));
            }
        }
        for id in delete {
            inner.tags.remove(id);
        }
        for tag in insert {
            inner.next_tag_row += 1;
            let id = TagRowId(inner.next_tag_row);
            inner.tags.insert(
                id,
                TagRow {
                    id,
                    target_id: tag.target_id,
                    tag: tag.tag.clone(),
                    value: tag.value.clone(),
                },
            );
        }
        Ok(())
    }
}

#[async_trait]
impl ValueMapStore for InMemoryStore {
    async fn value_maps_for(&self, target_ids: &[EntityId]) -> Result<Vec<ValueMap>, StoreError> {
        let inner = self.inner.read().await;
        let maps = inner
            .value_maps
            .values()
            .filter(|map| target_ids.contains(&map.target_id))
            .cloned()
            .collect();
        Ok(maps)
    }

    async fn replace_value_maps(
        &self,
        target_id: EntityId,
        maps: &[ValueMapInput],
    ) -> Result<Vec<ValueMapId>, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.entities.contains_key(&target_id) {
            return Err(StoreError::EntityNotFound(target_id));
        }
        inner.value_maps.retain(|_, map| map.target_id != target_id);
        let mut ids = Vec::with_capacity(maps.len());
        for input in maps {
            inner.next_value_map += 1;
            let id = ValueMapId(inner.next_value_map);
            inner.value_maps.insert(
                id,
                ValueMap {
                    id,
                    target_id,
                    name: input.name.clone(),
                    mappings: input.mappings.clone(),
                },
            );
            ids.push(id);
        }
        Ok(ids)
    }

    async fn delete_value_maps(&self, target_ids: &[EntityId]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .value_maps
            .retain(|_, map| !target_ids.contains(&map.target_id));
        Ok(())
    }
}

#[async_trait]
impl EntityDirectory for InMemoryStore {
    async fn entities_by_ids(&self, ids: &[EntityId]) -> Result<Vec<Entity>, StoreError> {
        let inner = self.inner.read().await;
        let entities = ids
            .iter()
            .filter_map(|id| inner.entities.get(id).cloned())
            .collect();
        Ok(entities)
    }
}

#[async_trait]
impl TriggerCatalog for InMemoryStore {
    async fn triggers_on(&self, template_id: EntityId) -> Result<Vec<TriggerId>, StoreError> {
        let inner = self.inner.read().await;
        let trigger_ids = inner
            .triggers
            .iter()
            .filter(|(_, &owner)| owner == template_id)
            .map(|(&trigger_id, _)| trigger_id)
            .collect();
        Ok(trigger_ids)
    }

    async fn dependency_templates_of(
        &self,
        trigger_ids: &[TriggerId],
    ) -> Result<Vec<EntityId>, StoreError> {
        let inner = self.inner.read().await;
        let mut upstream = BTreeSet::new();
        for (dependent, depends_on) in &inner.trigger_deps {
            if !trigger_ids.contains(dependent) {
                continue;
            }
            if let Some(&owner) = inner.triggers.get(depends_on) {
                if inner.is_template(owner) {
                    upstream.insert(owner);
                }
            }
        }
        Ok(upstream.into_iter().collect())
    }

    async fn trigger_item_spans(
        &self,
        template_ids: &[EntityId],
    ) -> Result<Vec<TriggerSpan>, StoreError> {
        let inner = self.inner.read().await;

        let mut by_trigger: BTreeMap<TriggerId, BTreeSet<EntityId>> = BTreeMap::new();
        for &(trigger_id, template_id) in &inner.trigger_items {
            if inner.is_template(template_id) {
                by_trigger.entry(trigger_id).or_default().insert(template_id);
            }
        }

        let spans = by_trigger
            .into_iter()
            .filter(|(_, span)| span.len() > 1 && span.iter().any(|id| template_ids.contains(id)))
            .map(|(trigger_id, span)| TriggerSpan {
                trigger_id,
                template_ids: span.into_iter().collect(),
            })
            .collect();
        Ok(spans)
    }
}

#[async_trait]
impl Authorizer for InMemoryStore {
    async fn readable_template_count(
        &self,
        template_ids: &[EntityId],
    ) -> Result<usize, StoreError> {
        let inner = self.inner.read().await;
        let readable = template_ids
            .iter()
            .filter(|id| {
                inner
                    .entities
                    .get(id)
                    .map(|entity| entity.kind == EntityKind::Template)
                    .unwrap_or(false)
            })
            .count();
        Ok(readable)
    }
}
