use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::context::RequestContext;
use crate::domain::entity::{EntityId, EntityStatus, LinkageEdge};
use crate::domain::graph::LinkageGraph;
use crate::domain::store::{EntityDirectory, LinkageStore, TriggerCatalog};
use crate::error::{DependencyViolation, DuplicateTemplates, LinkageError, LinkageResult};

/// Statuses whose entities participate in the graph checks.
const GRAPH_STATUSES: [EntityStatus; 3] = [
    EntityStatus::Monitored,
    EntityStatus::Unmonitored,
    EntityStatus::Template,
];

/// Validates proposed linkage changes against the graph invariants.
///
/// The input checks (accessibility, duplicate rejection) run before the
/// mutator reads any edges; the remaining checks run against the edge
/// snapshot plus the proposed additions, so a rejected request never writes.
pub struct LinkageValidator {
    linkage_store: Arc<dyn LinkageStore>,
    directory: Arc<dyn EntityDirectory>,
    triggers: Arc<dyn TriggerCatalog>,
}

impl LinkageValidator {
    /// Create a new validator
    pub fn new(
        linkage_store: Arc<dyn LinkageStore>,
        directory: Arc<dyn EntityDirectory>,
        triggers: Arc<dyn TriggerCatalog>,
    ) -> Self {
        Self {
            linkage_store,
            directory,
            triggers,
        }
    }

    /// Accessibility and duplicate-input checks on the caller's template list
    ///
    /// Returns the deduplicated list in first-occurrence order on success.
    pub async fn check_template_input(
        &self,
        ctx: &RequestContext,
        template_ids: &[EntityId],
    ) -> LinkageResult<Vec<EntityId>> {
        let unique = dedup_preserving_order(template_ids);

        let readable = ctx.authorizer.readable_template_count(&unique).await?;
        if readable != unique.len() {
            return Err(LinkageError::PermissionDenied);
        }

        let duplicates = find_duplicates(template_ids);
        if !duplicates.0.is_empty() {
            return Err(LinkageError::DuplicateInput(duplicates));
        }

        Ok(unique)
    }

    /// Full validation of a proposed edge set against the current snapshot
    ///
    /// `existing` must hold every edge whose target is in `target_ids`;
    /// `proposed` holds the net-new edges the mutator wants to insert.
    pub async fn validate(
        &self,
        template_ids: &[EntityId],
        target_ids: &[EntityId],
        existing: &[LinkageEdge],
        proposed: &[LinkageEdge],
    ) -> LinkageResult<()> {
        let common = common_templates(existing, target_ids);

        self.check_trigger_dependencies(template_ids, &common)
            .await?;
        self.check_trigger_item_coverage(template_ids, existing, proposed)
            .await?;
        self.check_graph(proposed).await
    }

    /// A linked template's triggers may only depend on triggers from
    /// templates linked to the same targets.
    async fn check_trigger_dependencies(
        &self,
        template_ids: &[EntityId],
        common: &BTreeSet<EntityId>,
    ) -> LinkageResult<()> {
        let mut linked = common.clone();
        linked.extend(template_ids.iter().copied());

        for &template_id in template_ids {
            let trigger_ids = self.triggers.triggers_on(template_id).await?;
            if trigger_ids.is_empty() {
                continue;
            }

            let upstream = self.triggers.dependency_templates_of(&trigger_ids).await?;
            if let Some(&offender) = upstream.iter().find(|id| !linked.contains(id)) {
                let names = self.names_for(&[template_id, offender]).await?;
                return Err(LinkageError::DependencyViolation(
                    DependencyViolation::CrossTemplateDependency {
                        template: display_name(&names, template_id),
                        depends_on: display_name(&names, offender),
                    },
                ));
            }
        }

        Ok(())
    }

    /// No trigger may reference items from a template left unlinked to the
    /// targets once the proposed edges are in place.
    async fn check_trigger_item_coverage(
        &self,
        template_ids: &[EntityId],
        existing: &[LinkageEdge],
        proposed: &[LinkageEdge],
    ) -> LinkageResult<()> {
        let spans = self.triggers.trigger_item_spans(template_ids).await?;
        if spans.is_empty() {
            return Ok(());
        }

        let linked: BTreeSet<EntityId> = existing
            .iter()
            .chain(proposed.iter())
            .map(|edge| edge.template_id)
            .collect();

        for span in &spans {
            if let Some(&offender) = span.template_ids.iter().find(|id| !linked.contains(id)) {
                let names = self.names_for(&[offender]).await?;
                return Err(LinkageError::DependencyViolation(
                    DependencyViolation::UnlinkedItems {
                        template: display_name(&names, offender),
                    },
                ));
            }
        }

        Ok(())
    }

    /// Cycle and double-linkage checks over stored and proposed edges.
    async fn check_graph(&self, proposed: &[LinkageEdge]) -> LinkageResult<()> {
        let stored = self
            .linkage_store
            .edges_by_child_status(&GRAPH_STATUSES)
            .await?;

        let graph = LinkageGraph::from_edges(stored.into_iter().chain(proposed.iter().copied()));
        graph.check()
    }

    async fn names_for(
        &self,
        ids: &[EntityId],
    ) -> Result<BTreeMap<EntityId, String>, LinkageError> {
        let entities = self.directory.entities_by_ids(ids).await?;
        Ok(entities
            .into_iter()
            .map(|entity| (entity.id, entity.name))
            .collect())
    }
}

/// Display name for an id, falling back to the bare id when unknown.
fn display_name(names: &BTreeMap<EntityId, String>, id: EntityId) -> String {
    names.get(&id).cloned().unwrap_or_else(|| id.to_string())
}

/// Deduplicate ids, keeping first-occurrence order.
pub(crate) fn dedup_preserving_order(ids: &[EntityId]) -> Vec<EntityId> {
    let mut seen = BTreeSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Ids appearing more than once, with their repeat counts, in
/// first-occurrence order.
fn find_duplicates(ids: &[EntityId]) -> DuplicateTemplates {
    let mut counts: Vec<(EntityId, usize)> = Vec::new();
    for &id in ids {
        match counts.iter_mut().find(|(seen, _)| *seen == id) {
            Some((_, count)) => *count += 1,
            None => counts.push((id, 1)),
        }
    }
    counts.retain(|(_, count)| *count > 1);
    DuplicateTemplates(counts)
}

/// Templates already linked to every one of the given targets.
fn common_templates(existing: &[LinkageEdge], target_ids: &[EntityId]) -> BTreeSet<EntityId> {
    let target_count = target_ids.iter().collect::<BTreeSet<_>>().len();

    let mut coverage: BTreeMap<EntityId, BTreeSet<EntityId>> = BTreeMap::new();
    for edge in existing {
        coverage
            .entry(edge.template_id)
            .or_default()
            .insert(edge.target_id);
    }

    coverage
        .into_iter()
        .filter(|(_, covered)| covered.len() == target_count)
        .map(|(template_id, _)| template_id)
        .collect()
}
