use std::collections::BTreeSet;
use std::sync::Arc;

use crate::application::validator::{dedup_preserving_order, LinkageValidator};
use crate::context::RequestContext;
use crate::domain::entity::{EntityId, LinkageEdge};
use crate::domain::store::{EntityDirectory, LinkageStore, TriggerCatalog};
use crate::error::LinkageResult;

/// Service for linking templates to hosts and templates
pub struct LinkageService {
    linkage_store: Arc<dyn LinkageStore>,
    directory: Arc<dyn EntityDirectory>,
    validator: LinkageValidator,
}

impl LinkageService {
    /// Create a new linkage service
    pub fn new(
        linkage_store: Arc<dyn LinkageStore>,
        directory: Arc<dyn EntityDirectory>,
        triggers: Arc<dyn TriggerCatalog>,
    ) -> Self {
        let validator = LinkageValidator::new(
            Arc::clone(&linkage_store),
            Arc::clone(&directory),
            triggers,
        );

        Self {
            linkage_store,
            directory,
            validator,
        }
    }

    /// Link every template to every target, inserting the edges that do not
    /// already exist.
    ///
    /// The whole batch is validated against the current edge snapshot before
    /// anything is written; on any rejection the store is left untouched.
    /// Returns the edges that were actually inserted.
    pub async fn link(
        &self,
        ctx: &RequestContext,
        template_ids: &[EntityId],
        target_ids: &[EntityId],
    ) -> LinkageResult<Vec<LinkageEdge>> {
        if template_ids.is_empty() {
            return Ok(Vec::new());
        }

        let template_ids = self
            .validator
            .check_template_input(ctx, template_ids)
            .await?;

        let target_ids = dedup_preserving_order(target_ids);
        if target_ids.is_empty() {
            return Ok(Vec::new());
        }

        let existing = self
            .linkage_store
            .edges_matching(None, Some(&target_ids))
            .await?;

        let linked: BTreeSet<(EntityId, EntityId)> = existing
            .iter()
            .map(|edge| (edge.target_id, edge.template_id))
            .collect();

        let mut proposed = Vec::new();
        for &target_id in &target_ids {
            for &template_id in &template_ids {
                if !linked.contains(&(target_id, template_id)) {
                    proposed.push(LinkageEdge::new(target_id, template_id));
                }
            }
        }

        self.validator
            .validate(&template_ids, &target_ids, &existing, &proposed)
            .await?;

        if !proposed.is_empty() {
            self.linkage_store.insert_edges(&proposed).await?;
        }

        tracing::info!(
            templates = template_ids.len(),
            targets = target_ids.len(),
            inserted = proposed.len(),
            "Linked templates to targets"
        );

        Ok(proposed)
    }

    /// Unlink the templates from the given targets, or from every target
    /// when `target_ids` is `None`.
    ///
    /// Emits an audit message naming the affected templates and targets;
    /// when no edge matched, nothing is deleted and nothing is reported.
    pub async fn unlink(
        &self,
        ctx: &RequestContext,
        template_ids: &[EntityId],
        target_ids: Option<&[EntityId]>,
    ) -> LinkageResult<()> {
        if template_ids.is_empty() {
            return Ok(());
        }

        let template_ids = dedup_preserving_order(template_ids);

        let affected = self
            .linkage_store
            .edges_matching(Some(&template_ids), target_ids)
            .await?;
        if affected.is_empty() {
            return Ok(());
        }

        let deleted = self
            .linkage_store
            .delete_edges(&template_ids, target_ids)
            .await?;

        self.audit_unlink(ctx, &affected).await?;

        tracing::info!(deleted, "Unlinked templates from targets");

        Ok(())
    }

    /// Report an unlink through the caller's audit sink.
    async fn audit_unlink(
        &self,
        ctx: &RequestContext,
        affected: &[LinkageEdge],
    ) -> LinkageResult<()> {
        let template_ids: Vec<EntityId> = affected
            .iter()
            .map(|edge| edge.template_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let target_ids: Vec<EntityId> = affected
            .iter()
            .map(|edge| edge.target_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let template_names: Vec<String> = self
            .directory
            .entities_by_ids(&template_ids)
            .await?
            .into_iter()
            .map(|entity| entity.name)
            .collect();
        let target_names: Vec<String> = self
            .directory
            .entities_by_ids(&target_ids)
            .await?
            .into_iter()
            .map(|entity| entity.name)
            .collect();

        if !template_names.is_empty() && !target_names.is_empty() {
            ctx.audit.info(&format!(
                "Templates \"{}\" unlinked from hosts \"{}\".",
                template_names.join(", "),
                target_names.join(", ")
            ));
        }

        Ok(())
    }
}
