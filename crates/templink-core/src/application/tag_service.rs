use std::collections::BTreeMap;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::domain::entity::{EntityId, NewTag, Tag, TagRow, TagRowId};
use crate::domain::store::TagStore;
use crate::error::{LinkageError, LinkageResult};

/// Maximum tag name length, in characters
pub const TAG_NAME_MAX: usize = 255;

/// Maximum tag value length, in characters
pub const TAG_VALUE_MAX: usize = 255;

/// Service reconciling stored tags against caller-supplied desired state
pub struct TagReconciler {
    tag_store: Arc<dyn TagStore>,
}

impl TagReconciler {
    /// Create a new tag reconciler
    pub fn new(tag_store: Arc<dyn TagStore>) -> Self {
        Self { tag_store }
    }

    /// Make each listed target's stored tags equal its desired list.
    ///
    /// Stored rows whose `(tag, value)` pair appears in the desired list are
    /// retained with their row ids; missing pairs are inserted and leftover
    /// rows deleted, in one store call. Targets absent from `desired` are
    /// untouched.
    pub async fn reconcile(
        &self,
        _ctx: &RequestContext,
        desired: &BTreeMap<EntityId, Vec<Tag>>,
    ) -> LinkageResult<()> {
        if desired.is_empty() {
            return Ok(());
        }

        validate_tags(desired)?;

        let target_ids: Vec<EntityId> = desired.keys().copied().collect();
        let current = self.tag_store.tags_for_targets(&target_ids).await?;

        let changes = compute_tag_changes(desired, &current);
        if changes.is_empty() {
            return Ok(());
        }

        self.tag_store
            .apply_tag_changes(&changes.delete, &changes.insert)
            .await?;

        tracing::info!(
            targets = desired.len(),
            deleted = changes.delete.len(),
            inserted = changes.insert.len(),
            "Reconciled tags"
        );

        Ok(())
    }

    /// Insert the given tags for freshly created targets.
    pub async fn create_tags(
        &self,
        _ctx: &RequestContext,
        tags_by_target: &BTreeMap<EntityId, Vec<Tag>>,
    ) -> LinkageResult<()> {
        if tags_by_target.is_empty() {
            return Ok(());
        }

        validate_tags(tags_by_target)?;

        let insert: Vec<NewTag> = tags_by_target
            .iter()
            .flat_map(|(&target_id, tags)| {
                tags.iter().map(move |tag| NewTag {
                    target_id,
                    tag: tag.tag.clone(),
                    value: tag.value.clone(),
                })
            })
            .collect();
        if insert.is_empty() {
            return Ok(());
        }

        self.tag_store.apply_tag_changes(&[], &insert).await?;

        tracing::info!(inserted = insert.len(), "Created tags");

        Ok(())
    }
}

/// Row deletions and insertions that turn the stored state into the desired
/// one.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct TagChanges {
    pub delete: Vec<TagRowId>,
    pub insert: Vec<NewTag>,
}

impl TagChanges {
    fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.insert.is_empty()
    }
}

/// Diff desired tags against stored rows, matching on the `(tag, value)`
/// pair.
pub(crate) fn compute_tag_changes(
    desired: &BTreeMap<EntityId, Vec<Tag>>,
    current: &[TagRow],
) -> TagChanges {
    let mut remaining: BTreeMap<EntityId, Vec<&TagRow>> = BTreeMap::new();
    for row in current {
        remaining.entry(row.target_id).or_default().push(row);
    }

    let mut insert = Vec::new();
    for (&target_id, tags) in desired {
        let rows = remaining.entry(target_id).or_default();
        for tag in tags {
            match rows
                .iter()
                .position(|row| row.tag == tag.tag && row.value == tag.value)
            {
                Some(index) => {
                    rows.remove(index);
                }
                None => insert.push(NewTag {
                    target_id,
                    tag: tag.tag.clone(),
                    value: tag.value.clone(),
                }),
            }
        }
    }

    let delete = remaining
        .into_values()
        .flatten()
        .map(|row| row.id)
        .collect();

    TagChanges { delete, insert }
}

/// Reject empty names, over-length fields, and repeated `(tag, value)` pairs.
pub(crate) fn validate_tags(desired: &BTreeMap<EntityId, Vec<Tag>>) -> LinkageResult<()> {
    for (&target_id, tags) in desired {
        let mut seen: Vec<(&str, &str)> = Vec::new();
        for tag in tags {
            if tag.tag.is_empty() {
                return Err(LinkageError::ValidationFailed(format!(
                    "tag name cannot be empty for target \"{target_id}\""
                )));
            }
            if tag.tag.chars().count() > TAG_NAME_MAX {
                return Err(LinkageError::ValidationFailed(format!(
                    "tag name exceeds {TAG_NAME_MAX} characters"
                )));
            }
            if tag.value.chars().count() > TAG_VALUE_MAX {
                return Err(LinkageError::ValidationFailed(format!(
                    "value of tag \"{}\" exceeds {TAG_VALUE_MAX} characters",
                    tag.tag
                )));
            }
            if seen.contains(&(tag.tag.as_str(), tag.value.as_str())) {
                return Err(LinkageError::ValidationFailed(format!(
                    "tag \"{}\" with value \"{}\" is specified multiple times for target \"{target_id}\"",
                    tag.tag, tag.value
                )));
            }
            seen.push((tag.tag.as_str(), tag.value.as_str()));
        }
    }

    Ok(())
}
