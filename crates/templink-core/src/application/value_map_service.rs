use std::sync::Arc;

use crate::context::RequestContext;
use crate::domain::entity::{EntityId, ValueMap, ValueMapId, ValueMapInput};
use crate::domain::store::ValueMapStore;
use crate::error::{LinkageError, LinkageResult};

/// Maximum value map name length, in characters
pub const VALUE_MAP_NAME_MAX: usize = 64;

/// Maximum mapping key length, in characters
pub const MAPPING_KEY_MAX: usize = 64;

/// Maximum mapped display value length, in characters
pub const MAPPING_DISPLAY_MAX: usize = 64;

/// Service managing the value maps attached to hosts and templates
pub struct ValueMapService {
    value_map_store: Arc<dyn ValueMapStore>,
}

impl ValueMapService {
    /// Create a new value map service
    pub fn new(value_map_store: Arc<dyn ValueMapStore>) -> Self {
        Self { value_map_store }
    }

    /// Replace the target's value maps wholesale with the given set.
    ///
    /// Every stored map is dropped and the new set inserted under fresh ids,
    /// even for maps identical to a stored one; an empty set leaves the
    /// target with no value maps. Returns the assigned ids in input order.
    pub async fn replace(
        &self,
        _ctx: &RequestContext,
        target_id: EntityId,
        maps: &[ValueMapInput],
    ) -> LinkageResult<Vec<ValueMapId>> {
        validate_value_maps(maps)?;

        let ids = self
            .value_map_store
            .replace_value_maps(target_id, maps)
            .await?;

        tracing::info!(
            target = %target_id,
            maps = maps.len(),
            "Replaced value maps"
        );

        Ok(ids)
    }

    /// Value maps stored for the given targets.
    pub async fn value_maps(
        &self,
        _ctx: &RequestContext,
        target_ids: &[EntityId],
    ) -> LinkageResult<Vec<ValueMap>> {
        if target_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self.value_map_store.value_maps_for(target_ids).await?)
    }

    /// Delete every value map owned by the given targets.
    pub async fn delete_value_maps(
        &self,
        _ctx: &RequestContext,
        target_ids: &[EntityId],
    ) -> LinkageResult<()> {
        if target_ids.is_empty() {
            return Ok(());
        }

        self.value_map_store.delete_value_maps(target_ids).await?;

        tracing::info!(targets = target_ids.len(), "Deleted value maps");

        Ok(())
    }
}

/// Reject duplicate names, empty or over-length fields, and maps without
/// mappings.
pub fn validate_value_maps(maps: &[ValueMapInput]) -> LinkageResult<()> {
    let mut names: Vec<&str> = Vec::new();
    for map in maps {
        if map.name.is_empty() {
            return Err(LinkageError::ValidationFailed(
                "value map name cannot be empty".to_string(),
            ));
        }
        if map.name.chars().count() > VALUE_MAP_NAME_MAX {
            return Err(LinkageError::ValidationFailed(format!(
                "value map name exceeds {VALUE_MAP_NAME_MAX} characters"
            )));
        }
        if names.contains(&map.name.as_str()) {
            return Err(LinkageError::ValidationFailed(format!(
                "value map \"{}\" already exists",
                map.name
            )));
        }
        names.push(map.name.as_str());

        if map.mappings.is_empty() {
            return Err(LinkageError::ValidationFailed(format!(
                "mappings cannot be empty for value map \"{}\"",
                map.name
            )));
        }

        let mut keys: Vec<&str> = Vec::new();
        for mapping in &map.mappings {
            if mapping.key.is_empty() {
                return Err(LinkageError::ValidationFailed(format!(
                    "mapping key cannot be empty in value map \"{}\"",
                    map.name
                )));
            }
            if mapping.key.chars().count() > MAPPING_KEY_MAX {
                return Err(LinkageError::ValidationFailed(format!(
                    "mapping key exceeds {MAPPING_KEY_MAX} characters in value map \"{}\"",
                    map.name
                )));
            }
            if mapping.display.is_empty() {
                return Err(LinkageError::ValidationFailed(format!(
                    "mapped value cannot be empty in value map \"{}\"",
                    map.name
                )));
            }
            if mapping.display.chars().count() > MAPPING_DISPLAY_MAX {
                return Err(LinkageError::ValidationFailed(format!(
                    "mapped value exceeds {MAPPING_DISPLAY_MAX} characters in value map \"{}\"",
                    map.name
                )));
            }
            if keys.contains(&mapping.key.as_str()) {
                return Err(LinkageError::ValidationFailed(format!(
                    "duplicate mapping key \"{}\" in value map \"{}\"",
                    mapping.key, map.name
                )));
            }
            keys.push(mapping.key.as_str());
        }
    }

    Ok(())
}
