use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a monitorable entity (host, template, or host prototype)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a trigger defined on a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TriggerId(pub u64);

/// Storage row identifier of a persisted tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagRowId(pub u64);

/// Storage identifier of a value map
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValueMapId(pub u64);

/// Kind of a monitorable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// A monitored host
    Host,

    /// A configuration template
    Template,

    /// A host prototype produced by low-level discovery
    HostPrototype,
}

/// Lifecycle status of an entity
///
/// Only edges whose child carries one of these statuses participate in the
/// linkage graph checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityStatus {
    /// Host is actively monitored
    Monitored,

    /// Host exists but monitoring is paused
    Unmonitored,

    /// Entity is a template
    Template,
}

/// A monitorable entity with its display metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier
    pub id: EntityId,

    /// Human-readable technical name
    pub name: String,

    /// Entity kind
    pub kind: EntityKind,

    /// Lifecycle status
    pub status: EntityStatus,
}

impl Entity {
    /// Create a new entity
    pub fn new(id: EntityId, name: impl Into<String>, kind: EntityKind, status: EntityStatus) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            status,
        }
    }

    /// Create a template entity
    pub fn template(id: EntityId, name: impl Into<String>) -> Self {
        Self::new(id, name, EntityKind::Template, EntityStatus::Template)
    }

    /// Create a monitored host entity
    pub fn host(id: EntityId, name: impl Into<String>) -> Self {
        Self::new(id, name, EntityKind::Host, EntityStatus::Monitored)
    }
}

/// A directed linkage edge: the target inherits configuration from the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkageEdge {
    /// The inheriting entity (host or template)
    pub target_id: EntityId,

    /// The template being inherited from
    pub template_id: EntityId,
}

impl LinkageEdge {
    /// Create a new edge
    pub fn new(target_id: EntityId, template_id: EntityId) -> Self {
        Self {
            target_id,
            template_id,
        }
    }
}

/// A desired tag supplied by a caller
///
/// Identity is the `(tag, value)` pair; an omitted value deserializes to the
/// empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name
    pub tag: String,

    /// Tag value
    #[serde(default)]
    pub value: String,
}

impl Tag {
    /// Create a new tag
    pub fn new(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: value.into(),
        }
    }
}

/// A persisted tag row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRow {
    /// Storage row identifier
    pub id: TagRowId,

    /// Owning entity
    pub target_id: EntityId,

    /// Tag name
    pub tag: String,

    /// Tag value
    pub value: String,
}

/// A tag queued for insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTag {
    /// Owning entity
    pub target_id: EntityId,

    /// Tag name
    pub tag: String,

    /// Tag value
    pub value: String,
}

/// One raw-value to display-value substitution inside a value map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    /// Raw value matched against monitored data
    pub key: String,

    /// Display value shown in its place
    pub display: String,
}

impl Mapping {
    /// Create a new mapping
    pub fn new(key: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display: display.into(),
        }
    }
}

/// Caller-supplied value map content, before ids are assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMapInput {
    /// Map name, unique per target
    pub name: String,

    /// Substitutions in presentation order
    pub mappings: Vec<Mapping>,
}

impl ValueMapInput {
    /// Create a new value map input
    pub fn new(name: impl Into<String>, mappings: Vec<Mapping>) -> Self {
        Self {
            name: name.into(),
            mappings,
        }
    }
}

/// A persisted value map with its mappings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMap {
    /// Storage identifier; changes on every replace
    pub id: ValueMapId,

    /// Owning entity
    pub target_id: EntityId,

    /// Map name, unique per target
    pub name: String,

    /// Substitutions in insertion order
    pub mappings: Vec<Mapping>,
}

/// Templates whose items one trigger references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSpan {
    /// The trigger
    pub trigger_id: TriggerId,

    /// Every template providing an item the trigger's expression uses
    pub template_ids: Vec<EntityId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_constructors() {
        let template = Entity::template(EntityId(1), "Template OS Linux");
        assert_eq!(template.kind, EntityKind::Template);
        assert_eq!(template.status, EntityStatus::Template);

        let host = Entity::host(EntityId(2), "web-01");
        assert_eq!(host.kind, EntityKind::Host);
        assert_eq!(host.status, EntityStatus::Monitored);
    }

    #[test]
    fn test_tag_value_defaults_to_empty() {
        let tag: Tag = serde_json::from_str(r#"{"tag": "env"}"#).unwrap();
        assert_eq!(tag.tag, "env");
        assert_eq!(tag.value, "");
    }

    #[test]
    fn test_entity_id_display() {
        assert_eq!(EntityId(10101).to_string(), "10101");
    }
}
