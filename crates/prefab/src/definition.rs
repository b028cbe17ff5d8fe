use std::collections::BTreeMap;

use orrery_common::EntityId;
use orrery_ecs::{tags, Component, World};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PrefabError;

/// A prefab authored as data rather than code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabDefinition {
    pub id: String,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub root: PrefabEntity,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_version() -> u32 {
    1
}

/// One entity in a prefab tree. Components are keyed by tag and decoded on
/// spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabEntity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub components: BTreeMap<String, Value>,
    #[serde(default)]
    pub children: Vec<PrefabEntity>,
}

impl PrefabDefinition {
    /// Check that every component in the tree decodes.
    pub fn validate(&self) -> Result<(), PrefabError> {
        if self.id.is_empty() {
            return Err(PrefabError::InvalidDefinition {
                id: String::new(),
                reason: "id must not be empty".into(),
            });
        }
        validate_entity(&self.id, &self.root)
    }

    /// Spawn the prefab tree into `world`, returning the root.
    ///
    /// `overrides` is deep-merged into the root's components first.
    pub fn spawn(&self, world: &mut World, overrides: Option<&Value>) -> Result<EntityId, PrefabError> {
        match overrides {
            Some(patch) => {
                let mut root = self.root.clone();
                apply_override_patch(&mut root, patch);
                spawn_entity(world, &root, None)
            }
            None => spawn_entity(world, &self.root, None),
        }
    }
}

fn validate_entity(prefab: &str, entity: &PrefabEntity) -> Result<(), PrefabError> {
    for (tag, value) in &entity.components {
        Component::decode(tag, value).map_err(|e| PrefabError::InvalidDefinition {
            id: prefab.to_string(),
            reason: e.to_string(),
        })?;
    }
    entity
        .children
        .iter()
        .try_for_each(|child| validate_entity(prefab, child))
}

fn spawn_entity(
    world: &mut World,
    entity: &PrefabEntity,
    parent: Option<EntityId>,
) -> Result<EntityId, PrefabError> {
    let id = world.spawn();
    if !entity.name.is_empty() && !entity.components.contains_key(tags::NAME) {
        world.set_component(id, tags::NAME, Component::Name(entity.name.clone()))?;
    }
    for (tag, value) in &entity.components {
        world.set_component(id, tag.as_str(), Component::decode(tag, value)?)?;
    }
    if let Some(parent) = parent {
        world.set_component(id, tags::PARENT, Component::Parent(parent))?;
    }
    for child in &entity.children {
        spawn_entity(world, child, Some(id))?;
    }
    Ok(id)
}

/// Merge an override patch into a prefab entity's components.
///
/// Each top-level key names a component tag. Objects merge key by key,
/// anything else replaces the authored value. `children` is ignored.
pub fn apply_override_patch(entity: &mut PrefabEntity, patch: &Value) {
    let Some(patch) = patch.as_object() else {
        return;
    };
    for (tag, value) in patch {
        if tag == "children" {
            continue;
        }
        match entity.components.get_mut(tag) {
            Some(existing) => merge_json(existing, value),
            None => {
                entity.components.insert(tag.clone(), value.clone());
            }
        }
    }
}

fn merge_json(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}
