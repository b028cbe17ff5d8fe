use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use orrery_common::EntityId;
use orrery_ecs::World;
use serde_json::Value;

use crate::definition::PrefabDefinition;
use crate::error::PrefabError;

/// Factory contract: given the world and optional creation parameters,
/// spawn an entity with all of its components and return its id.
pub type PrefabFactory =
    Box<dyn Fn(&mut World, Option<&Value>) -> Result<EntityId, PrefabError> + Send + Sync>;

struct PrefabDescriptor {
    factory: PrefabFactory,
    definition: Option<PrefabDefinition>,
}

/// Registry of prefab factories keyed by id.
///
/// # Invariants
/// - Prefab ids are unique; descriptors are never replaced.
/// - `instantiate` either returns a live, fully populated entity or leaves
///   the world's entity set exactly as it found it.
#[derive(Default)]
pub struct PrefabRegistry {
    prefabs: BTreeMap<String, PrefabDescriptor>,
}

impl std::fmt::Debug for PrefabRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefabRegistry")
            .field("prefabs", &self.prefabs.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PrefabRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `id`.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F) -> Result<(), PrefabError>
    where
        F: Fn(&mut World, Option<&Value>) -> Result<EntityId, PrefabError> + Send + Sync + 'static,
    {
        let id = id.into();
        self.insert(id, Box::new(factory), None)
    }

    /// Register a declarative prefab. Its components are decoded once here so
    /// a malformed definition fails at registration, not at spawn time.
    pub fn register_definition(&mut self, definition: PrefabDefinition) -> Result<(), PrefabError> {
        definition.validate()?;
        let id = definition.id.clone();
        let template = definition.clone();
        let factory: PrefabFactory = Box::new(move |world: &mut World, params: Option<&Value>| {
            template.spawn(world, params)
        });
        self.insert(id, factory, Some(definition))
    }

    fn insert(
        &mut self,
        id: String,
        factory: PrefabFactory,
        definition: Option<PrefabDefinition>,
    ) -> Result<(), PrefabError> {
        if self.prefabs.contains_key(&id) {
            return Err(PrefabError::DuplicatePrefabId(id));
        }
        tracing::debug!(prefab = %id, declarative = definition.is_some(), "prefab registered");
        self.prefabs.insert(id, PrefabDescriptor { factory, definition });
        Ok(())
    }

    /// Run the factory registered under `id` and return the new entity.
    ///
    /// If the factory fails, every entity it spawned during this call is
    /// destroyed before the error is returned, and the world's event logs
    /// keep no record of those entities.
    pub fn instantiate(
        &self,
        world: &mut World,
        id: &str,
        params: Option<&Value>,
    ) -> Result<EntityId, PrefabError> {
        let descriptor = self
            .prefabs
            .get(id)
            .ok_or_else(|| PrefabError::UnknownPrefabId(id.to_string()))?;

        let before = world.entities().list();
        let mark = world.event_mark();
        let result = (descriptor.factory)(world, params).and_then(|entity| {
            if world.contains(entity) {
                Ok(entity)
            } else {
                Err(PrefabError::DeadEntity {
                    prefab: id.to_string(),
                    entity,
                })
            }
        });

        match result {
            Ok(entity) => {
                tracing::debug!(prefab = id, %entity, "prefab instantiated");
                Ok(entity)
            }
            Err(err) => {
                let removed = rollback(world, &before);
                world.rewind_events(mark, &removed);
                tracing::warn!(prefab = id, removed = removed.len(), error = %err, "prefab instantiation failed");
                Err(err)
            }
        }
    }

    /// True if a prefab is registered under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.prefabs.contains_key(id)
    }

    /// The declarative source of a prefab, if it was registered from data.
    pub fn definition(&self, id: &str) -> Option<&PrefabDefinition> {
        self.prefabs.get(id).and_then(|d| d.definition.as_ref())
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.prefabs.keys().map(String::as_str)
    }

    /// Number of registered prefabs.
    pub fn len(&self) -> usize {
        self.prefabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefabs.is_empty()
    }

    /// Register every definition in a JSON array.
    ///
    /// Stops at the first invalid or duplicate entry. Returns the number
    /// registered.
    pub fn load_json_str(&mut self, json: &str) -> Result<usize, PrefabError> {
        let definitions: Vec<PrefabDefinition> = serde_json::from_str(json)?;
        let count = definitions.len();
        for definition in definitions {
            self.register_definition(definition)?;
        }
        Ok(count)
    }

    /// Read a JSON array of definitions from disk and register them.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize, PrefabError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        self.load_json_str(&data)
    }
}

/// Destroy every entity that is live now but was not in `before`.
fn rollback(world: &mut World, before: &HashSet<EntityId>) -> Vec<EntityId> {
    let spawned: Vec<EntityId> = world
        .entities()
        .sorted()
        .into_iter()
        .filter(|id| !before.contains(id))
        .collect();
    for id in &spawned {
        world.destroy(*id);
    }
    spawned
}
