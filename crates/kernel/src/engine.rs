use orrery_assets::{AssetRegistry, MaterialDefinition};
use orrery_common::EntityId;
use orrery_ecs::{tags, Component, ComponentEvent, World, WorldEvent};
use orrery_prefab::PrefabRegistry;
use orrery_script::{
    BindSummary, Script, ScriptError, ScriptEvent, ScriptLibrary, ScriptRuntime, TickReport,
};
use serde_json::Value;

use crate::clock::{clamp_delta, FrameClock};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::store::EngineStore;

/// World and component events drained from the world at the end of a tick.
///
/// Covers everything recorded since the previous tick, host mutations
/// between ticks included.
#[derive(Debug, Clone, Default)]
pub struct FrameEvents {
    pub world: Vec<WorldEvent>,
    pub components: Vec<ComponentEvent>,
}

impl FrameEvents {
    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.world.is_empty() && self.components.is_empty()
    }
}

/// One engine instance: the world, its registries, the script runtime and
/// the runtime store, driven by a single frame loop.
///
/// All mutations go through explicit operations. Hosts serialize calls per
/// instance.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    world: World,
    assets: AssetRegistry,
    prefabs: PrefabRegistry,
    scripts: ScriptRuntime,
    library: ScriptLibrary,
    store: EngineStore,
    clock: FrameClock,
    last_events: FrameEvents,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Build an engine with the built-in script kinds and an initialized store.
    pub fn new(config: EngineConfig) -> Self {
        let mut store = EngineStore::new();
        store.init(&config.debug);
        tracing::info!(
            recycling = config.entity_recycling,
            max_delta = config.max_delta_seconds,
            "engine created"
        );
        Self {
            world: World::with_recycling(config.entity_recycling),
            assets: AssetRegistry::new(),
            prefabs: PrefabRegistry::new(),
            scripts: ScriptRuntime::new(),
            library: ScriptLibrary::with_builtins(),
            store,
            clock: FrameClock::new(config.max_delta_seconds),
            last_events: FrameEvents::default(),
            config,
        }
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read-only access to entities and components.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access for host-side setup.
    ///
    /// Destroying entities through this bypasses script bookkeeping; use
    /// [`Engine::destroy_entity`] when scripts may be bound.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Registered materials and textures.
    pub fn assets(&self) -> &AssetRegistry {
        &self.assets
    }

    /// Mutable asset registry, for defining or loading assets.
    pub fn assets_mut(&mut self) -> &mut AssetRegistry {
        &mut self.assets
    }

    /// Registered prefabs.
    pub fn prefabs(&self) -> &PrefabRegistry {
        &self.prefabs
    }

    /// Mutable prefab registry, for registering factories and definitions.
    pub fn prefabs_mut(&mut self) -> &mut PrefabRegistry {
        &mut self.prefabs
    }

    /// Script bindings and their states.
    pub fn scripts(&self) -> &ScriptRuntime {
        &self.scripts
    }

    /// Script kinds available to `script` components.
    pub fn library(&self) -> &ScriptLibrary {
        &self.library
    }

    /// Mutable script library, for registering custom kinds.
    pub fn library_mut(&mut self) -> &mut ScriptLibrary {
        &mut self.library
    }

    /// Debug toggles and flags.
    pub fn store(&self) -> &EngineStore {
        &self.store
    }

    /// Mutable store; writes fail after [`Engine::shutdown`].
    pub fn store_mut(&mut self) -> &mut EngineStore {
        &mut self.store
    }

    /// Frame timing and FPS.
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Events drained from the world by the most recent tick.
    pub fn last_events(&self) -> &FrameEvents {
        &self.last_events
    }

    /// Ticks run so far.
    pub fn frame(&self) -> u64 {
        self.scripts.time().frame
    }

    /// Instantiate a prefab and bind the scripts declared by the entities
    /// it spawned. Other entities' bindings are left alone.
    pub fn spawn_prefab(&mut self, id: &str, params: Option<&Value>) -> Result<EntityId, EngineError> {
        let mark = self.world.event_mark();
        let entity = self.prefabs.instantiate(&mut self.world, id, params)?;
        let spawned: Vec<EntityId> = self
            .world
            .events_since(mark)
            .iter()
            .filter_map(|event| match event {
                WorldEvent::Spawned { id: new } if self.world.contains(*new) => Some(*new),
                _ => None,
            })
            .collect();
        let summary = self.scripts.bind_entities(&mut self.world, &self.library, &spawned);
        tracing::debug!(
            prefab = id,
            %entity,
            spawned = spawned.len(),
            scripts = summary.bound.len(),
            "prefab spawned"
        );
        Ok(entity)
    }

    /// Bind a script to a live entity; it starts on the next tick.
    pub fn bind_script(&mut self, entity: EntityId, script: Box<dyn Script>) -> Result<(), EngineError> {
        self.scripts.bind(&mut self.world, entity, script)?;
        Ok(())
    }

    /// Stop an entity's script, running its `on_destroy`. Its `script`
    /// component will not rebind it.
    pub fn unbind_script(&mut self, entity: EntityId) -> Result<bool, EngineError> {
        Ok(self.scripts.unbind(&mut self.world, entity)?)
    }

    /// Enable or disable an entity's script.
    pub fn set_script_enabled(&mut self, entity: EntityId, enabled: bool) -> Result<(), EngineError> {
        self.scripts.set_enabled(&mut self.world, entity, enabled)?;
        Ok(())
    }

    /// Bind every entity whose `script` component has no live binding yet,
    /// skipping entities whose script was unbound or failed.
    pub fn bind_scripts(&mut self) -> BindSummary {
        self.scripts.bind_from_components(&mut self.world, &self.library)
    }

    /// Destroy an entity together with every entity parented under it.
    ///
    /// Returns the destroyed ids, root first. Script bindings on them stop
    /// at once, without callbacks, so a recycled id starts clean.
    pub fn destroy_entity(&mut self, id: EntityId) -> Vec<EntityId> {
        if !self.world.contains(id) {
            return Vec::new();
        }
        let mut order = vec![id];
        let mut cursor = 0;
        while cursor < order.len() {
            let parent = order[cursor];
            let children: Vec<EntityId> = self
                .world
                .components()
                .entities_with(tags::PARENT)
                .filter(|child| {
                    !order.contains(child)
                        && self.world.get_component(*child, tags::PARENT)
                            == Some(&Component::Parent(parent))
                })
                .collect();
            order.extend(children);
            cursor += 1;
        }
        for entity in &order {
            self.world.destroy(*entity);
            self.scripts.entity_destroyed(*entity);
        }
        tracing::debug!(root = %id, count = order.len(), "entity tree destroyed");
        order
    }

    /// Resolve the material an entity points at, via its `material` or
    /// `mesh_renderer` component.
    pub fn material_of(&self, entity: EntityId) -> Result<&MaterialDefinition, EngineError> {
        if !self.world.contains(entity) {
            return Err(orrery_ecs::EcsError::UnknownEntity(entity).into());
        }
        let id = [tags::MATERIAL, tags::MESH_RENDERER]
            .into_iter()
            .find_map(|tag| self.world.get_component(entity, tag).and_then(Component::material_id))
            .ok_or(EngineError::NoMaterial(entity))?;
        Ok(self.assets.material(id)?)
    }

    /// Queue an event for scripts. It is delivered on the next tick.
    pub fn emit_event(&mut self, event: ScriptEvent) {
        self.scripts.emit(event);
    }

    /// Advance using the host's elapsed time in seconds.
    pub fn tick(&mut self, elapsed: f64) -> TickReport {
        let dt = self.clock.advance(elapsed);
        self.step(dt)
    }

    /// Advance by an explicit delta in seconds.
    pub fn step(&mut self, dt: f64) -> TickReport {
        let dt = clamp_delta(dt, self.config.max_delta_seconds);
        let frame = self.frame() + 1;
        let _span = tracing::info_span!("engine_tick", frame).entered();

        let report = self.scripts.tick(&mut self.world, dt);
        self.last_events = FrameEvents {
            world: self.world.drain_events(),
            components: self.world.drain_component_events(),
        };
        tracing::trace!(
            started = report.started.len(),
            updated = report.updated.len(),
            stopped = report.stopped.len(),
            delivered = report.delivered,
            errors = report.errors.len(),
            world_events = self.last_events.world.len(),
            component_events = self.last_events.components.len(),
            "tick complete"
        );
        report
    }

    /// Stop every script and reset the store. The world is left intact.
    pub fn shutdown(&mut self) -> Vec<ScriptError> {
        let errors = self.scripts.shutdown(&mut self.world);
        self.store.shutdown();
        tracing::info!(errors = errors.len(), "engine shut down");
        errors
    }
}
