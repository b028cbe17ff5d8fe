use glam::Vec3;
use orrery_common::EntityId;
use orrery_ecs::{tags, Component, World};
use orrery_kernel::{Engine, EngineError, EngineStore};
use orrery_script::BindingState;

/// Engine inspector for developer tooling.
///
/// Thin read-only queries over the engine's world, registries and store,
/// shaped for display.
pub struct Inspector;

impl Inspector {
    /// Produce a summary of the engine state.
    pub fn summary(engine: &Engine) -> EngineSummary {
        let store = engine.store();
        EngineSummary {
            frame: engine.frame(),
            entity_count: engine.world().entity_count(),
            component_records: engine.world().components().record_count(),
            assets: engine.assets().len(),
            prefabs: engine.prefabs().len(),
            active_scripts: engine.scripts().active_count(),
            debug: store.debug_enabled(),
            fps: store.show_fps().then(|| engine.clock().fps()),
        }
    }

    /// All live entity ids in ascending order.
    pub fn list_entities(world: &World) -> Vec<EntityId> {
        world.entities().sorted()
    }

    /// Everything known about one entity, or `None` if it is not live.
    pub fn inspect_entity(engine: &Engine, id: EntityId) -> Option<EntityInfo> {
        let world = engine.world();
        if !world.contains(id) {
            return None;
        }
        let transform = world.transform(id);
        let components = world
            .components()
            .components_of(id)
            .map(|(tag, component)| ComponentInfo {
                tag: tag.to_string(),
                kind: component.kind(),
                value: display_value(component),
            })
            .collect();
        let script = engine.scripts().state(id).map(|state| ScriptInfo {
            kind: engine.scripts().kind_of(id).unwrap_or_default().to_string(),
            state,
            enabled: engine.scripts().is_enabled(id).unwrap_or(false),
        });

        Some(EntityInfo {
            id,
            name: world
                .get_component(id, tags::NAME)
                .and_then(Component::as_name)
                .map(str::to_string),
            position: transform.position,
            rotation_degrees: transform.euler_degrees(),
            scale: transform.scale,
            material: engine.material_of(id).ok().map(|m| m.id.clone()),
            components,
            script,
        })
    }

    /// Read a named debug flag.
    pub fn debug_flag(store: &EngineStore, name: &str) -> bool {
        store.flag(name)
    }

    /// Set a named debug flag, returning its previous value.
    pub fn set_debug_flag(store: &mut EngineStore, name: &str, value: bool) -> Result<bool, EngineError> {
        let previous = store.set_flag(name, value)?;
        tracing::debug!(flag = name, previous, value, "inspector set debug flag");
        Ok(previous)
    }
}

fn display_value(component: &Component) -> String {
    match component {
        Component::Name(name) => name.clone(),
        Component::MaterialRef(id) => id.clone(),
        Component::Parent(parent) => parent.to_string(),
        Component::Data(value) => value.to_string(),
        Component::Transform(t) => format!(
            "pos=({:.2}, {:.2}, {:.2}) scale=({:.2}, {:.2}, {:.2})",
            t.position.x, t.position.y, t.position.z, t.scale.x, t.scale.y, t.scale.z
        ),
        Component::MeshRenderer(r) => serde_json::to_string(r).unwrap_or_else(|e| format!("<{e}>")),
        Component::Script(s) => serde_json::to_string(s).unwrap_or_else(|e| format!("<{e}>")),
    }
}

/// Summary of engine state for the inspector.
#[derive(Debug, Clone)]
pub struct EngineSummary {
    pub frame: u64,
    pub entity_count: usize,
    pub component_records: usize,
    pub assets: usize,
    pub prefabs: usize,
    pub active_scripts: usize,
    pub debug: bool,
    /// Present only while the store's `show_fps` toggle is on.
    pub fps: Option<f64>,
}

impl std::fmt::Display for EngineSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Engine: frame={} entities={} components={} assets={} prefabs={} scripts={}",
            self.frame,
            self.entity_count,
            self.component_records,
            self.assets,
            self.prefabs,
            self.active_scripts
        )?;
        if self.debug {
            f.write_str(" debug=on")?;
        }
        if let Some(fps) = self.fps {
            write!(f, " fps={fps:.1}")?;
        }
        Ok(())
    }
}

/// One component row.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub tag: String,
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ScriptInfo {
    pub kind: String,
    pub state: BindingState,
    pub enabled: bool,
}

/// Detailed info about a single entity.
#[derive(Debug, Clone)]
pub struct EntityInfo {
    pub id: EntityId,
    pub name: Option<String>,
    pub position: Vec3,
    pub rotation_degrees: Vec3,
    pub scale: Vec3,
    /// Resolved material id, if the entity references a registered one.
    pub material: Option<String>,
    pub components: Vec<ComponentInfo>,
    pub script: Option<ScriptInfo>,
}

impl std::fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Entity {} `{}` pos=({:.2}, {:.2}, {:.2}) rot=({:.1}, {:.1}, {:.1}) scale=({:.2}, {:.2}, {:.2})",
            self.id,
            self.name.as_deref().unwrap_or("unnamed"),
            self.position.x,
            self.position.y,
            self.position.z,
            self.rotation_degrees.x,
            self.rotation_degrees.y,
            self.rotation_degrees.z,
            self.scale.x,
            self.scale.y,
            self.scale.z,
        )?;
        for c in &self.components {
            write!(f, "\n  {} [{}] {}", c.tag, c.kind, c.value)?;
        }
        if let Some(s) = &self.script {
            write!(
                f,
                "\n  script {} {:?}{}",
                s.kind,
                s.state,
                if s.enabled { "" } else { " (disabled)" }
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_kernel::EngineConfig;
    use orrery_script::from_fn;

    #[test]
    fn summary_empty_engine() {
        let engine = Engine::default();
        let summary = Inspector::summary(&engine);
        assert_eq!(summary.frame, 0);
        assert_eq!(summary.entity_count, 0);
        assert_eq!(summary.fps, None);
    }

    #[test]
    fn summary_with_entities() {
        let mut engine = Engine::default();
        let a = engine.world_mut().spawn();
        engine.world_mut().spawn();
        engine
            .world_mut()
            .set_component(a, tags::NAME, Component::Name("a".into()))
            .unwrap();
        engine.bind_script(a, Box::new(from_fn(|_, _| Ok(())))).unwrap();
        engine.step(0.016);

        let summary = Inspector::summary(&engine);
        assert_eq!(summary.frame, 1);
        assert_eq!(summary.entity_count, 2);
        assert_eq!(summary.component_records, 1);
        assert_eq!(summary.active_scripts, 1);
    }

    #[test]
    fn fps_shown_only_when_enabled() {
        let config = EngineConfig::from_yaml_str("debug:\n  show_fps: true\n").unwrap();
        let mut engine = Engine::new(config);
        engine.tick(0.02);
        engine.tick(0.04);
        let summary = Inspector::summary(&engine);
        assert!((summary.fps.unwrap() - 50.0).abs() < 1e-6);
        assert!(format!("{summary}").contains("fps=50.0"));
    }

    #[test]
    fn inspect_entity_found() {
        let mut engine = Engine::default();
        let id = engine.world_mut().spawn();
        engine
            .world_mut()
            .set_component(id, tags::NAME, Component::Name("Oak".into()))
            .unwrap();
        engine
            .world_mut()
            .update_transform(id, |t| t.position = Vec3::new(1.0, 2.0, 3.0))
            .unwrap();

        let info = Inspector::inspect_entity(&engine, id).unwrap();
        assert_eq!(info.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(info.name.as_deref(), Some("Oak"));
        assert_eq!(info.components.len(), 2);
        assert!(info.script.is_none());
        assert!(info.material.is_none());

        let text = format!("{info}");
        assert!(text.contains("`Oak`"));
        assert!(text.contains("name [name] Oak"));
    }

    #[test]
    fn inspect_entity_not_found() {
        let engine = Engine::default();
        assert!(Inspector::inspect_entity(&engine, EntityId(42)).is_none());
    }

    #[test]
    fn list_entities_sorted() {
        let mut engine = Engine::default();
        let ids: Vec<EntityId> = (0..5).map(|_| engine.world_mut().spawn()).collect();
        engine.destroy_entity(ids[1]);
        assert_eq!(
            Inspector::list_entities(engine.world()),
            vec![ids[0], ids[2], ids[3], ids[4]]
        );
    }

    #[test]
    fn debug_flags_pass_through_store() {
        let mut engine = Engine::default();
        assert!(!Inspector::debug_flag(engine.store(), "wireframe"));
        assert!(!Inspector::set_debug_flag(engine.store_mut(), "wireframe", true).unwrap());
        assert!(Inspector::debug_flag(engine.store(), "wireframe"));

        engine.shutdown();
        assert!(Inspector::set_debug_flag(engine.store_mut(), "wireframe", false).is_err());
    }
}
