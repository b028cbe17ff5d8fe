use std::collections::BTreeMap;

use glam::Vec3;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ScriptError;
use crate::handle::EntityHandle;
use crate::script::Script;

/// Builds a script from the `params` of a `script` component.
pub type ScriptConstructor =
    Box<dyn Fn(&Value) -> Result<Box<dyn Script>, ScriptError> + Send + Sync>;

/// Named script constructors, used to bind scripts declared as component data.
#[derive(Default)]
pub struct ScriptLibrary {
    kinds: BTreeMap<String, ScriptConstructor>,
}

impl std::fmt::Debug for ScriptLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptLibrary")
            .field("kinds", &self.kinds.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ScriptLibrary {
    /// An empty library with no kinds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A library with `rotator` and `mover` registered.
    pub fn with_builtins() -> Self {
        let mut library = Self::new();
        library.kinds.insert(Rotator::KIND.into(), Box::new(Rotator::from_params));
        library.kinds.insert(Mover::KIND.into(), Box::new(Mover::from_params));
        library
    }

    /// Add a constructor under `kind`. Kinds are never replaced.
    pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F) -> Result<(), ScriptError>
    where
        F: Fn(&Value) -> Result<Box<dyn Script>, ScriptError> + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self.kinds.contains_key(&kind) {
            return Err(ScriptError::DuplicateKind(kind));
        }
        tracing::debug!(%kind, "script kind registered");
        self.kinds.insert(kind, Box::new(constructor));
        Ok(())
    }

    /// Build a script of `kind` from component params.
    pub fn create(&self, kind: &str, params: &Value) -> Result<Box<dyn Script>, ScriptError> {
        let constructor = self
            .kinds
            .get(kind)
            .ok_or_else(|| ScriptError::UnknownKind(kind.to_string()))?;
        constructor(params)
    }

    /// True if `kind` is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    /// Registered kinds in ascending order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }
}

/// Decode params, treating `null` as "all defaults".
fn parse_params<P: DeserializeOwned + Default>(kind: &str, params: &Value) -> Result<P, ScriptError> {
    if params.is_null() {
        return Ok(P::default());
    }
    P::deserialize(params).map_err(|e| ScriptError::InvalidParams {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

/// Spins its entity at a constant rate, in degrees per second per axis.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Rotator {
    pub speed: Vec3,
}

impl Default for Rotator {
    fn default() -> Self {
        Self {
            speed: Vec3::new(0.0, 90.0, 0.0),
        }
    }
}

impl Rotator {
    pub const KIND: &'static str = "rotator";

    /// Constructor for the library: `{ "speed": [x, y, z] }` in degrees per
    /// second, defaulting to a 90°/s spin about Y.
    pub fn from_params(params: &Value) -> Result<Box<dyn Script>, ScriptError> {
        Ok(Box::new(parse_params::<Self>(Self::KIND, params)?))
    }
}

impl Script for Rotator {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn on_update(&mut self, entity: &mut EntityHandle<'_>, dt: f64) -> Result<(), ScriptError> {
        let step = self.speed * dt as f32;
        entity.transform().rotate(step.x, step.y, step.z)?;
        Ok(())
    }
}

/// Moves its entity at a constant velocity in units per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Mover {
    pub velocity: Vec3,
}

impl Mover {
    pub const KIND: &'static str = "mover";

    /// Constructor for the library: `{ "velocity": [x, y, z] }`.
    pub fn from_params(params: &Value) -> Result<Box<dyn Script>, ScriptError> {
        Ok(Box::new(parse_params::<Self>(Self::KIND, params)?))
    }
}

impl Script for Mover {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn on_update(&mut self, entity: &mut EntityHandle<'_>, dt: f64) -> Result<(), ScriptError> {
        let step = self.velocity * dt as f32;
        entity.transform().translate(step.x, step.y, step.z)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{BindingState, ScriptRuntime};
    use orrery_ecs::{tags, Component, ScriptComponent, World};
    use serde_json::json;

    fn script_component(kind: &str, params: Value) -> Component {
        Component::Script(ScriptComponent {
            kind: kind.into(),
            params,
            enabled: true,
        })
    }

    #[test]
    fn builtins_are_registered() {
        let library = ScriptLibrary::with_builtins();
        assert_eq!(library.kinds().collect::<Vec<_>>(), vec!["mover", "rotator"]);
        assert!(matches!(
            library.create("teleporter", &Value::Null),
            Err(ScriptError::UnknownKind(_))
        ));
    }

    #[test]
    fn duplicate_kind_is_rejected() {
        let mut library = ScriptLibrary::with_builtins();
        let err = library.register("mover", Mover::from_params).unwrap_err();
        assert!(matches!(err, ScriptError::DuplicateKind(ref k) if k == "mover"));
    }

    #[test]
    fn invalid_params_are_reported() {
        let library = ScriptLibrary::with_builtins();
        let err = library
            .create("mover", &json!({ "velocity": "fast" }))
            .err()
            .unwrap();
        assert!(matches!(err, ScriptError::InvalidParams { ref kind, .. } if kind == "mover"));
    }

    #[test]
    fn mover_moves_by_velocity() {
        let library = ScriptLibrary::with_builtins();
        let mut world = World::new();
        let e = world.spawn();
        world
            .set_component(e, tags::SCRIPT, script_component("mover", json!({ "velocity": [2.0, 0.0, 0.0] })))
            .unwrap();

        let mut runtime = ScriptRuntime::new();
        let summary = runtime.bind_from_components(&mut world, &library);
        assert_eq!(summary.bound, vec![e]);
        assert_eq!(runtime.kind_of(e), Some("mover"));

        runtime.tick(&mut world, 0.5);
        runtime.tick(&mut world, 0.5);
        runtime.tick(&mut world, 0.25);
        assert!((world.transform(e).position.x - 1.5).abs() < 1e-6);
    }

    #[test]
    fn rotator_defaults_to_y_spin() {
        let library = ScriptLibrary::with_builtins();
        let mut world = World::new();
        let e = world.spawn();
        let mut runtime = ScriptRuntime::new();
        let script = library.create("rotator", &Value::Null).unwrap();
        runtime.bind(&mut world, e, script).unwrap();

        runtime.tick(&mut world, 0.0);
        runtime.tick(&mut world, 0.5);
        assert!((world.transform(e).euler_degrees().y - 45.0).abs() < 1e-3);
    }

    #[test]
    fn bind_from_components_skips_bad_entries() {
        let library = ScriptLibrary::with_builtins();
        let mut world = World::new();
        let good = world.spawn();
        let bad = world.spawn();
        let plain = world.spawn();
        world
            .set_component(good, tags::SCRIPT, script_component("rotator", Value::Null))
            .unwrap();
        world
            .set_component(bad, tags::SCRIPT, script_component("unknown", Value::Null))
            .unwrap();
        world
            .set_component(plain, tags::NAME, Component::Name("plain".into()))
            .unwrap();

        let mut runtime = ScriptRuntime::new();
        let summary = runtime.bind_from_components(&mut world, &library);
        assert_eq!(summary.bound, vec![good]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, bad);
        assert_eq!(runtime.state(good), Some(BindingState::Unbound));

        // already-bound entities are not bound twice
        let again = runtime.bind_from_components(&mut world, &library);
        assert!(again.bound.is_empty());
    }

    #[test]
    fn disabled_component_binds_disabled() {
        let library = ScriptLibrary::with_builtins();
        let mut world = World::new();
        let e = world.spawn();
        world
            .set_component(
                e,
                tags::SCRIPT,
                Component::Script(ScriptComponent {
                    kind: "mover".into(),
                    params: json!({ "velocity": [1.0, 0.0, 0.0] }),
                    enabled: false,
                }),
            )
            .unwrap();
        let mut runtime = ScriptRuntime::new();
        runtime.bind_from_components(&mut world, &library);
        assert_eq!(runtime.is_enabled(e), Some(false));
        runtime.tick(&mut world, 1.0);
        runtime.tick(&mut world, 1.0);
        assert_eq!(world.transform(e).position.x, 0.0);
    }
}
