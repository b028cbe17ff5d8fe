use glam::Vec3;
use orrery_common::{EntityId, Transform};
use orrery_ecs::{Component, World};
use serde_json::Value;

use crate::error::ScriptError;
use crate::event::ScriptEvent;

/// Frame timing visible to scripts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeInfo {
    /// Seconds since the previous tick. Never negative.
    pub delta: f64,
    /// Seconds accumulated over all ticks.
    pub elapsed: f64,
    /// Ticks run so far, including the current one.
    pub frame: u64,
}

/// Requests made by scripts, applied after every binding has run for the
/// tick.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Deferred {
    Despawn(EntityId),
    Emit(ScriptEvent),
    Subscribe { entity: EntityId, name: String },
    Unsubscribe { entity: EntityId, name: String },
    Timer {
        entity: EntityId,
        name: String,
        seconds: f64,
        payload: Value,
    },
}

/// The view a script gets of its bound entity.
///
/// Component reads and writes go straight to the world. Destroying entities,
/// emitting events, subscribing and setting timers are deferred to the end
/// of the tick, so bindings later in the same tick never see a world or an
/// event queue mutated under them mid-dispatch.
pub struct EntityHandle<'a> {
    id: EntityId,
    world: &'a mut World,
    time: TimeInfo,
    deferred: &'a mut Vec<Deferred>,
}

impl<'a> EntityHandle<'a> {
    pub(crate) fn new(
        id: EntityId,
        world: &'a mut World,
        time: TimeInfo,
        deferred: &'a mut Vec<Deferred>,
    ) -> Self {
        Self {
            id,
            world,
            time,
            deferred,
        }
    }

    /// The entity this script is bound to.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Timing of the tick being dispatched.
    pub fn time(&self) -> TimeInfo {
        self.time
    }

    /// Read-only view of the whole world, for looking at other entities.
    pub fn world(&self) -> &World {
        &*self.world
    }

    /// This entity's component under `tag`.
    pub fn get_component(&self, tag: &str) -> Option<&Component> {
        self.world.get_component(self.id, tag)
    }

    /// Insert or replace one of this entity's components.
    pub fn set_component(&mut self, tag: &str, component: Component) -> Result<(), ScriptError> {
        self.world.set_component(self.id, tag, component)?;
        Ok(())
    }

    /// Remove one of this entity's components, returning it.
    pub fn remove_component(&mut self, tag: &str) -> Option<Component> {
        self.world.remove_component(self.id, tag)
    }

    /// Transform mutators for this entity.
    pub fn transform(&mut self) -> TransformHandle<'_> {
        TransformHandle {
            id: self.id,
            world: &mut *self.world,
        }
    }

    /// Destroy this entity once the current tick's dispatch finishes.
    pub fn despawn(&mut self) {
        self.deferred.push(Deferred::Despawn(self.id));
    }

    /// Destroy another entity once the current tick's dispatch finishes.
    pub fn despawn_entity(&mut self, id: EntityId) {
        self.deferred.push(Deferred::Despawn(id));
    }

    /// Broadcast an event to every subscriber of `name`, next tick.
    pub fn emit(&mut self, name: impl Into<String>, payload: Value) {
        self.deferred.push(Deferred::Emit(ScriptEvent {
            name: name.into(),
            payload,
            sender: Some(self.id),
            target: None,
        }));
    }

    /// Send an event to one entity's script, next tick.
    pub fn emit_to(&mut self, target: EntityId, name: impl Into<String>, payload: Value) {
        self.deferred.push(Deferred::Emit(ScriptEvent {
            name: name.into(),
            payload,
            sender: Some(self.id),
            target: Some(target),
        }));
    }

    /// Receive broadcasts named `name` from the next tick on.
    pub fn subscribe(&mut self, name: impl Into<String>) {
        self.deferred.push(Deferred::Subscribe {
            entity: self.id,
            name: name.into(),
        });
    }

    /// Stop receiving broadcasts named `name` from the next tick on.
    pub fn unsubscribe(&mut self, name: impl Into<String>) {
        self.deferred.push(Deferred::Unsubscribe {
            entity: self.id,
            name: name.into(),
        });
    }

    /// Deliver an event named `name` to this script once `seconds` of
    /// elapsed time have passed. Negative or non-finite delays fire on the
    /// next tick. Timers die with the binding.
    pub fn set_timer(&mut self, name: impl Into<String>, seconds: f64, payload: Value) {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        self.deferred.push(Deferred::Timer {
            entity: self.id,
            name: name.into(),
            seconds,
            payload,
        });
    }
}

/// Position/rotation/scale mutation surface of an [`EntityHandle`].
pub struct TransformHandle<'h> {
    id: EntityId,
    world: &'h mut World,
}

impl TransformHandle<'_> {
    /// Current transform, identity if the entity has none.
    pub fn get(&self) -> Transform {
        self.world.transform(self.id)
    }

    /// Move by the given offset.
    pub fn translate(&mut self, x: f32, y: f32, z: f32) -> Result<Transform, ScriptError> {
        self.update(|t| t.translate(Vec3::new(x, y, z)))
    }

    /// Rotate by the given Euler angles in degrees.
    pub fn rotate(&mut self, x: f32, y: f32, z: f32) -> Result<Transform, ScriptError> {
        self.update(|t| t.rotate_degrees(x, y, z))
    }

    pub fn scale_by(&mut self, x: f32, y: f32, z: f32) -> Result<Transform, ScriptError> {
        self.update(|t| t.scale_by(Vec3::new(x, y, z)))
    }

    /// Place the entity at an absolute position.
    pub fn set_position(&mut self, x: f32, y: f32, z: f32) -> Result<Transform, ScriptError> {
        self.update(|t| t.position = Vec3::new(x, y, z))
    }

    fn update(&mut self, f: impl FnOnce(&mut Transform)) -> Result<Transform, ScriptError> {
        Ok(self.world.update_transform(self.id, f)?)
    }
}
