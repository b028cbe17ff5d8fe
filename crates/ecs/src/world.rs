use orrery_common::{EntityId, Transform};
use serde::{Deserialize, Serialize};

use crate::component::{tags, Component, ComponentEvent, ComponentStore};
use crate::entity::EntityIndex;
use crate::error::EcsError;

/// An event record produced by entity lifecycle changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldEvent {
    Spawned { id: EntityId },
    /// Entity was destroyed after `components` records were removed.
    Destroyed { id: EntityId, components: usize },
}

/// Lengths of both event logs at one point in time. See
/// [`World::event_mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMark {
    world: usize,
    components: usize,
}

/// Entity index and component store under one owner.
///
/// All structural mutation goes through here so that the destruction path
/// always clears components before the id leaves the index.
#[derive(Debug, Clone, Default)]
pub struct World {
    entities: EntityIndex,
    components: ComponentStore,
    event_log: Vec<WorldEvent>,
}

impl World {
    /// An empty world that never reissues ids.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a world whose index reissues destroyed ids.
    pub fn with_recycling(recycle: bool) -> Self {
        Self {
            entities: EntityIndex::with_recycling(recycle),
            ..Self::default()
        }
    }

    /// Read-only view of the live id set.
    pub fn entities(&self) -> &EntityIndex {
        &self.entities
    }

    /// Read-only view of every component record.
    pub fn components(&self) -> &ComponentStore {
        &self.components
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// True if `id` is live.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.has(id)
    }

    /// Spawn a new, empty entity. Returns its id.
    pub fn spawn(&mut self) -> EntityId {
        let id = self.entities.allocate();
        self.spawn_with_id(id);
        id
    }

    /// Make `id` live. No-op if it already is.
    pub fn spawn_with_id(&mut self, id: EntityId) {
        if self.entities.has(id) {
            return;
        }
        self.entities.add(id);
        self.event_log.push(WorldEvent::Spawned { id });
        tracing::trace!(%id, "entity spawned");
    }

    /// Destroy an entity and every component attached to it.
    ///
    /// Returns false if the entity was not live.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        if !self.entities.has(id) {
            return false;
        }
        let components = self.components.remove_all(id);
        self.entities.delete(id);
        self.event_log.push(WorldEvent::Destroyed { id, components });
        tracing::trace!(%id, components, "entity destroyed");
        true
    }

    /// Insert or replace a component. Fails if `entity` is not live.
    pub fn set_component(
        &mut self,
        entity: EntityId,
        tag: impl Into<String>,
        component: Component,
    ) -> Result<(), EcsError> {
        self.components.set(&self.entities, entity, tag, component)
    }

    /// The component under `tag`, if any.
    pub fn get_component(&self, entity: EntityId, tag: &str) -> Option<&Component> {
        self.components.get(entity, tag)
    }

    /// Remove a component, returning it. Absent records are a no-op.
    pub fn remove_component(&mut self, entity: EntityId, tag: &str) -> Option<Component> {
        self.components.remove(entity, tag)
    }

    /// The entity's transform, or the identity transform if it has none.
    pub fn transform(&self, entity: EntityId) -> Transform {
        self.components
            .get(entity, tags::TRANSFORM)
            .and_then(Component::as_transform)
            .copied()
            .unwrap_or_default()
    }

    /// Apply `f` to the entity's transform and write it back.
    ///
    /// Entities without a transform start from identity.
    pub fn update_transform(
        &mut self,
        entity: EntityId,
        f: impl FnOnce(&mut Transform),
    ) -> Result<Transform, EcsError> {
        if !self.entities.has(entity) {
            return Err(EcsError::UnknownEntity(entity));
        }
        let mut transform = self.transform(entity);
        f(&mut transform);
        self.set_component(entity, tags::TRANSFORM, Component::Transform(transform))?;
        Ok(transform)
    }

    /// Drain and return the entity lifecycle log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Lifecycle events not yet drained.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    /// Drain and return pending component events.
    pub fn drain_component_events(&mut self) -> Vec<ComponentEvent> {
        self.components.drain_events()
    }

    /// Remember where both event logs end, for [`World::rewind_events`].
    pub fn event_mark(&self) -> EventMark {
        EventMark {
            world: self.event_log.len(),
            components: self.components.events().len(),
        }
    }

    /// Lifecycle events recorded after `mark`. Empty if the log has been
    /// drained since.
    pub fn events_since(&self, mark: EventMark) -> &[WorldEvent] {
        self.event_log.get(mark.world..).unwrap_or(&[])
    }

    /// Discard events recorded after `mark` that concern one of `entities`.
    ///
    /// Used when entities spawned after the mark have been destroyed again
    /// and should leave no trace in either log.
    pub fn rewind_events(&mut self, mark: EventMark, entities: &[EntityId]) {
        let mut position = 0;
        self.event_log.retain(|event| {
            let id = match event {
                WorldEvent::Spawned { id } | WorldEvent::Destroyed { id, .. } => *id,
            };
            let keep = position < mark.world || !entities.contains(&id);
            position += 1;
            keep
        });
        self.components.forget_events(mark.components, entities);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn world_starts_empty() {
        let w = World::new();
        assert_eq!(w.entity_count(), 0);
        assert!(w.events().is_empty());
    }

    #[test]
    fn spawn_and_destroy() {
        let mut w = World::new();
        let id = w.spawn();
        assert!(w.contains(id));
        assert!(w.destroy(id));
        assert!(!w.contains(id));
        assert!(!w.destroy(id));
        assert_eq!(w.events().len(), 2);
    }

    #[test]
    fn destroy_removes_components_first() {
        let mut w = World::new();
        let id = w.spawn();
        w.set_component(id, tags::NAME, Component::Name("Tree".into()))
            .unwrap();
        w.set_component(id, tags::MATERIAL, Component::MaterialRef("bark".into()))
            .unwrap();
        w.destroy(id);

        assert_eq!(w.components().components_of(id).count(), 0);
        assert_eq!(
            w.events().last(),
            Some(&WorldEvent::Destroyed { id, components: 2 })
        );
    }

    #[test]
    fn ids_are_not_reused_by_default() {
        let mut w = World::new();
        let a = w.spawn();
        w.destroy(a);
        let b = w.spawn();
        assert_ne!(a, b);
    }

    #[test]
    fn recycling_world_reuses_ids() {
        let mut w = World::with_recycling(true);
        let a = w.spawn();
        w.destroy(a);
        assert_eq!(w.spawn(), a);
    }

    #[test]
    fn update_transform_starts_from_identity() {
        let mut w = World::new();
        let id = w.spawn();
        let t = w
            .update_transform(id, |t| t.translate(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        assert_eq!(t.position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(w.transform(id).position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn update_transform_on_dead_entity_fails() {
        let mut w = World::new();
        let err = w.update_transform(EntityId(42), |_| {}).unwrap_err();
        assert!(matches!(err, EcsError::UnknownEntity(_)));
    }

    #[test]
    fn rewind_discards_events_after_mark() {
        let mut w = World::new();
        let keep = w.spawn();
        w.set_component(keep, tags::NAME, Component::Name("keep".into()))
            .unwrap();
        let mark = w.event_mark();

        let temp = w.spawn();
        w.set_component(temp, tags::NAME, Component::Name("temp".into()))
            .unwrap();
        w.destroy(temp);
        w.set_component(keep, tags::MATERIAL, Component::MaterialRef("bark".into()))
            .unwrap();
        assert_eq!(w.events().len(), 3);

        assert_eq!(
            w.events_since(mark),
            &[WorldEvent::Spawned { id: temp }, WorldEvent::Destroyed { id: temp, components: 1 }]
        );
        w.rewind_events(mark, &[temp]);
        assert_eq!(w.events(), &[WorldEvent::Spawned { id: keep }]);
        let entities: Vec<EntityId> = w.components().events().iter().map(ComponentEvent::entity).collect();
        assert_eq!(entities, vec![keep, keep]);
    }

    #[test]
    fn component_events_are_drained() {
        let mut w = World::new();
        let id = w.spawn();
        w.set_component(id, tags::NAME, Component::Name("a".into()))
            .unwrap();
        assert_eq!(w.drain_component_events().len(), 1);
        assert!(w.components().events().is_empty());
    }
}
