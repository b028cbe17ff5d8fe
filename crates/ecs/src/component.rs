use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use orrery_common::{EntityId, Transform};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::EntityIndex;
use crate::error::EcsError;

/// Well-known component tags.
pub mod tags {
    pub const NAME: &str = "name";
    pub const TRANSFORM: &str = "transform";
    pub const MATERIAL: &str = "material";
    pub const MESH_RENDERER: &str = "mesh_renderer";
    pub const SCRIPT: &str = "script";
    pub const PARENT: &str = "parent";
}

/// Renderable component: references mesh and material assets by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshRenderer {
    pub mesh_id: String,
    #[serde(default)]
    pub material_id: String,
    #[serde(default = "default_true")]
    pub cast_shadows: bool,
}

/// Declarative script attachment. `kind` names an entry in the script library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptComponent {
    pub kind: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Component payload. One record per (entity, tag).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Component {
    Name(String),
    Transform(Transform),
    /// Reference to a material asset id.
    MaterialRef(String),
    MeshRenderer(MeshRenderer),
    Script(ScriptComponent),
    Parent(EntityId),
    /// Content-defined component without a typed schema.
    Data(Value),
}

impl Component {
    /// Short kind label for inspectors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Transform(_) => "transform",
            Self::MaterialRef(_) => "material_ref",
            Self::MeshRenderer(_) => "mesh_renderer",
            Self::Script(_) => "script",
            Self::Parent(_) => "parent",
            Self::Data(_) => "data",
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_transform(&self) -> Option<&Transform> {
        match self {
            Self::Transform(t) => Some(t),
            _ => None,
        }
    }

    /// The material asset id this component points at, if any.
    pub fn material_id(&self) -> Option<&str> {
        match self {
            Self::MaterialRef(id) => Some(id),
            Self::MeshRenderer(r) if !r.material_id.is_empty() => Some(&r.material_id),
            _ => None,
        }
    }

    pub fn as_script(&self) -> Option<&ScriptComponent> {
        match self {
            Self::Script(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Self::Data(v) => Some(v),
            _ => None,
        }
    }

    /// Decode a component from declarative content, keyed by its tag.
    ///
    /// Well-known tags decode into their typed variant; any other tag is kept
    /// as free-form [`Component::Data`].
    pub fn decode(tag: &str, value: &Value) -> Result<Self, EcsError> {
        let decode_err = |source| EcsError::Decode {
            tag: tag.to_string(),
            source,
        };
        match tag {
            tags::NAME => String::deserialize(value).map(Self::Name).map_err(decode_err),
            tags::TRANSFORM => TransformSpec::deserialize(value)
                .map(|spec| Self::Transform(spec.into_transform()))
                .map_err(decode_err),
            tags::MATERIAL => match value {
                Value::String(id) => Ok(Self::MaterialRef(id.clone())),
                _ => MaterialRefSpec::deserialize(value)
                    .map(|spec| Self::MaterialRef(spec.material_id))
                    .map_err(decode_err),
            },
            tags::MESH_RENDERER => MeshRenderer::deserialize(value)
                .map(Self::MeshRenderer)
                .map_err(decode_err),
            tags::SCRIPT => ScriptComponent::deserialize(value)
                .map(Self::Script)
                .map_err(decode_err),
            tags::PARENT => EntityId::deserialize(value)
                .map(Self::Parent)
                .map_err(decode_err),
            _ => Ok(Self::Data(value.clone())),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MaterialRefSpec {
    material_id: String,
}

/// Transform as authored in content: rotation is either XYZ Euler degrees
/// (3 values) or a quaternion (4 values, xyzw).
#[derive(Deserialize)]
struct TransformSpec {
    #[serde(default)]
    position: Option<[f32; 3]>,
    #[serde(default)]
    rotation: Option<Vec<f32>>,
    #[serde(default)]
    scale: Option<[f32; 3]>,
}

impl TransformSpec {
    fn into_transform(self) -> Transform {
        let rotation = match self.rotation.as_deref() {
            Some([x, y, z]) => Transform::rotation_from_degrees(*x, *y, *z),
            Some([x, y, z, w]) => Quat::from_xyzw(*x, *y, *z, *w).normalize(),
            _ => Quat::IDENTITY,
        };
        Transform {
            position: self.position.map(Vec3::from_array).unwrap_or(Vec3::ZERO),
            rotation,
            scale: self.scale.map(Vec3::from_array).unwrap_or(Vec3::ONE),
        }
    }
}

/// Events produced by component mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComponentEvent {
    Added {
        entity: EntityId,
        tag: String,
        component: Component,
    },
    Updated {
        entity: EntityId,
        tag: String,
        old: Component,
        new: Component,
    },
    Removed {
        entity: EntityId,
        tag: String,
        component: Component,
    },
}

impl ComponentEvent {
    /// The entity the event is about.
    pub fn entity(&self) -> EntityId {
        match self {
            Self::Added { entity, .. } | Self::Updated { entity, .. } | Self::Removed { entity, .. } => {
                *entity
            }
        }
    }
}

/// Tagged component storage.
///
/// Records are keyed by entity, then by tag. BTreeMap keeps iteration order
/// canonical so inspectors and tests see a stable layout.
///
/// # Invariants
/// - At most one record per (entity, tag); setting twice replaces.
/// - Records only exist for entities that were live when written.
/// - Every mutation appends a [`ComponentEvent`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentStore {
    records: BTreeMap<EntityId, BTreeMap<String, Component>>,
    #[serde(skip)]
    events: Vec<ComponentEvent>,
}

impl ComponentStore {
    /// An empty store with no pending events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `(entity, tag)`.
    ///
    /// Fails with [`EcsError::UnknownEntity`] when `entity` is not live in
    /// `index`.
    pub fn set(
        &mut self,
        index: &EntityIndex,
        entity: EntityId,
        tag: impl Into<String>,
        component: Component,
    ) -> Result<(), EcsError> {
        if !index.has(entity) {
            return Err(EcsError::UnknownEntity(entity));
        }
        let tag = tag.into();
        let slot = self.records.entry(entity).or_default();
        match slot.insert(tag.clone(), component.clone()) {
            Some(old) => self.events.push(ComponentEvent::Updated {
                entity,
                tag,
                old,
                new: component,
            }),
            None => self.events.push(ComponentEvent::Added {
                entity,
                tag,
                component,
            }),
        }
        Ok(())
    }

    /// The record for `(entity, tag)`, or `None` if absent.
    ///
    /// `None` does not tell a missing component from a missing entity; ask the
    /// entity index for the latter.
    pub fn get(&self, entity: EntityId, tag: &str) -> Option<&Component> {
        self.records.get(&entity).and_then(|slot| slot.get(tag))
    }

    /// True if `(entity, tag)` has a record.
    pub fn has(&self, entity: EntityId, tag: &str) -> bool {
        self.get(entity, tag).is_some()
    }

    /// Remove the record for `(entity, tag)`. Removing an absent record is a
    /// no-op.
    pub fn remove(&mut self, entity: EntityId, tag: &str) -> Option<Component> {
        let slot = self.records.get_mut(&entity)?;
        let removed = slot.remove(tag);
        if slot.is_empty() {
            self.records.remove(&entity);
        }
        if let Some(ref component) = removed {
            self.events.push(ComponentEvent::Removed {
                entity,
                tag: tag.to_string(),
                component: component.clone(),
            });
        }
        removed
    }

    /// Remove every record for `entity`. Returns how many were removed.
    pub fn remove_all(&mut self, entity: EntityId) -> usize {
        let Some(slot) = self.records.remove(&entity) else {
            return 0;
        };
        let count = slot.len();
        for (tag, component) in slot {
            self.events.push(ComponentEvent::Removed {
                entity,
                tag,
                component,
            });
        }
        count
    }

    /// All records of one entity, in tag order.
    pub fn components_of(&self, entity: EntityId) -> impl Iterator<Item = (&str, &Component)> {
        self.records
            .get(&entity)
            .into_iter()
            .flat_map(|slot| slot.iter().map(|(tag, c)| (tag.as_str(), c)))
    }

    /// Entities carrying a record under `tag`, ascending.
    pub fn entities_with<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = EntityId> + 'a {
        self.records
            .iter()
            .filter(move |(_, slot)| slot.contains_key(tag))
            .map(|(id, _)| *id)
    }

    /// Number of records across all entities.
    pub fn record_count(&self) -> usize {
        self.records.values().map(BTreeMap::len).sum()
    }

    /// Drain and return all pending component events.
    pub fn drain_events(&mut self) -> Vec<ComponentEvent> {
        std::mem::take(&mut self.events)
    }

    /// Read-only access to pending events.
    pub fn events(&self) -> &[ComponentEvent] {
        &self.events
    }

    /// Forget events past the first `start` that concern one of `entities`.
    pub(crate) fn forget_events(&mut self, start: usize, entities: &[EntityId]) {
        let mut position = 0;
        self.events.retain(|event| {
            let keep = position < start || !entities.contains(&event.entity());
            position += 1;
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index_with(ids: &[u64]) -> EntityIndex {
        let mut index = EntityIndex::new();
        for raw in ids {
            index.add(EntityId(*raw));
        }
        index
    }

    #[test]
    fn set_on_unknown_entity_fails() {
        let mut index = EntityIndex::new();
        let mut store = ComponentStore::new();
        let e = EntityId(1);
        let err = store
            .set(&index, e, tags::NAME, Component::Name("Tree".into()))
            .unwrap_err();
        assert!(matches!(err, EcsError::UnknownEntity(id) if id == e));

        index.add(e);
        store
            .set(&index, e, tags::NAME, Component::Name("Tree".into()))
            .unwrap();
        assert_eq!(store.get(e, tags::NAME).unwrap().as_name(), Some("Tree"));
    }

    #[test]
    fn set_twice_replaces() {
        let index = index_with(&[1]);
        let mut store = ComponentStore::new();
        let e = EntityId(1);
        store
            .set(&index, e, tags::MATERIAL, Component::MaterialRef("a".into()))
            .unwrap();
        store
            .set(&index, e, tags::MATERIAL, Component::MaterialRef("b".into()))
            .unwrap();
        assert_eq!(store.record_count(), 1);
        assert_eq!(store.get(e, tags::MATERIAL).unwrap().material_id(), Some("b"));
        assert!(matches!(store.events()[1], ComponentEvent::Updated { .. }));
    }

    #[test]
    fn get_absent_is_none() {
        let index = index_with(&[1]);
        let mut store = ComponentStore::new();
        store
            .set(&index, EntityId(1), tags::NAME, Component::Name("x".into()))
            .unwrap();
        assert!(store.get(EntityId(1), tags::TRANSFORM).is_none());
        assert!(store.get(EntityId(2), tags::NAME).is_none());
    }

    #[test]
    fn remove_is_idempotent() {
        let index = index_with(&[1]);
        let mut store = ComponentStore::new();
        let e = EntityId(1);
        store
            .set(&index, e, tags::NAME, Component::Name("x".into()))
            .unwrap();
        assert!(store.remove(e, tags::NAME).is_some());
        assert!(store.remove(e, tags::NAME).is_none());
        assert_eq!(store.events().len(), 2);
    }

    #[test]
    fn remove_all_clears_entity() {
        let index = index_with(&[1, 2]);
        let mut store = ComponentStore::new();
        let e = EntityId(1);
        store
            .set(&index, e, tags::NAME, Component::Name("x".into()))
            .unwrap();
        store
            .set(&index, e, tags::TRANSFORM, Component::Transform(Transform::default()))
            .unwrap();
        store
            .set(&index, EntityId(2), tags::NAME, Component::Name("y".into()))
            .unwrap();

        assert_eq!(store.remove_all(e), 2);
        assert_eq!(store.components_of(e).count(), 0);
        assert!(store.has(EntityId(2), tags::NAME));
    }

    #[test]
    fn entities_with_is_ascending() {
        let index = index_with(&[3, 1, 2]);
        let mut store = ComponentStore::new();
        for raw in [3, 1] {
            store
                .set(&index, EntityId(raw), tags::MATERIAL, Component::MaterialRef("m".into()))
                .unwrap();
        }
        let ids: Vec<EntityId> = store.entities_with(tags::MATERIAL).collect();
        assert_eq!(ids, vec![EntityId(1), EntityId(3)]);
    }

    #[test]
    fn decode_transform_with_euler_degrees() {
        let c = Component::decode(
            tags::TRANSFORM,
            &json!({ "position": [1.0, 2.0, 3.0], "rotation": [0.0, 90.0, 0.0] }),
        )
        .unwrap();
        let t = c.as_transform().unwrap();
        assert_eq!(t.position, Vec3::new(1.0, 2.0, 3.0));
        assert!((t.euler_degrees().y - 90.0).abs() < 1e-3);
        assert_eq!(t.scale, Vec3::ONE);
    }

    #[test]
    fn decode_material_accepts_string_or_object() {
        let a = Component::decode(tags::MATERIAL, &json!("forestground")).unwrap();
        let b = Component::decode(tags::MATERIAL, &json!({ "materialId": "forestground" })).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.material_id(), Some("forestground"));
    }

    #[test]
    fn decode_unknown_tag_keeps_data() {
        let c = Component::decode("health", &json!({ "hp": 10 })).unwrap();
        assert_eq!(c.as_data(), Some(&json!({ "hp": 10 })));
    }

    #[test]
    fn decode_reports_bad_payload() {
        let err = Component::decode(tags::NAME, &json!(42)).unwrap_err();
        assert!(matches!(err, EcsError::Decode { ref tag, .. } if tag == "name"));
    }
}
