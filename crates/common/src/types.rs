use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, process-unique handle for an entity.
///
/// Ids are issued by the entity index. Holding an id does not keep the
/// entity alive; check liveness against the index before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Identity rotation and unit scale at `position`.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Build a rotation from XYZ Euler angles in degrees.
    pub fn rotation_from_degrees(x: f32, y: f32, z: f32) -> Quat {
        Quat::from_euler(EulerRot::XYZ, x.to_radians(), y.to_radians(), z.to_radians())
    }

    /// Current rotation as XYZ Euler angles in degrees.
    pub fn euler_degrees(&self) -> Vec3 {
        let (x, y, z) = self.rotation.to_euler(EulerRot::XYZ);
        Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
    }

    /// Move by `delta` in world space.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Apply an incremental rotation given in degrees about X, Y and Z.
    pub fn rotate_degrees(&mut self, x: f32, y: f32, z: f32) {
        let delta = Self::rotation_from_degrees(x, y, z);
        self.rotation = (delta * self.rotation).normalize();
    }

    /// Multiply the current scale component-wise.
    pub fn scale_by(&mut self, factor: Vec3) {
        self.scale *= factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_ordering_follows_raw_value() {
        let a = EntityId::new(1);
        let b = EntityId::new(2);
        assert!(a < b);
        assert_eq!(format!("{b}"), "#2");
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
    }

    #[test]
    fn rotate_degrees_accumulates() {
        let mut t = Transform::default();
        t.rotate_degrees(0.0, 45.0, 0.0);
        t.rotate_degrees(0.0, 45.0, 0.0);
        let euler = t.euler_degrees();
        assert!((euler.y - 90.0).abs() < 1e-3, "got {euler:?}");
    }

    #[test]
    fn translate_and_scale() {
        let mut t = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        t.translate(Vec3::new(0.0, 2.0, 0.0));
        t.scale_by(Vec3::splat(2.0));
        assert_eq!(t.position, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(t.scale, Vec3::splat(2.0));
    }

    #[test]
    fn transform_deserializes_with_defaults() {
        let t: Transform = serde_json::from_str(r#"{"position":[1.0,2.0,3.0]}"#).unwrap();
        assert_eq!(t.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.scale, Vec3::ONE);
    }
}
