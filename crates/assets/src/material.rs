use glam::Vec3;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Version of the material schema understood by this crate.
pub const MATERIAL_SCHEMA_VERSION: u32 = 1;

/// Material as authored in content files. Every field except `id` and `name`
/// is optional and resolves to a documented default on registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialSpec {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub version: Option<u32>,
    pub shader: Option<String>,
    pub material_type: Option<String>,
    pub color: Option<String>,
    pub metalness: Option<f32>,
    pub roughness: Option<f32>,
    pub emissive: Option<String>,
    pub emissive_intensity: Option<f32>,
    pub albedo_texture: Option<String>,
    pub normal_texture: Option<String>,
    pub metallic_texture: Option<String>,
    pub roughness_texture: Option<String>,
    pub emissive_texture: Option<String>,
    pub occlusion_texture: Option<String>,
    pub normal_scale: Option<f32>,
    pub occlusion_strength: Option<f32>,
    pub texture_offset_x: Option<f32>,
    pub texture_offset_y: Option<f32>,
    pub texture_repeat_x: Option<f32>,
    pub texture_repeat_y: Option<f32>,
    pub transparent: Option<bool>,
    pub alpha_mode: Option<String>,
    pub alpha_cutoff: Option<f32>,
}

impl MaterialSpec {
    /// A spec with only `id` and `name` set; everything else defaults.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A registered, fully resolved material. Immutable once built.
///
/// Numeric fields are stored as authored; values outside their natural range
/// (for example roughness above 1) are kept and left for the renderer to
/// clamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDefinition {
    pub id: String,
    pub name: String,
    pub shader: String,
    pub material_type: String,
    pub color: String,
    pub metalness: f32,
    pub roughness: f32,
    pub emissive: String,
    pub emissive_intensity: f32,
    /// Texture references are asset ids; an empty string means no texture.
    pub albedo_texture: String,
    pub normal_texture: String,
    pub metallic_texture: String,
    pub roughness_texture: String,
    pub emissive_texture: String,
    pub occlusion_texture: String,
    pub normal_scale: f32,
    pub occlusion_strength: f32,
    pub texture_offset_x: f32,
    pub texture_offset_y: f32,
    pub texture_repeat_x: f32,
    pub texture_repeat_y: f32,
    pub transparent: bool,
    pub alpha_mode: String,
    pub alpha_cutoff: f32,
}

impl MaterialDefinition {
    /// Resolve a spec against the defaults. Validation happens in the
    /// registry; this only fills gaps.
    pub(crate) fn resolve(spec: MaterialSpec) -> Self {
        let texture = |t: Option<String>| t.unwrap_or_default();
        Self {
            id: spec.id,
            name: spec.name,
            shader: spec.shader.unwrap_or_else(|| "standard".into()),
            material_type: spec.material_type.unwrap_or_else(|| "solid".into()),
            color: spec.color.unwrap_or_else(|| "#cccccc".into()),
            metalness: spec.metalness.unwrap_or(0.0),
            roughness: spec.roughness.unwrap_or(0.7),
            emissive: spec.emissive.unwrap_or_else(|| "#000000".into()),
            emissive_intensity: spec.emissive_intensity.unwrap_or(0.0),
            albedo_texture: texture(spec.albedo_texture),
            normal_texture: texture(spec.normal_texture),
            metallic_texture: texture(spec.metallic_texture),
            roughness_texture: texture(spec.roughness_texture),
            emissive_texture: texture(spec.emissive_texture),
            occlusion_texture: texture(spec.occlusion_texture),
            normal_scale: spec.normal_scale.unwrap_or(1.0),
            occlusion_strength: spec.occlusion_strength.unwrap_or(1.0),
            texture_offset_x: spec.texture_offset_x.unwrap_or(0.0),
            texture_offset_y: spec.texture_offset_y.unwrap_or(0.0),
            texture_repeat_x: spec.texture_repeat_x.unwrap_or(1.0),
            texture_repeat_y: spec.texture_repeat_y.unwrap_or(1.0),
            transparent: spec.transparent.unwrap_or(false),
            alpha_mode: spec.alpha_mode.unwrap_or_else(|| "opaque".into()),
            alpha_cutoff: spec.alpha_cutoff.unwrap_or(0.5),
        }
    }

    /// Base colour as sRGB-encoded 0..1 channels, not linearized.
    /// Unparseable hex falls back to grey.
    pub fn color_rgb(&self) -> Vec3 {
        parse_hex_color(&self.color).unwrap_or(Vec3::new(0.8, 0.8, 0.8))
    }

    /// Emissive colour as sRGB-encoded 0..1 channels, not linearized.
    /// Unparseable hex falls back to black.
    pub fn emissive_rgb(&self) -> Vec3 {
        parse_hex_color(&self.emissive).unwrap_or(Vec3::ZERO)
    }

    /// Texture slots that reference an asset, as (slot, asset id) pairs.
    pub fn texture_refs(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("albedo", self.albedo_texture.as_str()),
            ("normal", self.normal_texture.as_str()),
            ("metallic", self.metallic_texture.as_str()),
            ("roughness", self.roughness_texture.as_str()),
            ("emissive", self.emissive_texture.as_str()),
            ("occlusion", self.occlusion_texture.as_str()),
        ]
        .into_iter()
        .filter(|(_, id)| !id.is_empty())
    }

    /// Content hash of the resolved definition.
    ///
    /// Two definitions with identical fields share a fingerprint, so a
    /// renderer can tell whether a cached GPU material is stale.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Sha256::new();
        for s in [
            &self.id,
            &self.name,
            &self.shader,
            &self.material_type,
            &self.color,
            &self.emissive,
            &self.albedo_texture,
            &self.normal_texture,
            &self.metallic_texture,
            &self.roughness_texture,
            &self.emissive_texture,
            &self.occlusion_texture,
            &self.alpha_mode,
        ] {
            hasher.update((s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        for f in [
            self.metalness,
            self.roughness,
            self.emissive_intensity,
            self.normal_scale,
            self.occlusion_strength,
            self.texture_offset_x,
            self.texture_offset_y,
            self.texture_repeat_x,
            self.texture_repeat_y,
            self.alpha_cutoff,
        ] {
            hasher.update(f.to_le_bytes());
        }
        hasher.update([u8::from(self.transparent)]);
        let result = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&result[..8]);
        u64::from_le_bytes(bytes)
    }
}

/// Parse `#RRGGBB` into 0..1 channels: each byte divided by 255, with no
/// gamma conversion.
pub fn parse_hex_color(hex: &str) -> Option<Vec3> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16)
            .ok()
            .map(|v| v as f32 / 255.0)
    };
    Some(Vec3::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
