use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AssetError;
use crate::material::{MaterialDefinition, MaterialSpec, MATERIAL_SCHEMA_VERSION};

/// Texture as authored in content files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextureSpec {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
}

/// A registered texture: an id bound to a source path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureDefinition {
    pub id: String,
    pub name: String,
    pub path: String,
}

/// A registered asset of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetDefinition {
    Material(MaterialDefinition),
    Texture(TextureDefinition),
}

impl AssetDefinition {
    /// Registry key of the definition.
    pub fn id(&self) -> &str {
        match self {
            Self::Material(m) => &m.id,
            Self::Texture(t) => &t.id,
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            Self::Material(m) => &m.name,
            Self::Texture(t) => &t.name,
        }
    }

    /// `material` or `texture`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Material(_) => "material",
            Self::Texture(_) => "texture",
        }
    }
}

/// Declarative asset manifest, as loaded from JSON content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetManifest {
    #[serde(default)]
    pub materials: Vec<MaterialSpec>,
    #[serde(default)]
    pub textures: Vec<TextureSpec>,
}

/// Registry of validated asset definitions keyed by stable string id.
///
/// # Invariants
/// - Ids are unique across all asset kinds.
/// - Definitions are never mutated or removed once registered.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    assets: BTreeMap<String, AssetDefinition>,
}

impl AssetRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a material spec, fill in defaults and register it.
    pub fn define_material(&mut self, spec: MaterialSpec) -> Result<&MaterialDefinition, AssetError> {
        self.check_new_id(&spec.id, &spec.name)?;
        if let Some(version) = spec.version {
            if version != MATERIAL_SCHEMA_VERSION {
                return Err(AssetError::InvalidDefinition {
                    id: spec.id,
                    reason: format!(
                        "unsupported schema version {version} (expected {MATERIAL_SCHEMA_VERSION})"
                    ),
                });
            }
        }
        let id = spec.id.clone();
        let material = MaterialDefinition::resolve(spec);
        tracing::debug!(
            id = %material.id,
            shader = %material.shader,
            fingerprint = material.fingerprint(),
            "material defined"
        );
        self.assets.insert(id.clone(), AssetDefinition::Material(material));
        self.material(&id)
    }

    /// Validate and register a texture definition.
    pub fn define_texture(&mut self, spec: TextureSpec) -> Result<&TextureDefinition, AssetError> {
        self.check_new_id(&spec.id, &spec.name)?;
        if spec.path.is_empty() {
            return Err(AssetError::InvalidDefinition {
                id: spec.id,
                reason: "texture path must not be empty".into(),
            });
        }
        let id = spec.id.clone();
        tracing::debug!(id = %spec.id, path = %spec.path, "texture defined");
        self.assets.insert(
            id.clone(),
            AssetDefinition::Texture(TextureDefinition {
                id: spec.id,
                name: spec.name,
                path: spec.path,
            }),
        );
        self.texture(&id)
    }

    /// Look up any asset by id.
    pub fn get(&self, id: &str) -> Result<&AssetDefinition, AssetError> {
        self.assets
            .get(id)
            .ok_or_else(|| AssetError::UnknownAssetId(id.to_string()))
    }

    /// Look up a material by id.
    pub fn material(&self, id: &str) -> Result<&MaterialDefinition, AssetError> {
        match self.get(id)? {
            AssetDefinition::Material(m) => Ok(m),
            other => Err(AssetError::KindMismatch {
                id: id.to_string(),
                expected: "material",
                found: other.kind(),
            }),
        }
    }

    /// Look up a texture by id.
    pub fn texture(&self, id: &str) -> Result<&TextureDefinition, AssetError> {
        match self.get(id)? {
            AssetDefinition::Texture(t) => Ok(t),
            other => Err(AssetError::KindMismatch {
                id: id.to_string(),
                expected: "texture",
                found: other.kind(),
            }),
        }
    }

    /// True if any asset is registered under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.assets.contains_key(id)
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    /// Every definition, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetDefinition> {
        self.assets.values()
    }

    /// Number of registered assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Register every definition in a manifest, textures first.
    ///
    /// Stops at the first invalid or duplicate entry; definitions registered
    /// before it stay registered. Returns the number registered.
    pub fn load_manifest(&mut self, manifest: AssetManifest) -> Result<usize, AssetError> {
        let mut count = 0;
        for texture in manifest.textures {
            self.define_texture(texture)?;
            count += 1;
        }
        for material in manifest.materials {
            self.define_material(material)?;
            count += 1;
        }
        tracing::info!(count, total = self.len(), "asset manifest loaded");
        Ok(count)
    }

    /// Parse a JSON manifest string and register its definitions.
    pub fn load_json_str(&mut self, json: &str) -> Result<usize, AssetError> {
        let manifest: AssetManifest = serde_json::from_str(json)?;
        self.load_manifest(manifest)
    }

    /// Read a JSON manifest from disk and register its definitions.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize, AssetError> {
        let file = std::fs::File::open(path.as_ref())?;
        let manifest: AssetManifest = serde_json::from_reader(std::io::BufReader::new(file))?;
        self.load_manifest(manifest)
    }

    /// Material ids whose texture slots reference assets that are not
    /// registered textures, as (material id, missing texture id) pairs.
    pub fn dangling_texture_refs(&self) -> Vec<(String, String)> {
        let mut dangling = Vec::new();
        for asset in self.assets.values() {
            if let AssetDefinition::Material(m) = asset {
                for (_, tex) in m.texture_refs() {
                    if self.texture(tex).is_err() {
                        dangling.push((m.id.clone(), tex.to_string()));
                    }
                }
            }
        }
        dangling
    }

    fn check_new_id(&self, id: &str, name: &str) -> Result<(), AssetError> {
        if id.is_empty() {
            return Err(AssetError::InvalidDefinition {
                id: String::new(),
                reason: "id must not be empty".into(),
            });
        }
        if name.is_empty() {
            return Err(AssetError::InvalidDefinition {
                id: id.to_string(),
                reason: "name must not be empty".into(),
            });
        }
        if self.assets.contains_key(id) {
            return Err(AssetError::DuplicateAssetId(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn define_material_with_defaults() {
        let mut registry = AssetRegistry::new();
        let m = registry.define_material(MaterialSpec::new("m", "M")).unwrap();
        assert_eq!(m.roughness, 0.7);
        assert_eq!(m.metalness, 0.0);
        assert_eq!(m.albedo_texture, "");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_material_keeps_first() {
        let mut registry = AssetRegistry::new();
        registry
            .define_material(MaterialSpec {
                roughness: Some(0.2),
                ..MaterialSpec::new("m", "First")
            })
            .unwrap();
        let err = registry
            .define_material(MaterialSpec::new("m", "Second"))
            .unwrap_err();
        assert!(matches!(err, AssetError::DuplicateAssetId(ref id) if id == "m"));

        let m = registry.material("m").unwrap();
        assert_eq!(m.name, "First");
        assert_eq!(m.roughness, 0.2);
    }

    #[test]
    fn empty_id_or_name_is_rejected() {
        let mut registry = AssetRegistry::new();
        assert!(matches!(
            registry.define_material(MaterialSpec::new("", "M")),
            Err(AssetError::InvalidDefinition { .. })
        ));
        assert!(matches!(
            registry.define_material(MaterialSpec::new("m", "")),
            Err(AssetError::InvalidDefinition { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn unsupported_schema_version_is_rejected() {
        let mut registry = AssetRegistry::new();
        let err = registry
            .define_material(MaterialSpec {
                version: Some(2),
                ..MaterialSpec::new("m", "M")
            })
            .unwrap_err();
        assert!(matches!(err, AssetError::InvalidDefinition { .. }));
    }

    #[test]
    fn unknown_id_fails() {
        let registry = AssetRegistry::new();
        assert!(matches!(
            registry.get("nope"),
            Err(AssetError::UnknownAssetId(ref id)) if id == "nope"
        ));
    }

    #[test]
    fn ids_are_unique_across_kinds() {
        let mut registry = AssetRegistry::new();
        registry
            .define_texture(TextureSpec {
                id: "bark".into(),
                name: "Bark".into(),
                path: "textures/bark.png".into(),
            })
            .unwrap();
        assert!(matches!(
            registry.define_material(MaterialSpec::new("bark", "Bark")),
            Err(AssetError::DuplicateAssetId(_))
        ));
        assert!(matches!(
            registry.material("bark"),
            Err(AssetError::KindMismatch { expected: "material", found: "texture", .. })
        ));
    }

    #[test]
    fn manifest_from_json() {
        let mut registry = AssetRegistry::new();
        let count = registry
            .load_json_str(
                r##"{
                    "textures": [{ "id": "grass", "name": "Grass", "path": "grass.png" }],
                    "materials": [
                        { "id": "forestground", "name": "Forest Ground", "color": "#3d2817", "roughness": 0.95 },
                        { "id": "lawn", "name": "Lawn", "albedoTexture": "grass" },
                        { "id": "rock", "name": "Rock", "normalTexture": "rock_n" }
                    ]
                }"##,
            )
            .unwrap();
        assert_eq!(count, 4);
        let ground = registry.material("forestground").unwrap();
        assert_eq!(ground.roughness, 0.95);
        assert_eq!(ground.color, "#3d2817");
        assert_eq!(
            registry.dangling_texture_refs(),
            vec![("rock".to_string(), "rock_n".to_string())]
        );
        let ids: Vec<&str> = registry.ids().collect();
        assert_eq!(ids, vec!["forestground", "grass", "lawn", "rock"]);
    }

    #[test]
    fn manifest_stops_at_duplicate() {
        let mut registry = AssetRegistry::new();
        let err = registry
            .load_json_str(r#"{ "materials": [{ "id": "a", "name": "A" }, { "id": "a", "name": "B" }] }"#)
            .unwrap_err();
        assert!(matches!(err, AssetError::DuplicateAssetId(_)));
        assert_eq!(registry.material("a").unwrap().name, "A");
    }

    #[test]
    fn load_manifest_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, r#"{{ "materials": [{{ "id": "m", "name": "M" }}] }}"#).unwrap();
        let mut registry = AssetRegistry::new();
        assert_eq!(registry.load_file(tmp.path()).unwrap(), 1);
        assert!(registry.contains("m"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut registry = AssetRegistry::new();
        assert!(matches!(
            registry.load_json_str("{ not json"),
            Err(AssetError::Json(_))
        ));
    }
}
