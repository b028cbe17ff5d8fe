//! Declarative asset definitions.
//!
//! Content describes materials and textures as plain records. The
//! [`AssetRegistry`] validates each record once, fills in documented defaults
//! and keeps the resulting immutable definition under its string id for the
//! life of the process. Components refer to assets by that id and resolve it
//! lazily.
//!
//! # Invariants
//! - Asset ids are unique within a registry.
//! - Registration validates shape and fills defaults; it never clamps values.

mod error;
mod material;
mod registry;

pub use error::AssetError;
pub use material::{parse_hex_color, MaterialDefinition, MaterialSpec, MATERIAL_SCHEMA_VERSION};
pub use registry::{AssetDefinition, AssetManifest, AssetRegistry, TextureDefinition, TextureSpec};
