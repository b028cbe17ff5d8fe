//! Prefabs: named templates that spawn fully populated entities.
//!
//! A prefab is either a code factory registered with
//! [`PrefabRegistry::register`] or a [`PrefabDefinition`] loaded from content.
//! Instantiation is all-or-nothing: a failed factory never leaves a partially
//! built entity behind.

mod definition;
mod error;
mod registry;

pub use definition::{apply_override_patch, PrefabDefinition, PrefabEntity};
pub use error::PrefabError;
pub use registry::{PrefabFactory, PrefabRegistry};
