//! Entity/component model for the orrery runtime.
//!
//! An [`EntityIndex`] tracks which ids are live, a [`ComponentStore`] maps
//! (entity, tag) to a [`Component`] payload, and [`World`] owns both so the
//! destruction path can keep them consistent.
//!
//! # Invariants
//! - Components are only written for live entities.
//! - Destroying an entity removes its components before its id.
//! - Component iteration order is deterministic (BTreeMap).

mod component;
mod entity;
mod error;
mod world;

pub use component::{tags, Component, ComponentEvent, ComponentStore, MeshRenderer, ScriptComponent};
pub use entity::EntityIndex;
pub use error::EcsError;
pub use world::{EventMark, World, WorldEvent};
