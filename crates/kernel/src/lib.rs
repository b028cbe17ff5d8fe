//! Engine kernel: owns the world, the asset and prefab registries, the script
//! runtime and the runtime store, and advances them one frame at a time.
//!
//! # Invariants
//! - All state mutations flow through explicit operations on [`Engine`].
//! - Each tick hands scripts a delta in `[0, max_delta_seconds]`.
//! - The [`EngineStore`] is owned by its engine; nothing global.
//! - World event logs are drained every tick into [`Engine::last_events`].

mod clock;
mod config;
mod engine;
mod error;
mod store;

pub use clock::{clamp_delta, FrameClock};
pub use config::{DebugConfig, EngineConfig};
pub use engine::{Engine, FrameEvents};
pub use error::EngineError;
pub use store::EngineStore;
