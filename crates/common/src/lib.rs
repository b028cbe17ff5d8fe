//! Shared types used by every orrery crate.

mod types;

pub use types::{EntityId, Transform};
