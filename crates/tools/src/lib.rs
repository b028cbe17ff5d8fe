//! Developer tooling: read-only inspection of a running engine plus the
//! debug toggles presentation layers flip.
//!
//! # Invariants
//! - The inspector never mutates the world; only store toggles are writable.

pub mod inspector;

pub use inspector::{ComponentInfo, EngineSummary, EntityInfo, Inspector, ScriptInfo};
