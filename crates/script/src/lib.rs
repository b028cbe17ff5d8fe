//! Per-frame script execution.
//!
//! Scripts are bound to entities and receive lifecycle callbacks from
//! [`ScriptRuntime::tick`]. Each callback gets an [`EntityHandle`] scoped to
//! its entity.
//!
//! # Invariants
//! - A binding gets exactly one `on_start` before any `on_update`, and at
//!   most one `on_update` per tick.
//! - Once a binding's entity is destroyed, the binding gets no further
//!   callbacks.
//! - A failing or panicking callback stops only its own binding.
//! - Events emitted during a tick are delivered on the next one, in
//!   ascending entity id order.

mod error;
mod event;
mod handle;
mod library;
mod runtime;
mod script;

pub use error::{Phase, ScriptCallbackError, ScriptError};
pub use event::ScriptEvent;
pub use handle::{EntityHandle, TimeInfo, TransformHandle};
pub use library::{Mover, Rotator, ScriptConstructor, ScriptLibrary};
pub use runtime::{BindSummary, BindingState, ScriptRuntime, TickReport};
pub use script::{from_fn, FnScript, Script};
