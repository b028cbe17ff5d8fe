use std::fmt;

use orrery_common::EntityId;
use orrery_ecs::EcsError;

/// Lifecycle callback that was running when a script failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Update,
    Event,
    Destroy,
    Enable,
    Disable,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "on_start",
            Self::Update => "on_update",
            Self::Event => "on_event",
            Self::Destroy => "on_destroy",
            Self::Enable => "on_enable",
            Self::Disable => "on_disable",
        })
    }
}

/// Errors raised by scripts and by binding operations.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),
    #[error("entity {0} has no script binding")]
    NotBound(EntityId),
    #[error("unknown script kind `{0}`")]
    UnknownKind(String),
    #[error("script kind `{0}` is already registered")]
    DuplicateKind(String),
    #[error("invalid parameters for script `{kind}`: {reason}")]
    InvalidParams { kind: String, reason: String },
    /// Raised by script code.
    #[error("{0}")]
    Failed(String),
    /// A callback panicked; carries the panic message.
    #[error("script panicked: {0}")]
    Panicked(String),
    #[error(transparent)]
    Ecs(#[from] EcsError),
    #[error(transparent)]
    Callback(#[from] ScriptCallbackError),
}

impl ScriptError {
    /// Shorthand for [`ScriptError::Failed`].
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::Failed(message.to_string())
    }
}

/// An error raised inside a script callback, tagged with where it happened.
#[derive(Debug, thiserror::Error)]
#[error("{phase} failed for entity {entity}: {source}")]
pub struct ScriptCallbackError {
    pub entity: EntityId,
    pub phase: Phase,
    #[source]
    pub source: Box<ScriptError>,
}
