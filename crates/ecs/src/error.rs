use orrery_common::EntityId;

/// Errors from entity and component operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),
    #[error("cannot decode component `{tag}`: {source}")]
    Decode {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
}
