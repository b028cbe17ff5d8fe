use orrery_common::EntityId;
use orrery_ecs::EcsError;

/// Errors from prefab registration and instantiation.
#[derive(Debug, thiserror::Error)]
pub enum PrefabError {
    #[error("prefab id `{0}` is already registered")]
    DuplicatePrefabId(String),
    #[error("unknown prefab id `{0}`")]
    UnknownPrefabId(String),
    #[error("invalid prefab definition `{id}`: {reason}")]
    InvalidDefinition { id: String, reason: String },
    #[error("prefab `{prefab}` returned entity {entity} which is not live")]
    DeadEntity { prefab: String, entity: EntityId },
    #[error(transparent)]
    Ecs(#[from] EcsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
