use orrery_assets::AssetError;
use orrery_common::EntityId;
use orrery_ecs::EcsError;
use orrery_prefab::PrefabError;
use orrery_script::ScriptError;

/// Any error surfaced by the engine facade.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Ecs(#[from] EcsError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Prefab(#[from] PrefabError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("entity {0} has no material reference")]
    NoMaterial(EntityId),
    #[error("engine store not initialized")]
    StoreNotInitialized,
    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
