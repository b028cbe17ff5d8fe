/// Errors from asset registration and lookup.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset id `{0}` is already registered")]
    DuplicateAssetId(String),
    #[error("unknown asset id `{0}`")]
    UnknownAssetId(String),
    #[error("invalid asset definition `{id}`: {reason}")]
    InvalidDefinition { id: String, reason: String },
    #[error("asset `{id}` is a {found}, not a {expected}")]
    KindMismatch {
        id: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
