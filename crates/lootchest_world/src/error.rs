use std::path::PathBuf;

use lootchest_assets::AssetError;

#[derive(Debug, thiserror::Error)]
pub enum ChestError {
    #[error("no model named '{0}' among the loaded resources")]
    UnknownModel(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ExperienceError {
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("required model '{0}' was not loaded")]
    MissingModel(String),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Chest(#[from] ChestError),
}
