use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentSyncError {
    #[error("Malformed content manifest {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    #[error("Duplicate channel '{channel_id}' in extension '{extension_id}'")]
    DuplicateChannel {
        extension_id: String,
        channel_id: String,
    },

    #[error("Content operation failed with exit code {code}: {operation}")]
    OperationFailed { operation: String, code: i32 },

    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported cache format in {path}: {message}")]
    CacheFormat { path: PathBuf, message: String },

    #[error("Config parse error in {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Home directory not found")]
    HomeNotFound,
}

pub type Result<T> = std::result::Result<T, ContentSyncError>;

impl ContentSyncError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ManifestParse { .. } | Self::DuplicateChannel { .. } => 2,
            Self::OperationFailed { code, .. } if *code != 0 => *code,
            Self::Launch { .. } => 127,
            Self::ConfigParse { .. } => 3,
            _ => 1,
        }
    }
}
