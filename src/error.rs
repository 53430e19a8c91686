use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnonError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cannot read recently closed list {}: {source}", path.display())]
    StorageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not an anonymous file: {}", .0.display())]
    NotTracked(PathBuf),
}

impl From<toml::de::Error> for AnonError {
    fn from(err: toml::de::Error) -> Self {
        AnonError::Configuration(format!("Failed to parse settings: {}", err))
    }
}

impl From<toml::ser::Error> for AnonError {
    fn from(err: toml::ser::Error) -> Self {
        AnonError::Configuration(format!("Failed to serialize settings: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AnonError>;
