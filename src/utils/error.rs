use thiserror::Error;

#[derive(Error, Debug)]
pub enum FederationError {
    #[error("[{component}] {message}")]
    ConfigError {
        component: &'static str,
        message: String,
    },

    #[error("Processing error: {message}")]
    ProcessingError { message: String },

    #[error("Source error: {message}")]
    SourceError { message: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FederationError>;
