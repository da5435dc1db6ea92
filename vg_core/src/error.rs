/// Core error type for vigil
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Acquisition error: {0}")]
    Acquisition(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("External error: {0}")]
    External(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
