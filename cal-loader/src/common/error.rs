use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("{0}")]
    Precondition(String),

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

impl From<cal_core::common::error::EtlError> for LoaderError {
    fn from(err: cal_core::common::error::EtlError) -> Self {
        LoaderError::Storage { message: err.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, LoaderError>;
