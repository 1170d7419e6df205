use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("unable to read file: {0}")]
    Parse(String),

    #[error("'{0}' column not found in the uploaded file")]
    Schema(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<csv::Error> for IngestError {
    fn from(e: csv::Error) -> Self {
        IngestError::Parse(e.to_string())
    }
}

impl From<calamine::Error> for IngestError {
    fn from(e: calamine::Error) -> Self {
        IngestError::Parse(e.to_string())
    }
}

impl From<rusqlite::Error> for IngestError {
    fn from(e: rusqlite::Error) -> Self {
        IngestError::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
