use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Catalog sources disagree with each other or with the encoder.
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Ranker and catalog are out of sync.
    #[error("Index {index} out of range for catalog of {len} songs")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Query is empty")]
    EmptyQuery,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
