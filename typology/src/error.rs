use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypologyError {
    #[error("accumulator error: {0}")]
    Accumulator(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("dispatch error: {0}")]
    Dispatch(String),

    #[error("configuration error: {0}")]
    Config(String),
}
