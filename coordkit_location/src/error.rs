use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("fixture contains no fixes")]
    EmptyFixture,
    #[error("emit interval must be > 0")]
    ZeroInterval,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProviderError>;
