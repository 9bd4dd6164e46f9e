use coordkit_traits::LocationError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("transform failed: {0}")]
    TransformFailure(String),
    #[error("position unavailable: {0}")]
    PositionUnavailable(String),
    #[error("location provider error: {0}")]
    Provider(LocationError),
    #[error("session cancelled")]
    Cancelled,
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("unknown CRS: {0}")]
    UnknownCrs(String),
    #[error("record not found: {0}")]
    RecordNotFound(String),
}

impl From<LocationError> for CoordError {
    fn from(e: LocationError) -> Self {
        Self::Provider(e)
    }
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
