use reqwest::StatusCode;
use thiserror::Error;

/// Errors encountered while optimizing a trip. No partial successes: any
/// failure aborts the caller's operation.
#[derive(Debug, Error)]
pub enum TripError {
    #[error("routing engine unreachable: {0}")]
    Network(reqwest::Error),
    #[error("routing engine answered HTTP {0}")]
    NonOkStatus(StatusCode),
    #[error("routing engine response could not be decoded: {0}")]
    Decode(String),
    #[error("routing engine rejected the trip with code {0:?}")]
    EngineCode(String),
    #[error("a trip needs at least one point")]
    NoPoints,
}

impl From<reqwest::Error> for TripError {
    fn from(err: reqwest::Error) -> Self {
        TripError::Network(err)
    }
}
