use thiserror::Error;

/// Failure of a REST call against the simulation service. Every variant is
/// recoverable; callers log it and keep their local state.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },
    #[error("unexpected response body: {0}")]
    Decode(#[from] sim_proto::DecodeError),
}
