use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum CollectResponseCode {
    Ok = 1,
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CollectResponse {
    pub status: CollectResponseCode,
}

/// Pipeline errors. All of these are recovered at the smallest possible
/// scope (one processor, one batch item, one cycle) and never reach the
/// producers hitting the collect endpoint.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("unknown processor kind: {0}")]
    UnknownProcessorKind(String),

    #[error("unable to read collection configuration: {0}")]
    ConfigUnavailable(String),

    #[error("batch submission failed: {0}")]
    BatchSubmissionError(String),
}
