use std::fmt;

use crate::store::StoreError;

pub mod config;
pub mod connection_service;
pub mod discovery_service;
pub mod match_service;
pub mod quota_service;
pub mod viewed_cache;

/// Failures the engine surfaces to the route layer.
#[derive(Debug)]
pub enum EngineError {
    /// The acting user is out of daily actions, or the quota state could
    /// not be confirmed; callers cannot tell which.
    QuotaExceeded,
    InvalidInput(String),
    Store(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::QuotaExceeded => write!(f, "daily action limit reached"),
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            EngineError::Store(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::Store(err.to_string())
    }
}
