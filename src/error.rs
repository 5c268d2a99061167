// Error types for the montra client.
// Covers rate limiting, transport failures, and cache serialization errors.

#![allow(dead_code)]

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MontraError {
    #[error("rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl MontraError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            MontraError::Status(code) => Some(*code),
            MontraError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MontraError>;
