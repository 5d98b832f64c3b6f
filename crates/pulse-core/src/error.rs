//! Error types for Pulse Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid extraction pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("No records to process")]
    EmptyInput,
}

pub type PulseResult<T> = Result<T, PulseError>;
