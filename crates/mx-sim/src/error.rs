//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered while configuring or stepping the process simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-physical condition: {what}")]
    NonPhysical { what: &'static str },

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl From<mx_controls::ControlError> for SimError {
    fn from(e: mx_controls::ControlError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<mx_core::MxError> for SimError {
    fn from(e: mx_core::MxError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}
