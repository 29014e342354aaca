//! CLI error type.

use thiserror::Error;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Config error: {0}")]
    Project(#[from] mx_project::ProjectError),

    #[error("Simulation error: {0}")]
    Sim(#[from] mx_sim::SimError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },
}
