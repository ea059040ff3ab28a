use thiserror::Error;

/// Failures that stop the control loop.
///
/// Channel read and write problems are not here: the loop logs them and keeps
/// running. These are the conditions it cannot recover from.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error(transparent)]
    State(#[from] gatekeeper_core::Error),

    #[error("Console I/O error: {0}")]
    Console(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ControlError>;
