use thiserror::Error;

/// Result type local to cepctx-exec.
pub type Result<T> = std::result::Result<T, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Core(#[from] cepctx_core::error::Error),

    #[error("engine rejected extension '{name}': {reason}")]
    Extension { name: String, reason: String },

    #[error("engine rejected program: {0}")]
    Program(String),
}
