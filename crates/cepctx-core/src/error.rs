use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A required argument was missing (empty or blank text).
    #[error("required argument '{0}' is absent")]
    NullArgument(&'static str),

    #[error("Input stream: {0} is not found")]
    UndefinedStream(String),

    #[error("Execution plan: {0} is not found")]
    UndefinedPlan(String),

    /// A required setting was read before it was configured.
    #[error("{0} is not set")]
    PreconditionUnset(&'static str),

    #[error("Invalid context descriptor: {0}")]
    Descriptor(String),
}

/// Fail with `NullArgument` when `value` carries no text.
pub fn require_text(value: &str, arg: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::NullArgument(arg))
    } else {
        Ok(())
    }
}
