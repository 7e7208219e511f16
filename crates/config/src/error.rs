use thiserror::Error;

/// Errors raised while assembling [`Settings`](crate::Settings) from the
/// environment.
#[derive(Debug, Error)]
pub enum Error {
    /// A required variable is absent or blank.
    #[error("missing required environment variable {name}")]
    MissingVar { name: &'static str },

    /// A variable is present but its value cannot be used.
    #[error("invalid value for {name}: {reason}")]
    InvalidVar { name: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
