use thiserror::Error;

/// Storage failures. `Display` strings are user-facing: the bot embeds them
/// verbatim in its error replies.
#[derive(Debug, Error)]
pub enum Error {
    #[error("File size exceeds the maximum allowed size.")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("File type not allowed.")]
    MimeTypeRejected { mime: String },

    #[error("Failed to save file.")]
    WriteFailed(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
