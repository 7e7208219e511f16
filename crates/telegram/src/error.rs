use thiserror::Error;

/// Pipeline failures. `Display` strings double as the user-facing text the
/// router embeds in error replies.
#[derive(Debug, Error)]
pub enum Error {
    /// A `/download` argument that does not parse as a message link.
    #[error("Invalid message link format. Use format: https://t.me/channel/123")]
    InvalidLink,

    /// The referenced message exists but carries nothing downloadable.
    #[error("No file found in the message")]
    NoMediaFound,

    /// The transport produced an empty payload.
    #[error("Failed to download the file")]
    DownloadFailed,

    /// A transport round-trip exceeded the configured bound.
    #[error("Download timed out")]
    Timeout,

    #[error(transparent)]
    Storage(#[from] teledrop_storage::Error),

    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether a retry could plausibly succeed. Only transport-level
    /// network and IO failures qualify; everything else is deterministic.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Telegram(err) => matches!(
                err,
                teloxide::RequestError::Network(_) | teloxide::RequestError::Io(_)
            ),
            Self::Http(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
