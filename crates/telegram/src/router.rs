//! Inbound event classification and the download pipeline behind it.
//!
//! The router is stateless per event: classify, optionally send a progress
//! notice, run fetch and store, then send exactly one terminal reply. Errors
//! end up in that reply, never at the caller.

use std::sync::Arc;

use {
    teledrop_storage::{SafeStorage, StoredFile},
    teloxide::types::ChatId,
    tracing::{error, info, warn},
};

use crate::{
    error::{Error, Result},
    fetch::{FetchPolicy, MediaFetcher},
    link::{MessageLocator, resolve_link},
    transport::{DownloadedFile, MediaDescriptor, Transport},
};

/// Progress notice for downloads where the attachment is already at hand.
pub const DOWNLOAD_NOTICE: &str = "⏳ Downloading file...";
/// Progress notice for the link pipeline, which has to find the message first.
pub const FETCH_NOTICE: &str = "⏳ Fetching message and downloading file...";

const DEFAULT_FILE_NAME: &str = "downloaded_file";
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Static help text, also appended to the unrecognized-command reply.
pub const HELP_TEXT: &str = concat!(
    "\n🔰 Available commands:\n",
    "/help - Show this help message\n",
    "/download [message link] - Download file from message link\n",
    "Example: /download https://t.me/channel/123\n",
    "\n",
    "💡 You can also:\n",
    "- Forward any message with media to me\n",
    "- Reply to any message with media using /download\n",
    "- Send me a direct message link\n",
);

/// A minimal, transport-agnostic view of one incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub chat: ChatId,
    pub has_sender: bool,
    pub text: Option<String>,
    pub media: Option<MediaDescriptor>,
    pub reply_to: Option<i32>,
}

/// What an inbound event asks the bot to do. Checked in declaration order:
/// sender, help commands, links anywhere in the text, `/download` handling,
/// attached media, and the fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No identifiable sender, nothing is answered.
    Ignore,
    /// Exactly `/start` or `/help`.
    Help,
    /// A resolvable message link somewhere in the text.
    Link(MessageLocator),
    /// `/download <argument>` where the argument is not a valid link.
    BadLink,
    /// Bare `/download` sent as a reply to another message.
    Reply { message_id: i32 },
    /// The event itself carries media.
    Attachment(MediaDescriptor),
    /// Bare `/download` with nothing to act on.
    NoTarget,
    /// Anything else gets the help text.
    Unrecognized,
}

/// Pure classification of one inbound event.
#[must_use]
pub fn classify(event: &InboundEvent) -> Classification {
    if !event.has_sender {
        return Classification::Ignore;
    }
    // Commands are matched on the raw text: "  /help  " is not a command.
    let text = event.text.as_deref().unwrap_or("");
    if text == "/start" || text == "/help" {
        return Classification::Help;
    }
    if let Some(locator) = resolve_link(text) {
        return Classification::Link(locator);
    }
    if let Some(argument) = text.strip_prefix("/download") {
        // A valid link in the argument would already have matched above.
        if !argument.trim().is_empty() {
            return Classification::BadLink;
        }
        return match event.reply_to {
            Some(message_id) => Classification::Reply { message_id },
            None => Classification::NoTarget,
        };
    }
    if let Some(descriptor) = &event.media {
        return Classification::Attachment(descriptor.clone());
    }
    Classification::Unrecognized
}

/// Stateless command router over a [`Transport`].
pub struct Router {
    transport: Arc<dyn Transport>,
    fetcher: MediaFetcher,
    storage: SafeStorage,
}

impl Router {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, policy: FetchPolicy, storage: SafeStorage) -> Self {
        let fetcher = MediaFetcher::new(Arc::clone(&transport), policy);
        Self { transport, fetcher, storage }
    }

    /// Handle one inbound event end to end: at most one progress notice,
    /// exactly one terminal reply unless the event is ignored.
    pub async fn handle_event(&self, event: &InboundEvent) {
        let chat = event.chat;
        let reply = match classify(event) {
            Classification::Ignore => return,
            Classification::Help => HELP_TEXT.to_string(),
            Classification::Link(locator) => {
                self.notify(chat, FETCH_NOTICE).await;
                conclude(self.download_by_locator(chat, &locator).await)
            },
            Classification::BadLink => error_reply(&Error::InvalidLink),
            Classification::Reply { message_id } => {
                self.notify(chat, DOWNLOAD_NOTICE).await;
                conclude(self.download_reply(chat, message_id).await)
            },
            Classification::Attachment(descriptor) => {
                self.notify(chat, DOWNLOAD_NOTICE).await;
                conclude(self.download_descriptor(&descriptor).await)
            },
            Classification::NoTarget => error_reply(&Error::NoMediaFound),
            Classification::Unrecognized => {
                format!("I don't understand that command.\n{HELP_TEXT}")
            },
        };
        if let Err(err) = self.transport.send_reply(chat, &reply).await {
            error!(chat_id = chat.0, error = %err, "failed to send reply");
        }
    }

    async fn download_by_locator(
        &self,
        chat: ChatId,
        locator: &MessageLocator,
    ) -> Result<StoredFile> {
        let file = self.fetcher.fetch_by_locator(chat, locator).await?;
        self.store(file)
    }

    async fn download_reply(&self, chat: ChatId, message_id: i32) -> Result<StoredFile> {
        let file = self.fetcher.fetch_reply(chat, message_id).await?;
        self.store(file)
    }

    async fn download_descriptor(&self, descriptor: &MediaDescriptor) -> Result<StoredFile> {
        let file = self.fetcher.fetch_by_descriptor(descriptor).await?;
        self.store(file)
    }

    fn store(&self, file: DownloadedFile) -> Result<StoredFile> {
        let name = file.file_name.as_deref().unwrap_or(DEFAULT_FILE_NAME);
        let mime = file.mime_type.as_deref().unwrap_or(DEFAULT_MIME_TYPE);
        let stored = self.storage.save(&file.content, name, mime)?;
        info!(
            filename = %stored.filename,
            size = stored.size,
            mime = %stored.mime_type,
            "file stored"
        );
        Ok(stored)
    }

    /// Progress notices are best effort: a failed send is logged and the
    /// pipeline continues.
    async fn notify(&self, chat: ChatId, text: &str) {
        if let Err(err) = self.transport.send_reply(chat, text).await {
            warn!(chat_id = chat.0, error = %err, "failed to send progress notice");
        }
    }
}

fn conclude(outcome: Result<StoredFile>) -> String {
    match outcome {
        Ok(stored) => success_reply(&stored),
        Err(err) => error_reply(&err),
    }
}

fn success_reply(stored: &StoredFile) -> String {
    format!(
        "✅ File downloaded successfully!\n\n📁 Filename: {}\n📦 Size: {}\n🔗 Download URL: {}",
        stored.filename,
        human_size(stored.size),
        stored.url
    )
}

/// Total mapping from pipeline errors to terminal reply text. Invalid links
/// already read as a full sentence, every other error gets the generic
/// prefix.
fn error_reply(error: &Error) -> String {
    match error {
        Error::InvalidLink => format!("❌ {error}"),
        _ => format!("❌ Error: {error}"),
    }
}

/// Format a byte count in binary units, capped at GB, rounded to two
/// decimals with trailing zeros trimmed.
#[must_use]
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let exponent = (((bytes as f64).ln() / 1024_f64.ln()).floor() as usize).min(UNITS.len() - 1);
    let value = bytes as f64 / 1024_f64.powi(exponent as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[exponent])
}

// ── tests ───────────────────────────────────────────────────────────────────
