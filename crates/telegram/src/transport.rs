//! Transport seam: what the pipeline needs from the messaging network,
//! plus the teloxide-backed implementation.

use std::{future::Future, time::Duration};

use {
    async_trait::async_trait,
    teloxide::{
        Bot, RequestError,
        payloads::{ForwardMessageSetters, SendMessageSetters},
        prelude::*,
        types::{ChatId, MessageId, ParseMode, Recipient},
    },
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    handlers,
    link::MessageLocator,
};

/// Opaque handle to a not-yet-downloaded attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescriptor {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

/// Downloaded payload plus the naming metadata the storage layer wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub content: Vec<u8>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

/// A remote message reduced to what the pipeline cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMessage {
    pub media: Option<MediaDescriptor>,
}

/// Everything the download pipeline needs from the network. The router and
/// fetcher only ever talk to this trait; tests substitute scripted
/// implementations.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Resolve a deep-link locator to the message it references.
    async fn lookup_message(
        &self,
        origin: ChatId,
        locator: &MessageLocator,
    ) -> Result<RemoteMessage>;

    /// Fetch messages of `chat` by id (used for reply targets).
    async fn messages_by_id(&self, chat: ChatId, ids: &[i32]) -> Result<Vec<RemoteMessage>>;

    /// Download the payload behind a descriptor.
    async fn download_media(&self, descriptor: &MediaDescriptor) -> Result<DownloadedFile>;

    /// Send an HTML-formatted message to `chat`.
    async fn send_reply(&self, chat: ChatId, text: &str) -> Result<()>;
}

/// Bot API transport.
///
/// The Bot API has no direct message-lookup call, so both lookup paths
/// silently forward the referenced message into the requesting chat, read
/// the attachment off the forwarded copy, and delete the copy again (best
/// effort). This is the bot-side equivalent of a user session's
/// `channels.getMessages`.
///
/// File payloads are fetched over the transport's own HTTP client; the
/// bot's internal client only speaks the method endpoints.
pub struct TelegramTransport {
    bot: Bot,
    http: reqwest::Client,
}

impl TelegramTransport {
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot, http: reqwest::Client::new() }
    }

    async fn probe_message(
        &self,
        origin: ChatId,
        source: Recipient,
        message_id: i32,
    ) -> Result<RemoteMessage> {
        let forwarded = self
            .bot
            .forward_message(origin, source, MessageId(message_id))
            .disable_notification(true)
            .await?;
        let media = handlers::media_descriptor(&forwarded);
        debug!(
            chat_id = origin.0,
            message_id,
            has_media = media.is_some(),
            "probed remote message"
        );
        if let Err(err) = self.bot.delete_message(origin, forwarded.id).await {
            debug!(chat_id = origin.0, error = %err, "could not delete probe forward");
        }
        Ok(RemoteMessage { media })
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn lookup_message(
        &self,
        origin: ChatId,
        locator: &MessageLocator,
    ) -> Result<RemoteMessage> {
        let source = source_recipient(&locator.scope)?;
        self.probe_message(origin, source, locator.message_id).await
    }

    async fn messages_by_id(&self, chat: ChatId, ids: &[i32]) -> Result<Vec<RemoteMessage>> {
        let mut messages = Vec::with_capacity(ids.len());
        for id in ids {
            messages.push(self.probe_message(chat, Recipient::Id(chat), *id).await?);
        }
        Ok(messages)
    }

    async fn download_media(&self, descriptor: &MediaDescriptor) -> Result<DownloadedFile> {
        let file = self.bot.get_file(descriptor.file_id.as_str()).await?;
        // <api_url>/file/bot<token>/<file_path>, honouring custom API urls.
        let base = self.bot.api_url();
        let url = format!(
            "{}/file/bot{}/{}",
            base.as_str().trim_end_matches('/'),
            self.bot.token(),
            file.path
        );
        let response = self.http.get(&url).send().await?.error_for_status()?;
        let content = response.bytes().await?.to_vec();
        debug!(file_id = %descriptor.file_id, bytes = content.len(), "downloaded media payload");
        Ok(DownloadedFile {
            content,
            file_name: descriptor.file_name.clone(),
            mime_type: descriptor.mime_type.clone(),
        })
    }

    async fn send_reply(&self, chat: ChatId, text: &str) -> Result<()> {
        let html = run_with_rate_limit_retry("send message (html)", || {
            let request = self.bot.send_message(chat, text).parse_mode(ParseMode::Html);
            async move { request.await }
        })
        .await;
        if let Err(err) = html {
            warn!(chat_id = chat.0, error = %err, "HTML send failed, retrying as plain text");
            run_with_rate_limit_retry("send message (plain)", || {
                let request = self.bot.send_message(chat, text);
                async move { request.await }
            })
            .await?;
        }
        Ok(())
    }
}

/// A fully numeric scope comes from a private `t.me/c/<id>/<n>` link and
/// maps to the `-100`-prefixed chat id; anything else is a public
/// `@username`.
fn source_recipient(scope: &str) -> Result<Recipient> {
    if !scope.is_empty() && scope.chars().all(|ch| ch.is_ascii_digit()) {
        let id: i64 = format!("-100{scope}").parse().map_err(|_| Error::InvalidLink)?;
        Ok(Recipient::Id(ChatId(id)))
    } else {
        Ok(Recipient::ChannelUsername(format!("@{scope}")))
    }
}

const RATE_LIMIT_MAX_RETRIES: usize = 4;

/// Re-issue a request while Telegram answers with `RetryAfter`, waiting the
/// advertised duration between attempts.
async fn run_with_rate_limit_retry<T, F, Fut>(
    operation: &'static str,
    mut request: F,
) -> std::result::Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, RequestError>>,
{
    let mut retries = 0usize;
    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let Some(wait) = retry_after_duration(&err) else {
                    return Err(err);
                };
                if retries >= RATE_LIMIT_MAX_RETRIES {
                    warn!(
                        operation,
                        retries,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limit persisted after retries"
                    );
                    return Err(err);
                }
                retries += 1;
                warn!(
                    operation,
                    retries,
                    retry_after_secs = wait.as_secs(),
                    "telegram rate limited, waiting before retry"
                );
                tokio::time::sleep(wait).await;
            },
        }
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

// ── tests ───────────────────────────────────────────────────────────────────

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_scope_maps_to_private_channel_id() {
        let recipient = source_recipient("123456").unwrap();
        assert!(matches!(recipient, Recipient::Id(ChatId(-100_123_456))));
    }

    #[test]
    fn username_scope_maps_to_public_channel() {
        let recipient = source_recipient("rustlang").unwrap();
        assert!(matches!(recipient, Recipient::ChannelUsername(name) if name == "@rustlang"));
    }

    #[test]
    fn oversized_numeric_scope_is_rejected() {
        let err = source_recipient("99999999999999999999999999").unwrap_err();
        assert!(matches!(err, Error::InvalidLink), "got {err:?}");
    }

    #[test]
    fn retry_after_duration_extracts_wait() {
        let err = RequestError::RetryAfter(teloxide::types::Seconds::from_seconds(42));
        assert_eq!(retry_after_duration(&err), Some(Duration::from_secs(42)));
    }

    #[test]
    fn retry_after_duration_ignores_other_errors() {
        let err = RequestError::Io(std::io::Error::other("boom"));
        assert_eq!(retry_after_duration(&err), None);
    }
}
