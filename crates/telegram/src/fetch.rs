//! Media retrieval with a per-attempt timeout and bounded retry for
//! transient transport failures.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use {
    teledrop_config::FetchSettings,
    teloxide::types::ChatId,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    link::MessageLocator,
    transport::{DownloadedFile, MediaDescriptor, Transport},
};

/// Timeout and retry knobs, decoupled from the config crate so tests can
/// use aggressive values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Upper bound for a single transport round-trip.
    pub timeout: Duration,
    /// Extra attempts after a transient failure.
    pub retries: u32,
}

impl From<FetchSettings> for FetchPolicy {
    fn from(settings: FetchSettings) -> Self {
        Self { timeout: settings.timeout(), retries: settings.retries }
    }
}

/// Drives [`Transport`] calls under a [`FetchPolicy`].
pub struct MediaFetcher {
    transport: Arc<dyn Transport>,
    policy: FetchPolicy,
}

impl MediaFetcher {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, policy: FetchPolicy) -> Self {
        Self { transport, policy }
    }

    /// Look up a linked message and download its attachment.
    pub async fn fetch_by_locator(
        &self,
        origin: ChatId,
        locator: &MessageLocator,
    ) -> Result<DownloadedFile> {
        let message = self.run(|| self.transport.lookup_message(origin, locator)).await?;
        let descriptor = message.media.ok_or(Error::NoMediaFound)?;
        self.fetch_by_descriptor(&descriptor).await
    }

    /// Download the attachment of the message a user replied to.
    pub async fn fetch_reply(&self, chat: ChatId, message_id: i32) -> Result<DownloadedFile> {
        let ids = [message_id];
        let messages = self.run(|| self.transport.messages_by_id(chat, &ids)).await?;
        let descriptor = messages
            .into_iter()
            .next()
            .and_then(|message| message.media)
            .ok_or(Error::NoMediaFound)?;
        self.fetch_by_descriptor(&descriptor).await
    }

    /// Download the payload behind a descriptor the requesting message
    /// already carried.
    pub async fn fetch_by_descriptor(&self, descriptor: &MediaDescriptor) -> Result<DownloadedFile> {
        let file = self.run(|| self.transport.download_media(descriptor)).await?;
        if file.content.is_empty() {
            return Err(Error::DownloadFailed);
        }
        debug!(file_id = %descriptor.file_id, bytes = file.content.len(), "media fetched");
        Ok(file)
    }

    /// One transport call per attempt: each attempt races the policy timeout,
    /// and transient failures are retried with a linearly growing pause.
    /// `Timeout` itself is terminal.
    async fn run<'a, T, F>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let outcome = match tokio::time::timeout(self.policy.timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout),
            };
            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.policy.retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.policy.retries,
                        error = %err,
                        "transient fetch failure, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(250 * u64::from(attempt))).await;
                },
                Err(err) => return Err(err),
            }
        }
    }
}

// ── tests ───────────────────────────────────────────────────────────────────

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use {async_trait::async_trait, teloxide::RequestError};

    use super::*;
    use crate::transport::RemoteMessage;

    fn descriptor() -> MediaDescriptor {
        MediaDescriptor {
            file_id: "file-abc".into(),
            file_name: Some("report.pdf".into()),
            mime_type: Some("application/pdf".into()),
        }
    }

    fn transient_error() -> Error {
        Error::Telegram(RequestError::Io(std::io::Error::other("socket closed")))
    }

    struct ScriptedTransport {
        media: Option<MediaDescriptor>,
        payload: Vec<u8>,
        transient_failures: AtomicUsize,
        hard_failure: bool,
        download_delay: Duration,
        lookup_calls: AtomicUsize,
        download_calls: AtomicUsize,
    }

    impl Default for ScriptedTransport {
        fn default() -> Self {
            Self {
                media: Some(descriptor()),
                payload: b"payload".to_vec(),
                transient_failures: AtomicUsize::new(0),
                hard_failure: false,
                download_delay: Duration::ZERO,
                lookup_calls: AtomicUsize::new(0),
                download_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn lookup_message(
            &self,
            _origin: ChatId,
            _locator: &MessageLocator,
        ) -> Result<RemoteMessage> {
            self.lookup_calls.fetch_add(1, Ordering::SeqCst);
            Ok(RemoteMessage { media: self.media.clone() })
        }

        async fn messages_by_id(&self, _chat: ChatId, ids: &[i32]) -> Result<Vec<RemoteMessage>> {
            Ok(ids.iter().map(|_| RemoteMessage { media: self.media.clone() }).collect())
        }

        async fn download_media(&self, descriptor: &MediaDescriptor) -> Result<DownloadedFile> {
            self.download_calls.fetch_add(1, Ordering::SeqCst);
            if !self.download_delay.is_zero() {
                tokio::time::sleep(self.download_delay).await;
            }
            if self.hard_failure {
                return Err(Error::DownloadFailed);
            }
            let remaining = self.transient_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.transient_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(transient_error());
            }
            Ok(DownloadedFile {
                content: self.payload.clone(),
                file_name: descriptor.file_name.clone(),
                mime_type: descriptor.mime_type.clone(),
            })
        }

        async fn send_reply(&self, _chat: ChatId, _text: &str) -> Result<()> {
            Ok(())
        }
    }

    fn fetcher(transport: Arc<ScriptedTransport>, retries: u32) -> MediaFetcher {
        fetcher_with_timeout(transport, Duration::from_secs(1), retries)
    }

    fn fetcher_with_timeout(
        transport: Arc<ScriptedTransport>,
        timeout: Duration,
        retries: u32,
    ) -> MediaFetcher {
        MediaFetcher::new(transport, FetchPolicy { timeout, retries })
    }

    #[tokio::test]
    async fn locator_fetch_downloads_the_attachment() {
        let transport = Arc::new(ScriptedTransport::default());
        let locator = MessageLocator { scope: "channel".into(), message_id: 5 };

        let file = fetcher(Arc::clone(&transport), 0)
            .fetch_by_locator(ChatId(1), &locator)
            .await
            .unwrap();

        assert_eq!(file.content, b"payload");
        assert_eq!(file.file_name.as_deref(), Some("report.pdf"));
        assert_eq!(transport.lookup_calls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.download_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lookup_without_media_never_downloads() {
        let transport = Arc::new(ScriptedTransport { media: None, ..Default::default() });
        let locator = MessageLocator { scope: "channel".into(), message_id: 5 };

        let err = fetcher(Arc::clone(&transport), 0)
            .fetch_by_locator(ChatId(1), &locator)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoMediaFound), "got {err:?}");
        assert_eq!(transport.download_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reply_fetch_downloads_the_attachment() {
        let transport = Arc::new(ScriptedTransport::default());

        let file = fetcher(transport, 0).fetch_reply(ChatId(1), 42).await.unwrap();

        assert_eq!(file.content, b"payload");
    }

    #[tokio::test]
    async fn empty_payload_is_a_download_failure() {
        let transport = Arc::new(ScriptedTransport { payload: Vec::new(), ..Default::default() });

        let err = fetcher(transport, 0).fetch_by_descriptor(&descriptor()).await.unwrap_err();

        assert!(matches!(err, Error::DownloadFailed), "got {err:?}");
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let transport = Arc::new(ScriptedTransport {
            transient_failures: AtomicUsize::new(2),
            ..Default::default()
        });

        let file = fetcher(Arc::clone(&transport), 2)
            .fetch_by_descriptor(&descriptor())
            .await
            .unwrap();

        assert_eq!(file.content, b"payload");
        assert_eq!(transport.download_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_exhausted_surface_the_last_error() {
        let transport = Arc::new(ScriptedTransport {
            transient_failures: AtomicUsize::new(5),
            ..Default::default()
        });

        let err = fetcher(Arc::clone(&transport), 2)
            .fetch_by_descriptor(&descriptor())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Telegram(_)), "got {err:?}");
        assert_eq!(transport.download_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_failure_is_not_retried() {
        let transport =
            Arc::new(ScriptedTransport { hard_failure: true, ..Default::default() });

        let err = fetcher(Arc::clone(&transport), 2)
            .fetch_by_descriptor(&descriptor())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DownloadFailed), "got {err:?}");
        assert_eq!(transport.download_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_transport_times_out_without_retry() {
        let transport = Arc::new(ScriptedTransport {
            download_delay: Duration::from_millis(200),
            ..Default::default()
        });

        let err = fetcher_with_timeout(Arc::clone(&transport), Duration::from_millis(50), 2)
            .fetch_by_descriptor(&descriptor())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout), "got {err:?}");
        assert_eq!(transport.download_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn policy_follows_the_configured_settings() {
        let policy = FetchPolicy::from(FetchSettings { timeout_secs: 90, retries: 4 });

        assert_eq!(policy.timeout, Duration::from_secs(90));
        assert_eq!(policy.retries, 4);
    }
}
