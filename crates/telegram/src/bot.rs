//! Bot construction and the long-polling update loop.

use std::time::Duration;

use {
    secrecy::ExposeSecret,
    teledrop_config::TelegramSettings,
    teloxide::{
        ApiError, Bot, RequestError,
        payloads::GetUpdatesSetters,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{error::Result, handlers, router::Router};

const LONG_POLL_TIMEOUT_SECS: u32 = 30;
// Must exceed the long-poll window or every idle getUpdates call times out.
const HTTP_TIMEOUT: Duration = Duration::from_secs(45);
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Build a [`Bot`] with an HTTP client whose timeout comfortably exceeds
/// the long-poll window.
pub fn build_bot(settings: &TelegramSettings) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(RequestError::Network)?;
    Ok(Bot::with_client(settings.bot_token.expose_secret().as_str(), client))
}

/// Start the long-polling loop on a background task.
///
/// The returned token stops the loop when cancelled; the loop also cancels
/// itself when another getUpdates consumer takes over the token.
pub async fn start_polling(bot: Bot, router: Router) -> Result<CancellationToken> {
    let me = bot.get_me().await?;
    info!(username = %me.username(), "telegram bot connected");

    // Long polling and webhooks are mutually exclusive.
    bot.delete_webhook().send().await?;

    let commands = vec![
        BotCommand::new("help", "Show available commands"),
        BotCommand::new("download", "Download file from a message link or reply"),
    ];
    if let Err(err) = bot.set_my_commands(commands).await {
        warn!(error = %err, "failed to register bot commands");
    }

    let token = CancellationToken::new();
    let loop_token = token.clone();
    tokio::spawn(async move {
        poll_updates(bot, router, loop_token).await;
    });
    Ok(token)
}

async fn poll_updates(bot: Bot, router: Router, token: CancellationToken) {
    let mut offset: i32 = 0;
    info!("starting update polling");
    while !token.is_cancelled() {
        let updates = bot
            .get_updates()
            .offset(offset)
            .timeout(LONG_POLL_TIMEOUT_SECS)
            .allowed_updates(vec![AllowedUpdate::Message])
            .await;
        match updates {
            Ok(updates) => {
                for update in updates {
                    offset = update.id.as_offset();
                    match update.kind {
                        UpdateKind::Message(message) => {
                            let event = handlers::inbound_event(&message);
                            router.handle_event(&event).await;
                        },
                        other => debug!(kind = ?other, "ignoring update"),
                    }
                }
            },
            Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                warn!("another getUpdates consumer took over, stopping polling");
                token.cancel();
            },
            Err(err) => {
                warn!(error = %err, "polling failed, backing off");
                tokio::time::sleep(POLL_ERROR_BACKOFF).await;
            },
        }
    }
    info!("update polling stopped");
}
