//! Telegram side of teledrop.
//!
//! Receives updates over long polling, classifies each message (help,
//! message link, `/download`, raw attachment), fetches the referenced media
//! through the Bot API and hands the bytes to the storage crate. All network
//! access goes through the [`transport::Transport`] trait so the pipeline can
//! be driven against scripted transports in tests.

pub mod bot;
pub mod error;
pub mod fetch;
pub mod handlers;
pub mod link;
pub mod router;
pub mod transport;

pub use {
    bot::{build_bot, start_polling},
    fetch::{FetchPolicy, MediaFetcher},
    handlers::inbound_event,
    link::{MessageLocator, resolve_link},
    router::{Classification, InboundEvent, Router, classify, human_size},
    transport::{DownloadedFile, MediaDescriptor, RemoteMessage, TelegramTransport, Transport},
};

pub use error::{Error, Result};
