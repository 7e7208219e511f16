//! Environment-driven configuration.
//!
//! The surface is twelve-factor style: `BOT_TOKEN`, `UPLOAD_DIR`,
//! `BASE_URL`, `MAX_FILE_SIZE`, `ALLOWED_MIME_TYPES` and the download
//! tuning knobs. [`Settings::from_env`] reads and validates everything once
//! at startup; components receive their settings structs by value and never
//! touch the environment themselves.

pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    schema::{FetchSettings, MimeFilter, Settings, StorageSettings, TelegramSettings},
};
