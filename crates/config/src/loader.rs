//! Environment loader.
//!
//! The whole configuration surface is environment variables; `.env` files
//! are folded in by the binary (via dotenvy) before this runs. Required
//! variables are validated eagerly so a misconfigured process refuses to
//! start instead of failing on the first download.

use secrecy::Secret;
use tracing::debug;

use crate::{
    error::{Error, Result},
    schema::{FetchSettings, MimeFilter, Settings, StorageSettings, TelegramSettings},
};

pub const ENV_BOT_TOKEN: &str = "BOT_TOKEN";
pub const ENV_UPLOAD_DIR: &str = "UPLOAD_DIR";
pub const ENV_BASE_URL: &str = "BASE_URL";
pub const ENV_MAX_FILE_SIZE: &str = "MAX_FILE_SIZE";
pub const ENV_ALLOWED_MIME_TYPES: &str = "ALLOWED_MIME_TYPES";
pub const ENV_DOWNLOAD_TIMEOUT_SECS: &str = "DOWNLOAD_TIMEOUT_SECS";
pub const ENV_DOWNLOAD_RETRIES: &str = "DOWNLOAD_RETRIES";

const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_RETRIES: u32 = 2;

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings from an arbitrary variable lookup. Tests inject maps
    /// here instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = required(&lookup, ENV_BOT_TOKEN)?;
        let upload_dir = required(&lookup, ENV_UPLOAD_DIR)?;
        let base_url = required(&lookup, ENV_BASE_URL)?;

        let max_file_size = parsed(&lookup, ENV_MAX_FILE_SIZE, DEFAULT_MAX_FILE_SIZE)?;
        if max_file_size == 0 {
            return Err(Error::InvalidVar {
                name: ENV_MAX_FILE_SIZE,
                reason: "must be greater than zero".to_owned(),
            });
        }

        let timeout_secs = parsed(&lookup, ENV_DOWNLOAD_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(Error::InvalidVar {
                name: ENV_DOWNLOAD_TIMEOUT_SECS,
                reason: "must be greater than zero".to_owned(),
            });
        }
        let retries = parsed(&lookup, ENV_DOWNLOAD_RETRIES, DEFAULT_RETRIES)?;

        let allowed_mime_types = match lookup(ENV_ALLOWED_MIME_TYPES) {
            Some(raw) => MimeFilter::parse(&raw),
            None => MimeFilter::Any,
        };

        let settings = Self {
            telegram: TelegramSettings { bot_token: Secret::new(bot_token) },
            storage: StorageSettings {
                upload_dir: upload_dir.trim_end_matches('/').into(),
                base_url: base_url.trim_end_matches('/').to_owned(),
                max_file_size,
                allowed_mime_types,
            },
            fetch: FetchSettings { timeout_secs, retries },
        };
        debug!(
            upload_dir = %settings.storage.upload_dir.display(),
            max_file_size = settings.storage.max_file_size,
            timeout_secs = settings.fetch.timeout_secs,
            retries = settings.fetch.retries,
            "settings loaded",
        );
        Ok(settings)
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::MissingVar { name }),
    }
}

fn parsed<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|err| Error::InvalidVar {
            name,
            reason: format!("{err} (got {raw:?})"),
        }),
        None => Ok(default),
    }
}

// ── tests ───────────────────────────────────────────────────────────────────
