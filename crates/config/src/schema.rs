//! Typed settings consumed by the storage and Telegram layers.

use std::{fmt, path::PathBuf, time::Duration};

use secrecy::Secret;

/// Everything the process needs, assembled once at startup by the loader.
#[derive(Debug, Clone)]
pub struct Settings {
    pub telegram: TelegramSettings,
    pub storage: StorageSettings,
    pub fetch: FetchSettings,
}

/// Telegram connection settings.
#[derive(Clone)]
pub struct TelegramSettings {
    /// Bot token issued by @BotFather.
    pub bot_token: Secret<String>,
}

impl fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &"[REDACTED]")
            .finish()
    }
}

/// Where accepted files land and how they are exposed to users.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// Directory files are persisted into. Created on startup if absent.
    pub upload_dir: PathBuf,

    /// Public URL prefix the upload directory is served under, without a
    /// trailing slash.
    pub base_url: String,

    /// Upper bound on accepted file size, in bytes.
    pub max_file_size: u64,

    /// Which mime types are accepted.
    pub allowed_mime_types: MimeFilter,
}

/// Mime acceptance policy: either everything, or an explicit list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimeFilter {
    Any,
    List(Vec<String>),
}

impl MimeFilter {
    /// Parse the `ALLOWED_MIME_TYPES` syntax: `*` accepts everything,
    /// otherwise a comma-separated list of exact mime types. Entries are
    /// trimmed and blanks dropped; a list that ends up empty is treated as
    /// the wildcard rather than rejecting every file.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw == "*" {
            return Self::Any;
        }
        let entries: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_owned)
            .collect();
        if entries.is_empty() { Self::Any } else { Self::List(entries) }
    }

    pub fn allows(&self, mime: &str) -> bool {
        match self {
            Self::Any => true,
            Self::List(entries) => entries.iter().any(|entry| entry == mime),
        }
    }
}

/// Remote fetch policy: per-attempt timeout and transient retry budget.
#[derive(Debug, Clone, Copy)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub retries: u32,
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── tests ───────────────────────────────────────────────────────────────────
