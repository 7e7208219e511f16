//! Validated file persistence.

use std::path::Path;

use {
    rand::Rng,
    teledrop_config::StorageSettings,
    tracing::{debug, warn},
};

use crate::error::{Error, Result};

/// Metadata for a file accepted into the storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub mime_type: String,
}

/// Size- and type-validated file sink rooted at `upload_dir`.
///
/// Names are regenerated on every save (sanitized stem, Unix timestamp,
/// random token), so repeat saves of the same source never collide and a
/// caller-supplied name can never traverse out of the root.
#[derive(Debug, Clone)]
pub struct SafeStorage {
    settings: StorageSettings,
}

impl SafeStorage {
    /// Create the storage root and return the store. A newly created root
    /// gets mode `0755` on Unix; a pre-existing directory keeps whatever
    /// permissions the operator gave it.
    pub fn new(settings: StorageSettings) -> Result<Self> {
        #[cfg(unix)]
        let newly_created = !settings.upload_dir.is_dir();
        std::fs::create_dir_all(&settings.upload_dir).map_err(Error::WriteFailed)?;
        #[cfg(unix)]
        if newly_created {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&settings.upload_dir, std::fs::Permissions::from_mode(0o755))
                .map_err(Error::WriteFailed)?;
        }
        Ok(Self { settings })
    }

    /// Validate and persist `content`, returning where it landed.
    ///
    /// The write goes through a temp file in the root and is renamed into
    /// place; a failed save leaves nothing behind.
    pub fn save(&self, content: &[u8], original_name: &str, mime_type: &str) -> Result<StoredFile> {
        let size = content.len() as u64;
        if size > self.settings.max_file_size {
            warn!(size, limit = self.settings.max_file_size, "file over size limit");
            return Err(Error::FileTooLarge { size, limit: self.settings.max_file_size });
        }
        if !self.settings.allowed_mime_types.allows(mime_type) {
            warn!(mime = mime_type, "mime type rejected");
            return Err(Error::MimeTypeRejected { mime: mime_type.to_owned() });
        }

        let filename = safe_filename(original_name);
        let target = self.settings.upload_dir.join(&filename);
        let temp = self.settings.upload_dir.join(format!(".{filename}.part"));
        let written =
            std::fs::write(&temp, content).and_then(|()| std::fs::rename(&temp, &target));
        if let Err(err) = written {
            let _ = std::fs::remove_file(&temp);
            return Err(Error::WriteFailed(err));
        }

        debug!(path = %target.display(), size, mime = mime_type, "file stored");
        Ok(StoredFile {
            url: format!("{}/{filename}", self.settings.base_url),
            filename,
            size,
            mime_type: mime_type.to_owned(),
        })
    }
}

/// Build a name that cannot escape the storage root: directory components
/// are stripped, the stem keeps only `[A-Za-z0-9_-]`, the extension only
/// `[A-Za-z0-9]` (`bin` when absent), and a timestamp plus random token
/// disambiguate repeat saves of the same source name.
fn safe_filename(original: &str) -> String {
    let base = Path::new(original).file_name().map(Path::new).unwrap_or(Path::new(""));
    let stem: String = match base.file_stem() {
        Some(stem) => stem
            .to_string_lossy()
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_' || *ch == '-')
            .collect(),
        None => String::new(),
    };
    let ext: String = match base.extension() {
        Some(ext) => ext.to_string_lossy().chars().filter(char::is_ascii_alphanumeric).collect(),
        None => String::new(),
    };
    let ext = if ext.is_empty() { "bin".to_owned() } else { ext };

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let token: u16 = rand::rng().random();
    format!("{stem}_{timestamp}_{token:04x}.{ext}")
}

// ── tests ───────────────────────────────────────────────────────────────────
