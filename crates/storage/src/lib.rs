//! Validated local persistence for downloaded files.
//!
//! [`SafeStorage`] is the single sink of the pipeline: it enforces the size
//! ceiling and mime allow-list, generates traversal-proof filenames, and
//! writes atomically (temp file + rename) under the configured root. The
//! filesystem listing is the only durable state; there is no index.

pub mod error;
pub mod store;

pub use {
    error::{Error, Result},
    store::{SafeStorage, StoredFile},
};
