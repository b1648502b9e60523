//! Error types for the okmd library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`OkmdError`] — **Fatal**: the paste cannot proceed (bad selection,
//!   unsaved document, helper missing, upload rejected). Returned as
//!   `Err(OkmdError)` from [`crate::paste::paste`] and every pipeline stage.
//!
//! * [`DeleteWarning`] — **Non-fatal**: the image was published and the link
//!   inserted, but the local copy could not be removed. Stored inside
//!   [`crate::output::PasteOutcome`] so the host can notify the user without
//!   turning a successful paste into a failure.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the okmd library.
#[derive(Debug, Error)]
pub enum OkmdError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The selected text cannot be used as an image file name.
    #[error("Your selection is not a valid file name: '{name}'\nOnly letters, digits, '_', '-' and '.' are allowed.")]
    InvalidName { name: String },

    /// Operator misconfiguration (e.g. whitespace around the storage path).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The active document has no backing file.
    #[error("Before pasting an image, save the current document first.")]
    UnsavedDocument,

    // ── Filesystem errors ─────────────────────────────────────────────────
    /// The image directory could not be created.
    #[error("Failed to create image directory '{dir}': {source}")]
    DirectoryCreate {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Capture errors ────────────────────────────────────────────────────
    /// A system utility required by the clipboard helper is not installed.
    #[error("You need to install the '{utility}' command first.")]
    MissingDependency { utility: String },

    /// The clipboard helper produced no usable output.
    #[error("Clipboard capture failed: {reason}")]
    CaptureFailure { reason: String },

    // ── Publish errors ────────────────────────────────────────────────────
    /// Upload to remote storage failed.
    #[error("Upload error: {reason}")]
    Upload { reason: String },

    // ── Insertion errors ──────────────────────────────────────────────────
    /// The markdown snippet could not be written into the document.
    #[error("Failed to insert image link into '{path}': {source}")]
    InsertFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── State errors ──────────────────────────────────────────────────────
    /// The persisted key-value state could not be read or written.
    #[error("State file '{path}': {reason}")]
    State { path: PathBuf, reason: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The local image could not be deleted after a successful publish.
///
/// The uploaded copy is canonical, so this never fails the paste.
#[derive(Debug, Error)]
#[error("Could not delete local image '{path}': {source}")]
pub struct DeleteWarning {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_name_display() {
        let e = OkmdError::InvalidName { name: "a/b".into() };
        let msg = e.to_string();
        assert!(msg.contains("a/b"), "got: {msg}");
    }

    #[test]
    fn missing_dependency_display() {
        let e = OkmdError::MissingDependency {
            utility: "xclip".into(),
        };
        assert!(e.to_string().contains("xclip"));
    }

    #[test]
    fn directory_create_keeps_source() {
        use std::error::Error as _;
        let e = OkmdError::DirectoryCreate {
            dir: PathBuf::from("/docs/img"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.to_string().contains("/docs/img"));
        assert!(e.source().is_some());
    }

    #[test]
    fn delete_warning_display() {
        let w = DeleteWarning {
            path: PathBuf::from("/docs/img/s1.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(w.to_string().contains("s1.png"));
    }
}
