//! Values flowing through and out of the pipeline.

use crate::config::PasteConfig;
use crate::error::DeleteWarning;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One user action: paste the clipboard image into `document`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Backing file of the active document; `None` for an unsaved buffer.
    pub document: Option<PathBuf>,
    /// Selected text, used as the image base name when non-empty.
    pub selection: Option<String>,
    /// Storage subdirectory, absolute or relative to the document.
    pub configured_subdir: String,
}

impl CaptureRequest {
    /// Build a request from the editor state, taking the subdirectory from
    /// `config.local_path`.
    pub fn new(
        document: Option<PathBuf>,
        selection: Option<String>,
        config: &PasteConfig,
    ) -> Self {
        Self {
            document,
            selection,
            configured_subdir: config.local_path.clone(),
        }
    }
}

/// What the clipboard helper reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The image was written to this path.
    Saved(PathBuf),
    /// The clipboard held no image.
    Empty,
}

/// A published image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Display name, used as the markdown alt text.
    pub name: String,
    /// Publicly resolvable URL.
    pub url: String,
}

impl UploadResult {
    /// The markdown image reference for this upload.
    pub fn markdown(&self) -> String {
        format!("![{}]({})", self.name, self.url)
    }
}

/// How a paste finished.
#[derive(Debug)]
pub enum PasteOutcome {
    /// The clipboard held no image; nothing was uploaded or inserted.
    Empty,
    /// The image was uploaded and the link inserted.
    Published {
        /// Where the helper wrote the image (now deleted unless
        /// `delete_warning` is set).
        image_path: PathBuf,
        upload: UploadResult,
        /// The exact text handed to the insertion sink.
        snippet: String,
        delete_warning: Option<DeleteWarning>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_snippet() {
        let upload = UploadResult {
            name: "s1230451019".into(),
            url: "https://cdn.example/abc.png".into(),
        };
        assert_eq!(
            upload.markdown(),
            "![s1230451019](https://cdn.example/abc.png)"
        );
    }

    #[test]
    fn request_takes_subdir_from_config() {
        let config = PasteConfig::builder().local_path("assets").build().unwrap();
        let req = CaptureRequest::new(Some("/docs/note.md".into()), None, &config);
        assert_eq!(req.configured_subdir, "assets");
    }
}
