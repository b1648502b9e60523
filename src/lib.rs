//! # okmd
//!
//! Paste the image on the system clipboard into a Markdown document: save it
//! next to the document, upload it to object storage, and insert a
//! `![name](url)` link at the caret.
//!
//! ## Pipeline Overview
//!
//! ```text
//! clipboard
//!  │
//!  ├─ 1. Resolve  image path from document dir, selection, configured subdir
//!  ├─ 2. Ensure   image directory exists (single level)
//!  ├─ 3. Capture  platform helper writes the clipboard PNG to that path
//!  ├─ 4. Publish  upload to the bucket, get a public URL
//!  ├─ 5. Insert   markdown link handed to the insertion sink
//!  └─ 6. Cleanup  local copy deleted (failure is only a warning)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use okmd::{
//!     load_or_create_installation_id, paste, CaptureRequest, DocumentSink,
//!     HelperClipboardSource, PasteConfig, PasteContext, PasteOutcome, QiniuPublisher,
//!     StateStore, UploadConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PasteConfig::builder()
//!         .upload(UploadConfig {
//!             access_key: "AK".into(),
//!             secret_key: "SK".into(),
//!             bucket: "notes".into(),
//!             domain: "cdn.example".into(),
//!             ..UploadConfig::default()
//!         })
//!         .build()?;
//!
//!     let installation_id =
//!         load_or_create_installation_id(&StateStore::new(StateStore::default_path())).await?;
//!     let ctx = PasteContext::new(
//!         Arc::new(HelperClipboardSource::from_config(&config)?),
//!         Arc::new(QiniuPublisher::new(config.upload.clone())?),
//!         Arc::new(DocumentSink::new("notes/today.md", None)),
//!         installation_id,
//!     );
//!
//!     let request = CaptureRequest::new(Some("notes/today.md".into()), None, &config);
//!     if let PasteOutcome::Published { snippet, .. } = paste(&ctx, &request, &config).await? {
//!         eprintln!("inserted {snippet}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `okmd` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod installation;
pub mod output;
pub mod paste;
pub mod pipeline;
pub mod progress;
pub mod sink;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PasteConfig, PasteConfigBuilder, UploadConfig};
pub use error::{DeleteWarning, OkmdError};
pub use installation::{load_or_create_installation_id, InstallationId, StateStore};
pub use output::{CaptureOutcome, CaptureRequest, PasteOutcome, UploadResult};
pub use paste::{paste, PasteContext};
pub use pipeline::capture::{ClipboardImageSource, HelperClipboardSource};
pub use pipeline::publish::{Publisher, QiniuPublisher};
pub use pipeline::resolve::ResolvedImagePath;
pub use progress::{NoopProgressCallback, PasteProgressCallback, ProgressCallback, Stage};
pub use sink::{Caret, DocumentSink, InsertionSink, StdoutSink};
