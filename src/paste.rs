//! The capture-and-publish pipeline.
//!
//! One call to [`paste`] is one user action. Steps run strictly in order,
//! each awaiting a single external operation:
//!
//! ```text
//! resolve ──▶ ensure ──▶ capture ──┬─▶ (no image) Empty
//!                                  └─▶ publish ──▶ insert ──▶ delete local copy
//! ```
//!
//! Any error aborts at the step where it occurred; nothing already done is
//! rolled back. Deleting the local copy is the one step whose failure is
//! only a warning.

use crate::config::PasteConfig;
use crate::error::{DeleteWarning, OkmdError};
use crate::installation::InstallationId;
use crate::output::{CaptureOutcome, CaptureRequest, PasteOutcome};
use crate::pipeline::capture::ClipboardImageSource;
use crate::pipeline::publish::Publisher;
use crate::pipeline::{ensure, resolve};
use crate::progress::Stage;
use crate::sink::InsertionSink;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The collaborators a paste talks to.
#[derive(Clone)]
pub struct PasteContext {
    pub source: Arc<dyn ClipboardImageSource>,
    pub publisher: Arc<dyn Publisher>,
    pub sink: Arc<dyn InsertionSink>,
    pub installation_id: InstallationId,
}

impl PasteContext {
    pub fn new(
        source: Arc<dyn ClipboardImageSource>,
        publisher: Arc<dyn Publisher>,
        sink: Arc<dyn InsertionSink>,
        installation_id: InstallationId,
    ) -> Self {
        Self {
            source,
            publisher,
            sink,
            installation_id,
        }
    }
}

/// Paste the clipboard image into the document named by `request`.
///
/// # Returns
/// * `Ok(PasteOutcome::Empty)` — the clipboard held no image
/// * `Ok(PasteOutcome::Published { .. })` — uploaded and inserted; check
///   `delete_warning` for a leftover local file
///
/// # Errors
/// Every [`OkmdError`] is fatal for this invocation and is reported to the
/// progress callback before being returned.
pub async fn paste(
    ctx: &PasteContext,
    request: &CaptureRequest,
    config: &PasteConfig,
) -> Result<PasteOutcome, OkmdError> {
    let start = Instant::now();
    let mut stage = Stage::Idle;

    let result = run(ctx, request, config, &mut stage).await;

    match &result {
        Ok(outcome) => {
            debug!("Paste finished in {}ms", start.elapsed().as_millis());
            if let Some(ref cb) = config.progress_callback {
                cb.on_complete(outcome);
            }
        }
        Err(e) => {
            error!("Paste failed while {}: {}", stage, e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_failed(stage, &e.to_string());
            }
        }
    }

    result
}

async fn run(
    ctx: &PasteContext,
    request: &CaptureRequest,
    config: &PasteConfig,
    stage: &mut Stage,
) -> Result<PasteOutcome, OkmdError> {
    // ── Step 1: Resolve destination ──────────────────────────────────────
    let document = saved_document(request.document.as_deref())?;
    enter(config, stage, Stage::Resolving);
    let resolved = resolve::resolve(
        document,
        request.selection.as_deref(),
        &request.configured_subdir,
    )?;

    // ── Step 2: Ensure directory ─────────────────────────────────────────
    enter(config, stage, Stage::EnsuringDir);
    let resolved = ensure::ensure(resolved).await?;

    // ── Step 3: Capture clipboard ────────────────────────────────────────
    enter(config, stage, Stage::Capturing);
    let image_path = match ctx.source.capture(resolved.path()).await? {
        CaptureOutcome::Empty => {
            enter(config, stage, Stage::Empty);
            info!("There is no image in the clipboard");
            return Ok(PasteOutcome::Empty);
        }
        CaptureOutcome::Saved(path) => path,
    };
    enter(config, stage, Stage::Captured);

    // ── Step 4: Publish ──────────────────────────────────────────────────
    enter(config, stage, Stage::Publishing);
    let upload = ctx
        .publisher
        .publish(&image_path, document, &ctx.installation_id)
        .await?;
    info!("Upload success: {}", upload.url);

    // ── Step 5: Insert link ──────────────────────────────────────────────
    enter(config, stage, Stage::Inserting);
    let snippet = upload.markdown();
    ctx.sink.insert(&snippet).await?;

    // ── Step 6: Remove local copy ────────────────────────────────────────
    let delete_warning = match tokio::fs::remove_file(&image_path).await {
        Ok(()) => {
            debug!("Removed local image {}", image_path.display());
            None
        }
        Err(e) => {
            let warning = DeleteWarning {
                path: image_path.clone(),
                source: e,
            };
            warn!("{}", warning);
            Some(warning)
        }
    };

    enter(config, stage, Stage::Done);
    Ok(PasteOutcome::Published {
        image_path,
        upload,
        snippet,
        delete_warning,
    })
}

fn enter(config: &PasteConfig, stage: &mut Stage, next: Stage) {
    debug!("Stage: {:?} → {:?}", stage, next);
    *stage = next;
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(next);
    }
}

/// The document must have a backing file.
fn saved_document(document: Option<&Path>) -> Result<&Path, OkmdError> {
    match document {
        Some(path) if path.is_file() => Ok(path),
        _ => Err(OkmdError::UnsavedDocument),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsaved_document_rejected() {
        assert!(matches!(
            saved_document(None).unwrap_err(),
            OkmdError::UnsavedDocument
        ));
        assert!(matches!(
            saved_document(Some(Path::new("/definitely/not/here.md"))).unwrap_err(),
            OkmdError::UnsavedDocument
        ));
    }

    #[test]
    fn saved_document_accepted() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = tmp.path().join("note.md");
        std::fs::write(&doc, "").unwrap();
        assert_eq!(saved_document(Some(doc.as_path())).unwrap(), doc.as_path());
    }
}
