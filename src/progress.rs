//! Progress-callback trait for pipeline stage transitions.
//!
//! Inject an [`Arc<dyn PasteProgressCallback>`] via
//! [`crate::config::PasteConfigBuilder::progress_callback`] to be told when
//! the pipeline enters each [`Stage`], and how it ends.
//!
//! # Example
//!
//! ```rust
//! use okmd::{PasteConfig, PasteProgressCallback, Stage};
//! use std::sync::{Arc, Mutex};
//!
//! struct StageLog(Mutex<Vec<Stage>>);
//!
//! impl PasteProgressCallback for StageLog {
//!     fn on_stage(&self, stage: Stage) {
//!         self.0.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let config = PasteConfig::builder()
//!     .progress_callback(Arc::new(StageLog(Mutex::new(Vec::new()))))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::PasteOutcome;
use std::fmt;
use std::sync::Arc;

/// States of the capture-and-publish pipeline.
///
/// ```text
/// Idle → Resolving → EnsuringDir → Capturing ─┬─▶ Empty
///                                             └─▶ Captured → Publishing → Inserting → Done
/// ```
///
/// Failure is reachable from every state and is reported through
/// [`PasteProgressCallback::on_failed`] with the stage that was active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    Resolving,
    EnsuringDir,
    Capturing,
    /// Terminal: the clipboard held no image.
    Empty,
    Captured,
    Publishing,
    Inserting,
    /// Terminal: the link was inserted.
    Done,
}

impl Stage {
    /// Whether the pipeline stops in this stage.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Empty | Stage::Done)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Idle => "idle",
            Stage::Resolving => "resolving image path",
            Stage::EnsuringDir => "preparing image directory",
            Stage::Capturing => "reading clipboard",
            Stage::Empty => "no image in clipboard",
            Stage::Captured => "image captured",
            Stage::Publishing => "uploading",
            Stage::Inserting => "inserting link",
            Stage::Done => "done",
        };
        f.write_str(label)
    }
}

/// Called by the pipeline as it moves between stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait PasteProgressCallback: Send + Sync {
    /// Called on entry to every stage, including the terminal ones.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once when the pipeline fails.
    ///
    /// # Arguments
    /// * `stage` — the stage that was active when the error occurred
    /// * `error` — human-readable error description
    fn on_failed(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once when the pipeline finishes without error.
    fn on_complete(&self, outcome: &PasteOutcome) {
        let _ = outcome;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PasteProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PasteConfig`].
pub type ProgressCallback = Arc<dyn PasteProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        stages: Mutex<Vec<Stage>>,
        failures: Mutex<Vec<(Stage, String)>>,
    }

    impl PasteProgressCallback for Recorder {
        fn on_stage(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_failed(&self, stage: Stage, error: &str) {
            self.failures.lock().unwrap().push((stage, error.to_string()));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage(Stage::Resolving);
        cb.on_failed(Stage::Capturing, "boom");
        cb.on_complete(&PasteOutcome::Empty);
    }

    #[test]
    fn recorder_receives_events() {
        let rec = Recorder::default();
        rec.on_stage(Stage::Resolving);
        rec.on_stage(Stage::EnsuringDir);
        rec.on_failed(Stage::EnsuringDir, "permission denied");

        assert_eq!(
            *rec.stages.lock().unwrap(),
            vec![Stage::Resolving, Stage::EnsuringDir]
        );
        assert_eq!(rec.failures.lock().unwrap()[0].0, Stage::EnsuringDir);
    }

    #[test]
    fn terminal_stages() {
        assert!(Stage::Empty.is_terminal());
        assert!(Stage::Done.is_terminal());
        assert!(!Stage::Publishing.is_terminal());
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage(Stage::Done);
    }
}
