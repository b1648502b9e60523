//! Clipboard capture: run the platform helper and interpret its answer.
//!
//! The helper is an opaque external process (see the `clip-helpers` crate
//! for the contract). Exactly one process is spawned per capture and its
//! first stdout line is the answer, so the interaction is modelled as one
//! awaited future rather than an event subscription. A helper that exits
//! without printing anything resolves to [`OkmdError::CaptureFailure`]
//! instead of leaving the pipeline waiting.

use crate::config::PasteConfig;
use crate::error::OkmdError;
use crate::output::CaptureOutcome;
use async_trait::async_trait;
use clip_helpers::{HelperPlatform, NO_IMAGE, NO_XCLIP};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Anything that can dump the clipboard image to a file.
#[async_trait]
pub trait ClipboardImageSource: Send + Sync {
    /// Write the clipboard image to `dest`.
    ///
    /// Returns [`CaptureOutcome::Saved`] with the path actually written,
    /// [`CaptureOutcome::Empty`] when there is no image, or an error when
    /// the helper is unusable.
    async fn capture(&self, dest: &Path) -> Result<CaptureOutcome, OkmdError>;
}

/// Captures via the platform helper script.
#[derive(Debug, Clone)]
pub struct HelperClipboardSource {
    platform: HelperPlatform,
    script: PathBuf,
    timeout: Option<Duration>,
}

impl HelperClipboardSource {
    pub fn new(platform: HelperPlatform, script: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            script: script.into(),
            timeout: None,
        }
    }

    /// Kill the helper and fail if it has not answered within `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Detect the platform and locate its script: `config.helper_script`
    /// when set, otherwise the embedded copy materialised into the cache.
    pub fn from_config(config: &PasteConfig) -> Result<Self, OkmdError> {
        let platform = HelperPlatform::detect();
        let script = match config.helper_script {
            Some(ref path) => path.clone(),
            None => clip_helpers::ensure_helper_script()
                .map_err(|e| OkmdError::Internal(format!("Clipboard helper unavailable: {e}")))?,
        };
        debug!("Clipboard helper: {:?} {}", platform, script.display());

        Ok(Self::new(platform, script)
            .with_timeout(config.capture_timeout_secs.map(Duration::from_secs)))
    }
}

#[async_trait]
impl ClipboardImageSource for HelperClipboardSource {
    async fn capture(&self, dest: &Path) -> Result<CaptureOutcome, OkmdError> {
        let mut command = helper_command(self.platform, &self.script, dest);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let program = interpreter(self.platform);
        let mut child = command.spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                OkmdError::MissingDependency {
                    utility: program.to_string(),
                }
            } else {
                OkmdError::CaptureFailure {
                    reason: format!("could not start {program}: {e}"),
                }
            }
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| OkmdError::Internal("helper stdout was not piped".into()))?;

        let run = async {
            let mut reader = BufReader::new(stdout);
            let mut first = String::new();
            reader.read_line(&mut first).await?;
            // Drain anything else so the helper never blocks on a full pipe.
            tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((first, status))
        };

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(r) => r,
                Err(_) => {
                    let _ = child.kill().await;
                    return Err(OkmdError::CaptureFailure {
                        reason: format!("helper did not answer within {limit:?}"),
                    });
                }
            },
            None => run.await,
        };

        let (line, status) = result.map_err(|e| OkmdError::CaptureFailure {
            reason: format!("reading helper output: {e}"),
        })?;
        debug!("Clipboard helper exited with {status}: {:?}", line.trim());

        let outcome = interpret_output(&line)?;
        if let CaptureOutcome::Saved(ref path) = outcome {
            info!("Clipboard image saved to {}", path.display());
        }
        Ok(outcome)
    }
}

/// Map one line of helper output to a capture outcome.
pub fn interpret_output(line: &str) -> Result<CaptureOutcome, OkmdError> {
    match line.trim() {
        NO_IMAGE => Ok(CaptureOutcome::Empty),
        NO_XCLIP => Err(OkmdError::MissingDependency {
            utility: "xclip".to_string(),
        }),
        "" => Err(OkmdError::CaptureFailure {
            reason: "helper exited without reporting a result".to_string(),
        }),
        path => Ok(CaptureOutcome::Saved(PathBuf::from(path))),
    }
}

/// Interpreter program for each platform family.
pub fn interpreter(platform: HelperPlatform) -> &'static str {
    match platform {
        HelperPlatform::Windows => "powershell",
        HelperPlatform::MacOs => "osascript",
        HelperPlatform::Linux => "sh",
    }
}

/// Build the helper invocation for `platform`.
pub fn helper_command(platform: HelperPlatform, script: &Path, dest: &Path) -> Command {
    let mut command = Command::new(interpreter(platform));
    if platform == HelperPlatform::Windows {
        command.args([
            "-noprofile",
            "-noninteractive",
            "-nologo",
            "-sta",
            "-executionpolicy",
            "unrestricted",
            "-windowstyle",
            "hidden",
            "-file",
        ]);
    }
    command.arg(script).arg(dest);
    command
}
