//! Configuration types for the capture-and-publish pipeline.
//!
//! All behaviour is controlled through [`PasteConfig`], built via its
//! [`PasteConfigBuilder`]. Upload credentials live in a nested
//! [`UploadConfig`] consumed only by the publisher.

use crate::error::OkmdError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default storage subdirectory, relative to the edited document.
pub const DEFAULT_LOCAL_PATH: &str = "img";

/// Default upload endpoint.
pub const DEFAULT_UPLOAD_URL: &str = "https://upload.qiniup.com";

/// Configuration for one paste invocation.
///
/// Built via [`PasteConfig::builder()`] or using [`PasteConfig::default()`].
///
/// # Example
/// ```rust
/// use okmd::PasteConfig;
///
/// let config = PasteConfig::builder()
///     .local_path("assets")
///     .capture_timeout_secs(Some(10))
///     .build()
///     .unwrap();
/// assert_eq!(config.local_path, "assets");
/// ```
#[derive(Clone)]
pub struct PasteConfig {
    /// Storage subdirectory for captured images. Default: `"img"`.
    ///
    /// Absolute paths are used verbatim; relative paths are joined onto the
    /// edited document's directory. Leading or trailing whitespace is
    /// rejected at resolve time as a misconfiguration.
    pub local_path: String,

    /// Explicit clipboard helper script. If None, the embedded script for
    /// the running platform is used.
    pub helper_script: Option<PathBuf>,

    /// Upper bound on how long the clipboard helper may run. Default: 30 s.
    ///
    /// `None` waits indefinitely. A helper that exits without output is
    /// detected regardless of this setting.
    pub capture_timeout_secs: Option<u64>,

    /// Remote storage settings.
    pub upload: UploadConfig,

    /// Receives stage transitions. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PasteConfig {
    fn default() -> Self {
        Self {
            local_path: DEFAULT_LOCAL_PATH.to_string(),
            helper_script: None,
            capture_timeout_secs: Some(30),
            upload: UploadConfig::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PasteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasteConfig")
            .field("local_path", &self.local_path)
            .field("helper_script", &self.helper_script)
            .field("capture_timeout_secs", &self.capture_timeout_secs)
            .field("upload", &self.upload)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PasteProgressCallback>"),
            )
            .finish()
    }
}

impl PasteConfig {
    /// Create a new builder for `PasteConfig`.
    pub fn builder() -> PasteConfigBuilder {
        PasteConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PasteConfig`].
#[derive(Debug)]
pub struct PasteConfigBuilder {
    config: PasteConfig,
}

impl PasteConfigBuilder {
    pub fn local_path(mut self, path: impl Into<String>) -> Self {
        self.config.local_path = path.into();
        self
    }

    pub fn helper_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.helper_script = Some(path.into());
        self
    }

    pub fn capture_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.capture_timeout_secs = secs;
        self
    }

    pub fn upload(mut self, upload: UploadConfig) -> Self {
        self.config.upload = upload;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PasteConfig, OkmdError> {
        let c = &self.config;
        if c.capture_timeout_secs == Some(0) {
            return Err(OkmdError::InvalidConfig(
                "Capture timeout must be ≥ 1 second (omit it to wait indefinitely)".into(),
            ));
        }
        if c.upload.timeout_secs == 0 {
            return Err(OkmdError::InvalidConfig(
                "Upload timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Remote object-storage settings, consumed only by the publisher.
#[derive(Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Account access key (public half of the credential).
    pub access_key: String,
    /// Account secret key; used only to sign upload tokens.
    pub secret_key: String,
    /// Target bucket.
    pub bucket: String,
    /// Public domain serving the bucket, e.g. `https://cdn.example`.
    /// A bare host gets `https://` prepended.
    pub domain: String,
    /// Upload endpoint. Default: [`DEFAULT_UPLOAD_URL`].
    pub upload_url: String,
    /// Optional prefix prepended to every object key.
    pub key_prefix: Option<String>,
    /// HTTP timeout for the upload request in seconds. Default: 60.
    pub timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            bucket: String::new(),
            domain: String::new(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            key_prefix: None,
            timeout_secs: 60,
        }
    }
}

impl fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("domain", &self.domain)
            .field("upload_url", &self.upload_url)
            .field("key_prefix", &self.key_prefix)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl UploadConfig {
    /// Check that every credential field the publisher needs is present.
    pub fn validate(&self) -> Result<(), OkmdError> {
        let required = [
            ("access key", &self.access_key),
            ("secret key", &self.secret_key),
            ("bucket", &self.bucket),
            ("domain", &self.domain),
            ("upload URL", &self.upload_url),
        ];
        for (label, value) in required {
            if value.trim().is_empty() {
                return Err(OkmdError::InvalidConfig(format!(
                    "Upload {label} is not configured"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = PasteConfig::default();
        assert_eq!(c.local_path, "img");
        assert_eq!(c.capture_timeout_secs, Some(30));
        assert_eq!(c.upload.upload_url, DEFAULT_UPLOAD_URL);
        assert!(c.progress_callback.is_none());
    }

    #[test]
    fn zero_capture_timeout_rejected() {
        let err = PasteConfig::builder()
            .capture_timeout_secs(Some(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, OkmdError::InvalidConfig(_)));
    }

    #[test]
    fn upload_validation_names_missing_field() {
        let upload = UploadConfig {
            access_key: "ak".into(),
            secret_key: "sk".into(),
            bucket: String::new(),
            domain: "cdn.example".into(),
            ..UploadConfig::default()
        };
        let msg = upload.validate().unwrap_err().to_string();
        assert!(msg.contains("bucket"), "got: {msg}");
    }

    #[test]
    fn debug_redacts_secret() {
        let upload = UploadConfig {
            secret_key: "super-secret".into(),
            ..UploadConfig::default()
        };
        let dbg = format!("{upload:?}");
        assert!(!dbg.contains("super-secret"));
    }
}
