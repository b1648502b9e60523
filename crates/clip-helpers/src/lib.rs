//! # clip-helpers
//!
//! Platform helper scripts that dump the clipboard image to a file, embedded
//! in the binary and written to a per-version cache directory on first use.
//!
//! ## How it works
//!
//! On first call to [`ensure_helper_script`]:
//!
//! 1. Checks `~/.cache/okmd/helpers-{VERSION}/` for the platform script.
//! 2. If absent (or stale), writes the embedded copy there.
//! 3. Returns the on-disk path, ready to pass to the platform interpreter.
//!
//! Subsequent calls in the same process return the cached path immediately.
//!
//! ## Helper contract
//!
//! Every script takes exactly one argument, the destination file path, and
//! prints exactly one line to stdout before exiting:
//!
//! | Output      | Meaning                                        |
//! |-------------|------------------------------------------------|
//! | `<path>`    | the clipboard image was written to `<path>`    |
//! | `no image`  | the clipboard holds no image                   |
//! | `no xclip`  | (Linux family) `xclip` is not installed        |
//!
//! ## Platform support
//!
//! | Family  | Interpreter  | Script             |
//! |---------|--------------|--------------------|
//! | Windows | `powershell` | `pc.ps1`           |
//! | macOS   | `osascript`  | `mac.applescript`  |
//! | other   | `sh`         | `linux.sh`         |
//!
//! ## Environment variable overrides
//!
//! - `OKMD_HELPER_CACHE_DIR` — override the default cache directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Version tag of the embedded scripts; part of the cache directory name.
pub const HELPERS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sentinel printed when the clipboard holds no image.
pub const NO_IMAGE: &str = "no image";

/// Sentinel printed by the Linux helper when `xclip` is missing.
pub const NO_XCLIP: &str = "no xclip";

const LINUX_SCRIPT: &str = include_str!("../scripts/linux.sh");
const MAC_SCRIPT: &str = include_str!("../scripts/mac.applescript");
const WINDOWS_SCRIPT: &str = include_str!("../scripts/pc.ps1");

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned while materialising a helper script.
#[derive(Error, Debug)]
pub enum HelperError {
    /// Could not create the local cache directory.
    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    /// Could not write the script into the cache directory.
    #[error("Failed to write helper script '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Platform families ────────────────────────────────────────────────────────

/// The three OS families with a dedicated clipboard helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelperPlatform {
    /// PowerShell + WPF clipboard API.
    Windows,
    /// AppleScript via `osascript`.
    MacOs,
    /// POSIX `sh` + `xclip`. Also the fallback for any other OS.
    Linux,
}

impl HelperPlatform {
    /// Detect the family of the running OS.
    pub fn detect() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value to its helper family.
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => HelperPlatform::Windows,
            "macos" => HelperPlatform::MacOs,
            _ => HelperPlatform::Linux,
        }
    }

    /// File name the script is written under.
    pub fn script_name(self) -> &'static str {
        match self {
            HelperPlatform::Windows => "pc.ps1",
            HelperPlatform::MacOs => "mac.applescript",
            HelperPlatform::Linux => "linux.sh",
        }
    }

    /// Embedded script source.
    pub fn script_source(self) -> &'static str {
        match self {
            HelperPlatform::Windows => WINDOWS_SCRIPT,
            HelperPlatform::MacOs => MAC_SCRIPT,
            HelperPlatform::Linux => LINUX_SCRIPT,
        }
    }
}

// ── Cache directory resolution ───────────────────────────────────────────────

/// Returns the per-version cache directory for the helper scripts.
///
/// Default locations:
/// - **macOS**: `~/Library/Caches/okmd/helpers-{VERSION}/`
/// - **Linux**: `~/.cache/okmd/helpers-{VERSION}/`
/// - **Windows**: `%LOCALAPPDATA%\okmd\helpers-{VERSION}\`
///
/// Override by setting `OKMD_HELPER_CACHE_DIR`.
pub fn helper_cache_dir() -> PathBuf {
    cache_dir_from(std::env::var_os("OKMD_HELPER_CACHE_DIR"))
}

fn cache_dir_from(override_dir: Option<OsString>) -> PathBuf {
    let versioned = format!("helpers-{HELPERS_VERSION}");
    if let Some(dir) = override_dir {
        return PathBuf::from(dir).join(versioned);
    }

    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir);

    base.join("okmd").join(versioned)
}

// ── Public API ───────────────────────────────────────────────────────────────

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Ensures the helper script for the running platform is present on disk and
/// returns its path.
///
/// Safe to call from multiple threads; the script is written at most once per
/// process lifetime (a racing second write produces identical bytes).
pub fn ensure_helper_script() -> Result<PathBuf, HelperError> {
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }

    let path = write_script(HelperPlatform::detect(), &helper_cache_dir())?;
    let _ = RESOLVED_PATH.set(path.clone());
    Ok(path)
}

/// Writes the script for `platform` into `dir` unless an identical copy is
/// already there. Returns the script path.
pub fn write_script(platform: HelperPlatform, dir: &Path) -> Result<PathBuf, HelperError> {
    let path = dir.join(platform.script_name());
    let source = platform.script_source();

    if let Ok(existing) = std::fs::read_to_string(&path) {
        if existing == source {
            return Ok(path);
        }
    }

    std::fs::create_dir_all(dir).map_err(HelperError::CacheDir)?;
    std::fs::write(&path, source).map_err(|e| HelperError::Write {
        path: path.clone(),
        source: e,
    })?;

    Ok(path)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
