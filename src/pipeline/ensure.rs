//! Directory preparation: make sure the image directory exists.
//!
//! Creation is single-level (`create_dir`, not `create_dir_all`). A
//! configured subdirectory whose own parent is missing is an error.
//! Nothing created here is rolled back if a later stage fails.

use crate::error::OkmdError;
use crate::pipeline::resolve::ResolvedImagePath;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

/// Ensure the parent directory of `resolved` exists, creating one missing
/// level if needed. Idempotent.
pub async fn ensure(resolved: ResolvedImagePath) -> Result<ResolvedImagePath, OkmdError> {
    let dir = resolved.dir();

    // A bare file name resolves into the working directory.
    if dir.as_os_str().is_empty() {
        return Ok(resolved);
    }

    if is_existing_dir(dir).await? {
        debug!("Image directory exists: {}", dir.display());
        return Ok(resolved);
    }

    match tokio::fs::create_dir(dir).await {
        Ok(()) => {
            info!("Created image directory: {}", dir.display());
            Ok(resolved)
        }
        // Another invocation created it between the check and the create.
        Err(e) if e.kind() == ErrorKind::AlreadyExists && is_existing_dir(dir).await? => {
            Ok(resolved)
        }
        Err(e) => Err(OkmdError::DirectoryCreate {
            dir: dir.to_path_buf(),
            source: e,
        }),
    }
}

async fn is_existing_dir(dir: &Path) -> Result<bool, OkmdError> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(true),
        Ok(_) => Err(OkmdError::DirectoryCreate {
            dir: dir.to_path_buf(),
            source: std::io::Error::new(ErrorKind::AlreadyExists, "path exists and is not a directory"),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(OkmdError::DirectoryCreate {
            dir: dir.to_path_buf(),
            source: e,
        }),
    }
}
