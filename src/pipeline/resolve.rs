//! Path resolution: where a captured image will be written.
//!
//! The destination is a pure function of the document path, the optional
//! selection, the configured subdirectory and, when there is no selection,
//! the local clock. Names derived from the clock have one-second resolution,
//! so two captures within the same second without a selection share a name.

use crate::error::OkmdError;
use chrono::{Local, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

// ASCII word characters, dot and hyphen.
static RE_SAFE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap());

/// Destination of a captured image. The parent directory may not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImagePath {
    path: PathBuf,
}

impl ResolvedImagePath {
    /// Full path of the image file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the image goes into.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// File name including the `.png` extension.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// File name without extension.
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Whether `name` may be used as an image base name.
pub fn is_valid_name(name: &str) -> bool {
    RE_SAFE_NAME.is_match(name)
}

/// Resolve the image path using the current local time for unnamed images.
pub fn resolve(
    document: &Path,
    selection: Option<&str>,
    configured_subdir: &str,
) -> Result<ResolvedImagePath, OkmdError> {
    resolve_at(
        document,
        selection,
        configured_subdir,
        Local::now().naive_local(),
    )
}

/// Resolve the image path with an explicit clock reading.
///
/// # Errors
/// * [`OkmdError::InvalidName`] — non-empty `selection` outside `[A-Za-z0-9_.-]+`
/// * [`OkmdError::InvalidConfig`] — `configured_subdir` has surrounding whitespace
pub fn resolve_at(
    document: &Path,
    selection: Option<&str>,
    configured_subdir: &str,
    now: NaiveDateTime,
) -> Result<ResolvedImagePath, OkmdError> {
    let selection = selection.filter(|s| !s.is_empty());

    if let Some(name) = selection {
        if !is_valid_name(name) {
            return Err(OkmdError::InvalidName {
                name: name.to_string(),
            });
        }
    }

    if configured_subdir.trim() != configured_subdir {
        return Err(OkmdError::InvalidConfig(format!(
            "The specified path is invalid: \"{configured_subdir}\""
        )));
    }

    let file_name = match selection {
        Some(name) => format!("{name}.png"),
        None => timestamp_name(now),
    };

    let subdir = Path::new(configured_subdir);
    let dir = if subdir.is_absolute() {
        subdir.to_path_buf()
    } else {
        let doc_dir = document.parent().unwrap_or_else(|| Path::new(""));
        doc_dir.join(subdir)
    };

    let path = dir.join(file_name);
    debug!("Resolved image path: {}", path.display());
    Ok(ResolvedImagePath { path })
}

/// `s` + HHmmss + MMDD + YYYY + `.png`.
pub fn timestamp_name(now: NaiveDateTime) -> String {
    now.format("s%H%M%S%m%d%Y.png").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 4)
            .unwrap()
    }

    #[test]
    fn timestamp_name_format() {
        assert_eq!(timestamp_name(fixed_clock()), "s09050403072026.png");
    }

    #[test]
    fn unnamed_image_uses_timestamp() {
        let r = resolve_at(Path::new("/docs/note.md"), None, "img", fixed_clock()).unwrap();
        assert_eq!(r.path(), Path::new("/docs/img/s09050403072026.png"));
        assert_eq!(r.dir(), Path::new("/docs/img"));
        assert_eq!(r.stem(), "s09050403072026");
    }

    #[test]
    fn selection_names_the_image() {
        let r = resolve_at(
            Path::new("/docs/note.md"),
            Some("diagram-1"),
            "img",
            fixed_clock(),
        )
        .unwrap();
        assert_eq!(r.file_name(), "diagram-1.png");
        assert_eq!(r.path(), Path::new("/docs/img/diagram-1.png"));
    }

    #[test]
    fn empty_selection_is_no_selection() {
        let r = resolve_at(Path::new("/docs/note.md"), Some(""), "img", fixed_clock()).unwrap();
        assert_eq!(r.file_name(), "s09050403072026.png");
    }

    #[test]
    fn valid_names_accepted() {
        for name in ["a", "diagram-1", "fig_2.v3", "A.B-C_d", "..", "123"] {
            assert!(
                resolve_at(Path::new("/d/n.md"), Some(name), "img", fixed_clock()).is_ok(),
                "{name} should be accepted"
            );
        }
    }

    #[test]
    fn invalid_names_rejected() {
        for name in ["a/b", "a b", "x\\y", "ü", "name?", "tab\t", "a:b"] {
            let err =
                resolve_at(Path::new("/d/n.md"), Some(name), "img", fixed_clock()).unwrap_err();
            assert!(
                matches!(err, OkmdError::InvalidName { .. }),
                "{name} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn absolute_subdir_used_verbatim() {
        let r = resolve_at(
            Path::new("/docs/note.md"),
            Some("x"),
            "/srv/images",
            fixed_clock(),
        )
        .unwrap();
        assert_eq!(r.dir(), Path::new("/srv/images"));
    }

    #[test]
    fn relative_subdir_joins_document_dir() {
        let r = resolve_at(
            Path::new("/docs/notes/week.md"),
            Some("x"),
            "../shared",
            fixed_clock(),
        )
        .unwrap();
        assert_eq!(r.dir(), Path::new("/docs/notes/../shared"));
    }

    #[test]
    fn empty_subdir_means_document_dir() {
        let r = resolve_at(Path::new("/docs/note.md"), Some("x"), "", fixed_clock()).unwrap();
        assert_eq!(r.path(), Path::new("/docs/x.png"));
    }

    #[test]
    fn whitespace_subdir_rejected() {
        for subdir in [" img", "img ", "\timg", "img\n"] {
            let err = resolve_at(Path::new("/docs/note.md"), None, subdir, fixed_clock())
                .unwrap_err();
            assert!(matches!(err, OkmdError::InvalidConfig(_)), "{subdir:?}");
        }
    }

    #[test]
    fn name_checked_before_config() {
        let err = resolve_at(Path::new("/docs/note.md"), Some("a/b"), " img", fixed_clock())
            .unwrap_err();
        assert!(matches!(err, OkmdError::InvalidName { .. }));
    }
}
