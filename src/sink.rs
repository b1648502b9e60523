//! Insertion sinks: where the finished markdown snippet goes.

use crate::error::OkmdError;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Receives the markdown snippet for insertion at the editor caret.
#[async_trait]
pub trait InsertionSink: Send + Sync {
    async fn insert(&self, snippet: &str) -> Result<(), OkmdError>;
}

/// A 1-based `line:column` caret position. Columns count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub line: usize,
    pub column: usize,
}

impl FromStr for Caret {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (line, column) = s
            .split_once(':')
            .ok_or_else(|| format!("expected LINE:COLUMN, got '{s}'"))?;
        let line: usize = line
            .trim()
            .parse()
            .map_err(|_| format!("invalid line in '{s}'"))?;
        let column: usize = column
            .trim()
            .parse()
            .map_err(|_| format!("invalid column in '{s}'"))?;
        if line == 0 || column == 0 {
            return Err(format!("line and column are 1-based, got '{s}'"));
        }
        Ok(Caret { line, column })
    }
}

impl fmt::Display for Caret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Byte offset of `caret` in `text`.
///
/// A column past the end of its line clamps to the end of that line (before
/// the line break); a line past the end of the text clamps to the end.
pub fn caret_offset(text: &str, caret: Caret) -> usize {
    let mut offset = 0;
    for (idx, line) in text.split_inclusive('\n').enumerate() {
        if idx + 1 == caret.line {
            let content = line.strip_suffix('\n').unwrap_or(line);
            let content = content.strip_suffix('\r').unwrap_or(content);
            let within = content
                .char_indices()
                .nth(caret.column.saturating_sub(1))
                .map(|(i, _)| i)
                .unwrap_or(content.len());
            return offset + within;
        }
        offset += line.len();
    }
    text.len()
}

/// Splices the snippet into a document file on disk.
#[derive(Debug, Clone)]
pub struct DocumentSink {
    path: PathBuf,
    caret: Option<Caret>,
}

impl DocumentSink {
    /// Insert at `caret`, or append when `None`.
    pub fn new(path: impl Into<PathBuf>, caret: Option<Caret>) -> Self {
        Self {
            path: path.into(),
            caret,
        }
    }

    fn error(&self, source: std::io::Error) -> OkmdError {
        OkmdError::InsertFailed {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl InsertionSink for DocumentSink {
    async fn insert(&self, snippet: &str) -> Result<(), OkmdError> {
        // Write through symlinks to the real document.
        let target = tokio::fs::canonicalize(&self.path)
            .await
            .map_err(|e| self.error(e))?;
        let mut text = tokio::fs::read_to_string(&target)
            .await
            .map_err(|e| self.error(e))?;
        let permissions = tokio::fs::metadata(&target)
            .await
            .map_err(|e| self.error(e))?
            .permissions();

        let at = match self.caret {
            Some(caret) => caret_offset(&text, caret),
            None => text.len(),
        };
        text.insert_str(at, snippet);

        replace_file(&target, &text, permissions)
            .await
            .map_err(|e| self.error(e))?;

        debug!("Inserted {} bytes at offset {} of {}", snippet.len(), at, target.display());
        Ok(())
    }
}

/// Atomically replace `target` with `contents`, keeping `permissions`.
///
/// The temp file is removed again if any step fails.
async fn replace_file(
    target: &Path,
    contents: &str,
    permissions: std::fs::Permissions,
) -> std::io::Result<()> {
    let mut tmp = target.as_os_str().to_owned();
    tmp.push(".okmd.tmp");
    let tmp = PathBuf::from(tmp);

    let result = async {
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::set_permissions(&tmp, permissions).await?;
        tokio::fs::rename(&tmp, target).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}

/// Prints the snippet on stdout for hosts that insert it themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

#[async_trait]
impl InsertionSink for StdoutSink {
    async fn insert(&self, snippet: &str) -> Result<(), OkmdError> {
        let mut stdout = tokio::io::stdout();
        let line = format!("{snippet}\n");
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(|e| OkmdError::InsertFailed {
                path: PathBuf::from("<stdout>"),
                source: e,
            })?;
        stdout.flush().await.map_err(|e| OkmdError::InsertFailed {
            path: PathBuf::from("<stdout>"),
            source: e,
        })
    }
}
