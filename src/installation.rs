//! Installation id and the small key-value state file that persists it.
//!
//! The id is created on first run, stored under [`INSTALLATION_KEY`], and
//! reused by every later run. It is loaded once at startup and passed down
//! explicitly; nothing in the library reads it from ambient state.

use crate::error::OkmdError;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Key of the installation id in the state file.
pub const INSTALLATION_KEY: &str = "installation.uuid";

/// Opaque per-installation identifier attached to uploads as a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationId(String);

impl InstallationId {
    /// A fresh random (v4) id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for InstallationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for InstallationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A JSON object on disk mapping string keys to values.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/okmd/state.json`, e.g. `~/.local/share/okmd/state.json`.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .unwrap_or_else(std::env::temp_dir)
            .join("okmd")
            .join("state.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a string value. A missing file reads as empty.
    pub async fn get(&self, key: &str) -> Result<Option<String>, OkmdError> {
        let map = self.load().await?;
        Ok(map.get(key).and_then(Value::as_str).map(str::to_string))
    }

    /// Write a string value, preserving every other key.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), OkmdError> {
        let mut map = self.load().await?;
        map.insert(key.to_string(), Value::String(value.to_string()));

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.error(e))?;
        }

        let json = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| self.error(e))?;

        write_atomically(&self.path, &json)
            .await
            .map_err(|e| self.error(e))
    }

    async fn load(&self) -> Result<Map<String, Value>, OkmdError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(self.error(e)),
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&text).map_err(|e| self.error(e))? {
            Value::Object(map) => Ok(map),
            _ => Err(self.error("expected a JSON object")),
        }
    }

    fn error(&self, reason: impl fmt::Display) -> OkmdError {
        OkmdError::State {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Write to a sibling temp file, then rename over `path`. The temp file is
/// removed if either step fails.
async fn write_atomically(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = match tokio::fs::write(&tmp, contents).await {
        Ok(()) => tokio::fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}

/// Return the stored installation id, generating and persisting one on
/// first use.
pub async fn load_or_create_installation_id(
    store: &StateStore,
) -> Result<InstallationId, OkmdError> {
    if let Some(existing) = store.get(INSTALLATION_KEY).await? {
        if !existing.is_empty() {
            debug!("Existing installation id loaded from {}", store.path().display());
            return Ok(InstallationId::from(existing));
        }
    }

    let id = InstallationId::generate();
    store.set(INSTALLATION_KEY, id.as_str()).await?;
    info!("Generated new installation id in {}", store.path().display());
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generated_once_then_reused() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path().join("nested/state.json"));

        let first = load_or_create_installation_id(&store).await.unwrap();
        let second = load_or_create_installation_id(&store).await.unwrap();

        assert_eq!(first, second);
        assert!(uuid::Uuid::parse_str(first.as_str()).is_ok());
        assert_eq!(
            store.get(INSTALLATION_KEY).await.unwrap().as_deref(),
            Some(first.as_str())
        );
    }

    #[tokio::test]
    async fn other_keys_preserved() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();
        let store = StateStore::new(&path);

        load_or_create_installation_id(&store).await.unwrap();

        assert_eq!(store.get("theme").await.unwrap().as_deref(), Some("dark"));
    }

    #[tokio::test]
    async fn corrupt_state_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let err = load_or_create_installation_id(&StateStore::new(&path))
            .await
            .unwrap_err();
        assert!(matches!(err, OkmdError::State { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_rename_removes_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("state.json");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "x").unwrap();

        assert!(write_atomically(&target, "{}").await.is_err());
        assert!(!tmp.path().join("state.json.tmp").exists());
    }

    #[test]
    fn default_path_ends_in_state_json() {
        let p = StateStore::default_path();
        assert!(p.ends_with("okmd/state.json"));
    }
}
