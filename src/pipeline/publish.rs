//! Publishing: upload the captured image and return its public URL.
//!
//! [`QiniuPublisher`] implements the Qiniu form-upload protocol:
//!
//! 1. Build a put-policy `{"scope": "<bucket>:<key>", "deadline": <unix>}`.
//! 2. URL-safe base64 it, sign the encoded policy with HMAC-SHA1 keyed by the
//!    secret key, and join `access_key:sign:policy` into an upload token.
//! 3. `POST` a multipart form (`token`, `key`, `x:installation`, `file`) to
//!    the upload endpoint.
//! 4. The response echoes the stored key; the public URL is `domain/key`.
//!
//! No retries: a failed upload surfaces as [`OkmdError::Upload`] once.

use crate::config::UploadConfig;
use crate::error::OkmdError;
use crate::installation::InstallationId;
use crate::output::UploadResult;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::Sha1;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

type HmacSha1 = Hmac<Sha1>;

/// Upload tokens stay valid for one hour.
const TOKEN_TTL_SECS: i64 = 3600;

/// Anything that can turn a local image into a public URL.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Upload `local_image`, captured for `document`.
    ///
    /// `installation_id` is attached to the upload as a tag; it never appears
    /// in the returned name or URL.
    async fn publish(
        &self,
        local_image: &Path,
        document: &Path,
        installation_id: &InstallationId,
    ) -> Result<UploadResult, OkmdError>;
}

/// Publishes to a Qiniu Kodo bucket.
pub struct QiniuPublisher {
    config: UploadConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    key: String,
}

impl QiniuPublisher {
    /// Validate credentials and build the HTTP client.
    pub fn new(config: UploadConfig) -> Result<Self, OkmdError> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("okmd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OkmdError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Object key: `[prefix/]<document stem>/<image file name>`.
    pub fn object_key(&self, local_image: &Path, document: &Path) -> String {
        let file_name = local_image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.png".to_string());
        let doc_stem = document
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut parts: Vec<String> = Vec::new();
        if let Some(prefix) = self.config.key_prefix.as_deref() {
            let prefix = prefix.trim_matches('/');
            if !prefix.is_empty() {
                parts.push(prefix.to_string());
            }
        }
        if !doc_stem.is_empty() {
            parts.push(doc_stem);
        }
        parts.push(file_name);
        parts.join("/")
    }

    /// Signed upload token for `key`, valid until `deadline` (unix seconds).
    pub fn upload_token(&self, key: &str, deadline: i64) -> Result<String, OkmdError> {
        let policy = serde_json::json!({
            "scope": format!("{}:{}", self.config.bucket, key),
            "deadline": deadline,
        });
        let encoded_policy = URL_SAFE.encode(policy.to_string());

        let mut mac = HmacSha1::new_from_slice(self.config.secret_key.as_bytes())
            .map_err(|e| OkmdError::Internal(format!("HMAC key: {e}")))?;
        mac.update(encoded_policy.as_bytes());
        let sign = URL_SAFE.encode(mac.finalize().into_bytes());

        Ok(format!("{}:{}:{}", self.config.access_key, sign, encoded_policy))
    }

    /// Public URL for a stored key.
    pub fn public_url(&self, key: &str) -> String {
        let domain = self.config.domain.trim().trim_end_matches('/');
        let base = if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        };
        format!("{}/{}", base, key.trim_start_matches('/'))
    }
}

#[async_trait]
impl Publisher for QiniuPublisher {
    async fn publish(
        &self,
        local_image: &Path,
        document: &Path,
        installation_id: &InstallationId,
    ) -> Result<UploadResult, OkmdError> {
        let key = self.object_key(local_image, document);
        let deadline = chrono::Utc::now().timestamp() + TOKEN_TTL_SECS;
        let token = self.upload_token(&key, deadline)?;

        let bytes = tokio::fs::read(local_image)
            .await
            .map_err(|e| OkmdError::Upload {
                reason: format!("reading '{}': {e}", local_image.display()),
            })?;
        info!("Uploading {} ({} bytes) as '{}'", local_image.display(), bytes.len(), key);

        let file_name = local_image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.png".to_string());
        let file_part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/png")
            .map_err(|e| OkmdError::Internal(format!("multipart: {e}")))?;

        let form = Form::new()
            .text("token", token)
            .text("key", key.clone())
            .text("x:installation", installation_id.as_str().to_string())
            .part("file", file_part);

        let response = self
            .client
            .post(&self.config.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| OkmdError::Upload {
                reason: if e.is_timeout() {
                    format!("timed out after {}s", self.config.timeout_secs)
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OkmdError::Upload {
                reason: format!("HTTP {status}: {}", body.trim()),
            });
        }

        let stored: PutResponse = response.json().await.map_err(|e| OkmdError::Upload {
            reason: format!("unexpected response: {e}"),
        })?;
        debug!("Stored as '{}'", stored.key);

        let name = local_image
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| stored.key.clone());

        Ok(UploadResult {
            name,
            url: self.public_url(&stored.key),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publisher(prefix: Option<&str>) -> QiniuPublisher {
        QiniuPublisher::new(UploadConfig {
            access_key: "AK".into(),
            secret_key: "SK".into(),
            bucket: "notes".into(),
            domain: "cdn.example/".into(),
            key_prefix: prefix.map(str::to_string),
            ..UploadConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn rejects_missing_credentials() {
        let err = QiniuPublisher::new(UploadConfig::default()).err().unwrap();
        assert!(matches!(err, OkmdError::InvalidConfig(_)));
    }

    #[test]
    fn object_key_layout() {
        let p = publisher(None);
        assert_eq!(
            p.object_key(Path::new("/docs/img/s1.png"), Path::new("/docs/note.md")),
            "note/s1.png"
        );

        let p = publisher(Some("/blog/"));
        assert_eq!(
            p.object_key(Path::new("/docs/img/s1.png"), Path::new("/docs/note.md")),
            "blog/note/s1.png"
        );
    }

    #[test]
    fn public_url_normalises_domain() {
        let p = publisher(None);
        assert_eq!(p.public_url("note/s1.png"), "https://cdn.example/note/s1.png");
        assert_eq!(p.public_url("/note/s1.png"), "https://cdn.example/note/s1.png");
    }

    #[test]
    fn public_url_keeps_explicit_scheme() {
        let p = QiniuPublisher::new(UploadConfig {
            access_key: "AK".into(),
            secret_key: "SK".into(),
            bucket: "notes".into(),
            domain: "http://img.example".into(),
            ..UploadConfig::default()
        })
        .unwrap();
        assert_eq!(p.public_url("a.png"), "http://img.example/a.png");
    }

    #[test]
    fn upload_token_is_signed_policy() {
        let p = publisher(None);
        let token = p.upload_token("note/s1.png", 1_700_000_000).unwrap();
        let parts: Vec<&str> = token.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "AK");

        let policy: serde_json::Value =
            serde_json::from_slice(&URL_SAFE.decode(parts[2]).unwrap()).unwrap();
        assert_eq!(policy["scope"], "notes:note/s1.png");
        assert_eq!(policy["deadline"], 1_700_000_000);

        let mut mac = HmacSha1::new_from_slice(b"SK").unwrap();
        mac.update(parts[2].as_bytes());
        mac.verify_slice(&URL_SAFE.decode(parts[1]).unwrap())
            .expect("signature must verify with the secret key");
    }

    // ── Upload over HTTP ─────────────────────────────────────────────────

    mod upload {
        use super::*;
        use mockito::{Matcher, Server};

        fn publisher_at(upload_url: String) -> QiniuPublisher {
            QiniuPublisher::new(UploadConfig {
                access_key: "AK".into(),
                secret_key: "SK".into(),
                bucket: "notes".into(),
                domain: "cdn.example".into(),
                upload_url,
                timeout_secs: 5,
                ..UploadConfig::default()
            })
            .unwrap()
        }

        fn image(dir: &Path) -> std::path::PathBuf {
            let path = dir.join("shot.png");
            std::fs::write(&path, "fake png bytes").unwrap();
            path
        }

        fn installation() -> InstallationId {
            InstallationId::from("inst-123".to_string())
        }

        #[tokio::test]
        async fn sends_form_fields_and_builds_url_from_returned_key() {
            let mut server = Server::new_async().await;
            let mock = server
                .mock("POST", "/")
                .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
                .match_body(Matcher::AllOf(vec![
                    Matcher::Regex(r#"name="token"\r\n\r\nAK:"#.into()),
                    Matcher::Regex(r#"name="key"\r\n\r\nnote/shot\.png"#.into()),
                    Matcher::Regex(r#"name="x:installation"\r\n\r\ninst-123"#.into()),
                    Matcher::Regex(r#"name="file"; filename="shot\.png""#.into()),
                    Matcher::Regex("fake png bytes".into()),
                ]))
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"key":"stored/shot.png","hash":"Fh8x"}"#)
                .create_async()
                .await;

            let tmp = tempfile::tempdir().unwrap();
            let result = publisher_at(server.url())
                .publish(&image(tmp.path()), Path::new("/docs/note.md"), &installation())
                .await
                .unwrap();

            mock.assert_async().await;
            assert_eq!(result.name, "shot");
            assert_eq!(result.url, "https://cdn.example/stored/shot.png");
        }

        #[tokio::test]
        async fn error_status_is_an_upload_error() {
            let mut server = Server::new_async().await;
            let mock = server
                .mock("POST", "/")
                .with_status(401)
                .with_body(r#"{"error":"bad token"}"#)
                .create_async()
                .await;

            let tmp = tempfile::tempdir().unwrap();
            let err = publisher_at(server.url())
                .publish(&image(tmp.path()), Path::new("/docs/note.md"), &installation())
                .await
                .unwrap_err();

            mock.assert_async().await;
            match err {
                OkmdError::Upload { reason } => {
                    assert!(reason.contains("401"), "{reason}");
                    assert!(reason.contains("bad token"), "{reason}");
                }
                other => panic!("expected an upload error, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn success_without_key_is_an_upload_error() {
            let mut server = Server::new_async().await;
            let mock = server
                .mock("POST", "/")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"hash":"Fh8x"}"#)
                .create_async()
                .await;

            let tmp = tempfile::tempdir().unwrap();
            let err = publisher_at(server.url())
                .publish(&image(tmp.path()), Path::new("/docs/note.md"), &installation())
                .await
                .unwrap_err();

            mock.assert_async().await;
            assert!(matches!(err, OkmdError::Upload { .. }), "got {err:?}");
        }
    }
}
