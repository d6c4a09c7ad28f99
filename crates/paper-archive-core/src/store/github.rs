//! GitHub repository used as an object store, via the contents API.
//!
//! One repository holds the whole archive; each owner's artifacts live under
//! a directory named after the owner id. The contents API identifies blobs by
//! sha, so overwrite and delete both resolve the current sha first.

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ArchiveStore, ObjectInfo};
use crate::config::StoreConfig;
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("paper-archive/", env!("CARGO_PKG_VERSION"));

pub struct GithubStore {
    client: Client,
    config: StoreConfig,
}

#[derive(Debug, Deserialize)]
struct ContentsEntry {
    name: String,
    path: String,
    sha: String,
    #[serde(rename = "type")]
    entry_type: String,
}

#[derive(Debug, Deserialize)]
struct FileMeta {
    sha: String,
}

impl GithubStore {
    /// Create a store for the configured repository.
    ///
    /// # Panics
    /// Panics if the HTTP client cannot be created, which should only happen
    /// in extreme circumstances (e.g., TLS backend unavailable on the system).
    #[allow(clippy::expect_used)]
    pub fn new(config: StoreConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Contents API URL for a repository path. Each segment is
    /// percent-encoded so Unicode titles survive the trip.
    fn contents_url(&self, path: &str) -> String {
        let encoded: Vec<_> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.repo_owner,
            self.config.repo_name,
            encoded.join("/")
        )
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let req = req.header("X-GitHub-Api-Version", "2022-11-28");
        match &self.config.token {
            Some(token) => req.header("Authorization", format!("Bearer {token}")),
            None => req,
        }
    }

    /// Resolve the current blob sha for a key, or `None` if absent.
    async fn resolve_sha(&self, key: &str) -> Result<Option<String>> {
        let url = self.contents_url(key);
        let resp = self
            .authorize(self.client.get(&url))
            .query(&[("ref", self.config.branch.as_str())])
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| Error::RemoteReadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let meta: FileMeta = resp.json().await.map_err(|e| Error::RemoteReadFailed {
                    key: key.to_string(),
                    reason: format!("invalid metadata: {e}"),
                })?;
                Ok(Some(meta.sha))
            }
            status => Err(Error::RemoteReadFailed {
                key: key.to_string(),
                reason: format!("HTTP {status}"),
            }),
        }
    }
}

#[async_trait]
impl ArchiveStore for GithubStore {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let dir = prefix.trim_end_matches('/');
        let url = self.contents_url(dir);

        let resp = self
            .authorize(self.client.get(&url))
            .query(&[("ref", self.config.branch.as_str())])
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| Error::RemoteListFailed {
                prefix: prefix.to_string(),
                reason: e.to_string(),
            })?;

        // An owner with no uploads yet has no directory; that's an empty
        // listing, not an error.
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(Error::RemoteListFailed {
                prefix: prefix.to_string(),
                reason: format!("HTTP {}", resp.status()),
            });
        }

        let entries: Vec<ContentsEntry> =
            resp.json().await.map_err(|e| Error::RemoteListFailed {
                prefix: prefix.to_string(),
                reason: format!("invalid listing: {e}"),
            })?;

        debug!("Listed {} entries under {}", entries.len(), prefix);

        Ok(entries
            .into_iter()
            .filter(|e| e.entry_type == "file")
            .map(|e| ObjectInfo {
                key: if e.path.is_empty() {
                    format!("{dir}/{}", e.name)
                } else {
                    e.path
                },
                revision: e.sha,
            })
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let url = self.contents_url(key);

        // The raw media type returns file bytes directly, skipping the
        // base64 round trip of the JSON representation.
        let resp = self
            .authorize(self.client.get(&url))
            .query(&[("ref", self.config.branch.as_str())])
            .header("Accept", "application/vnd.github.raw+json")
            .send()
            .await
            .map_err(|e| Error::RemoteReadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(Error::NotFound(key.to_string())),
            status if status.is_success() => {
                resp.bytes().await.map_err(|e| Error::RemoteReadFailed {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
            status => Err(Error::RemoteReadFailed {
                key: key.to_string(),
                reason: format!("HTTP {status}"),
            }),
        }
    }

    async fn put(&self, key: &str, bytes: Bytes, message: &str) -> Result<()> {
        // Re-archiving overwrites: the contents API rejects a create over an
        // existing path unless the current sha is supplied.
        let sha = self.resolve_sha(key).await?;

        let mut body = serde_json::json!({
            "message": message,
            "content": base64::engine::general_purpose::STANDARD.encode(&bytes),
            "branch": self.config.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = serde_json::Value::String(sha);
        }

        let url = self.contents_url(key);
        let resp = self
            .authorize(self.client.put(&url))
            .header("Accept", "application/vnd.github+json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::RemoteWriteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            debug!("Wrote {} ({} bytes)", key, bytes.len());
            Ok(())
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!("Write failed for {}: {} - {}", key, status, body);
            Err(Error::RemoteWriteFailed {
                key: key.to_string(),
                reason: format!("HTTP {status}: {body}"),
            })
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        // Absent key deletes as a no-op, so delete/list races and retries
        // after partial deletion both converge.
        let Some(sha) = self.resolve_sha(key).await? else {
            debug!("Delete skipped, {} already absent", key);
            return Ok(());
        };

        let body = serde_json::json!({
            "message": format!("Delete artifact: {key}"),
            "sha": sha,
            "branch": self.config.branch,
        });

        let url = self.contents_url(key);
        let resp = self
            .authorize(self.client.delete(&url))
            .header("Accept", "application/vnd.github+json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::RemoteDeleteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => {
                debug!("Deleted {}", key);
                Ok(())
            }
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(Error::RemoteDeleteFailed {
                    key: key.to_string(),
                    reason: format!("HTTP {status}: {body}"),
                })
            }
        }
    }
}
