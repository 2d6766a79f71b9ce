//! Remote artifact storage
//!
//! The grid pulls application binaries from its own storage area; this module
//! pushes a local file there and reports the digest the storage API computed.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use gridrun_common::{Credentials, DigestAlgorithm, Error, FileDigest};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};
use url::Url;

use crate::error::{E2eError, E2eResult};

/// Digest algorithm the storage API reports for uploads
pub const STORAGE_DIGEST: DigestAlgorithm = DigestAlgorithm::Md5;

/// What the storage service reports back after an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub file_name: String,
    pub size: Option<u64>,
    pub digest: FileDigest,
}

/// Remote storage the grid can resolve artifacts from
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Upload `path` under `file_name` and return the remote digest
    async fn upload(&self, path: &Path, file_name: &str) -> E2eResult<StoredArtifact>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    md5: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    filename: Option<String>,
}

/// Storage REST client
pub struct SauceStorage {
    client: reqwest::Client,
    rest_endpoint: String,
    credentials: Credentials,
}

impl SauceStorage {
    pub fn new(
        rest_endpoint: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> E2eResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            rest_endpoint: rest_endpoint.into(),
            credentials,
        })
    }

    fn upload_url(&self, file_name: &str) -> E2eResult<Url> {
        let mut url = rest_url(
            &self.rest_endpoint,
            &["rest", "v1", "storage", &self.credentials.username, file_name],
        )?;
        url.query_pairs_mut().append_pair("overwrite", "true");
        Ok(url)
    }
}

#[async_trait]
impl ArtifactStore for SauceStorage {
    async fn upload(&self, path: &Path, file_name: &str) -> E2eResult<StoredArtifact> {
        let url = self.upload_url(file_name)?;
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();

        info!("Uploading {} ({} bytes) to storage", file_name, length);

        let response = self
            .client
            .post(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.access_key))
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, length)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(E2eError::Storage(format!(
                "upload of {} returned {}: {}",
                file_name, status, body
            )));
        }

        let parsed: UploadResponse = response.json().await?;
        debug!("Storage reported md5 {} for {}", parsed.md5, file_name);

        Ok(StoredArtifact {
            file_name: parsed.filename.unwrap_or_else(|| file_name.to_string()),
            size: parsed.size,
            digest: FileDigest::new(STORAGE_DIGEST, parsed.md5),
        })
    }
}

/// Join path segments onto a REST root, percent-encoding each segment
pub(crate) fn rest_url(root: &str, segments: &[&str]) -> E2eResult<Url> {
    let mut url = Url::parse(root)
        .map_err(|e| Error::InvalidConfig(format!("invalid REST endpoint {:?}: {}", root, e)))?;
    url.path_segments_mut()
        .map_err(|_| Error::InvalidConfig(format!("REST endpoint {:?} cannot carry a path", root)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
