//! One-shot verified artifact upload
//!
//! The application binary is uploaded once per run, before any worker starts.
//! The reference handed to sessions only exists once the storage service has
//! reported the same digest that was computed locally.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gridrun_common::{digest_file, Error, STORAGE_SCHEME};
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::E2eResult;
use crate::storage::{ArtifactStore, STORAGE_DIGEST};

/// A verified upload of the application under test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReference {
    local_path: PathBuf,
    remote_uri: Option<String>,
}

impl ArtifactReference {
    pub(crate) fn verified(local_path: PathBuf, file_name: &str) -> Self {
        Self {
            local_path,
            remote_uri: Some(storage_uri(file_name)),
        }
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// `sauce-storage:<basename>`; present only after verification succeeded
    pub fn remote_uri(&self) -> Option<&str> {
        self.remote_uri.as_deref()
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.remote_uri {
            Some(uri) => f.write_str(uri),
            None => write!(f, "{} (not uploaded)", self.local_path.display()),
        }
    }
}

/// Storage reference the grid resolves at session creation
pub fn storage_uri(file_name: &str) -> String {
    format!("{}:{}", STORAGE_SCHEME, file_name)
}

/// Uploads the artifact at most once and caches the verified reference
pub struct ArtifactUploader {
    store: Arc<dyn ArtifactStore>,
    uploaded: OnceCell<ArtifactReference>,
}

impl ArtifactUploader {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            uploaded: OnceCell::new(),
        }
    }

    /// Upload `path` unless a verified reference already exists
    pub async fn upload(&self, path: Option<&Path>) -> E2eResult<ArtifactReference> {
        let reference = self
            .uploaded
            .get_or_try_init(|| self.upload_and_verify(path))
            .await?;
        Ok(reference.clone())
    }

    /// The verified reference, if the upload already ran
    pub fn reference(&self) -> Option<&ArtifactReference> {
        self.uploaded.get()
    }

    async fn upload_and_verify(&self, path: Option<&Path>) -> E2eResult<ArtifactReference> {
        let local = digest_file(path, STORAGE_DIGEST).await?;
        // digest_file has already rejected an absent path
        let path = path.ok_or_else(|| Error::InvalidConfig("artifact path missing".into()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::InvalidConfig(format!("artifact path {} has no file name", path.display()))
            })?;

        let stored = self.store.upload(path, &file_name).await?;

        if stored.digest != local {
            return Err(Error::IntegrityError(format!(
                "File upload failed! Digests do not match for {}: local {}, remote {}",
                file_name, local, stored.digest
            ))
            .into());
        }

        let reference = ArtifactReference::verified(path.to_path_buf(), &file_name);
        info!("File: {} uploaded successfully as {}", path.display(), reference);
        Ok(reference)
    }
}
