//! Content digests of local files
//!
//! Files are streamed through the hasher in fixed-size chunks so large
//! application bundles never have to fit in memory.

use std::fmt;
use std::path::Path;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::{Error, Result, ARTIFACT_HINT};

const CHUNK_SIZE: usize = 64 * 1024;

/// Hash algorithm a digest was produced with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Md5,
    Sha256,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Sha256 => "sha256",
        }
    }
}

/// A hex-encoded digest tagged with its algorithm.
///
/// Two digests are only equal when both the algorithm and the (lowercased)
/// hex text match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDigest {
    pub algorithm: DigestAlgorithm,
    pub hex: String,
}

impl FileDigest {
    pub fn new(algorithm: DigestAlgorithm, hex: impl AsRef<str>) -> Self {
        Self {
            algorithm,
            hex: hex.as_ref().trim().to_ascii_lowercase(),
        }
    }
}

impl fmt::Display for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.as_str(), self.hex)
    }
}

enum Hasher {
    Md5(Md5),
    Sha256(Sha256),
}

impl Hasher {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Md5 => Hasher::Md5(Md5::new()),
            DigestAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Md5(h) => h.update(data),
            Hasher::Sha256(h) => h.update(data),
        }
    }

    fn finalize(self) -> String {
        match self {
            Hasher::Md5(h) => hex::encode(h.finalize()),
            Hasher::Sha256(h) => hex::encode(h.finalize()),
        }
    }
}

/// Compute the digest of a local file.
///
/// An absent path, a path that does not exist, or a path that is not a
/// regular file is a configuration error carrying the `APP_ZIP` hint.
pub async fn digest_file(path: Option<&Path>, algorithm: DigestAlgorithm) -> Result<FileDigest> {
    let path = path.ok_or_else(|| Error::InvalidConfig(ARTIFACT_HINT.to_string()))?;

    let is_file = fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(Error::InvalidConfig(format!(
            "artifact not found at {}\n{}",
            path.display(),
            ARTIFACT_HINT
        )));
    }

    let mut file = fs::File::open(path).await?;
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        total += n as u64;
    }

    let digest = FileDigest::new(algorithm, hasher.finalize());
    debug!("Digested {} ({} bytes): {}", path.display(), total, digest);
    Ok(digest)
}
