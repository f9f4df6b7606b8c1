use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Opaque version marker; a write must carry the current one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobVersion(pub String);

impl fmt::Display for BlobVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Content of a blob together with the version it was read at.
///
/// `content` is empty when the backend only reports the version, as GitHub
/// does for large files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedBlob {
  pub content: Vec<u8>,
  pub version: BlobVersion,
}

/// A write request. `version` is `None` only when creating a new blob.
#[derive(Debug, Clone)]
pub struct BlobWrite {
  /// Change description recorded by the store
  pub message: String,
  pub content: Vec<u8>,
  pub version: Option<BlobVersion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
  #[error("GitHub token missing. Set FOLIO_GITHUB_TOKEN or GITHUB_TOKEN")]
  MissingCredential,
  #[error("{0}")]
  Transport(String),
  /// Non-success response; `message` is what the remote reported
  #[error("{message}")]
  Remote { status: u16, message: String },
  #[error("Failed to decode blob: {0}")]
  Decode(String),
  #[error("Failed to encode projects: {0}")]
  Encode(String),
  #[error("Invalid asset path: {0}")]
  InvalidAssetPath(String),
  #[error("Asset not found: {0}")]
  AssetNotFound(String),
  #[error("Invalid store configuration: {0}")]
  Config(String),
}

/// Versioned blob store capability.
///
/// Paths are relative to the store root and use `/` separators.
#[async_trait]
pub trait BlobStore: Send + Sync {
  /// Whether authenticated operations can be attempted at all.
  fn has_credential(&self) -> bool;

  /// Unauthenticated read of the published content at `path`.
  async fn read_published(&self, path: &str) -> Result<Vec<u8>, StoreError>;

  /// Authenticated read returning content and current version.
  async fn fetch(&self, path: &str) -> Result<VersionedBlob, StoreError>;

  /// Create or overwrite the blob at `path`.
  async fn write(&self, path: &str, write: BlobWrite) -> Result<(), StoreError>;

  /// Delete the blob at `path`, which must still be at `version`.
  async fn delete(&self, path: &str, version: &BlobVersion, message: &str) -> Result<(), StoreError>;
}
