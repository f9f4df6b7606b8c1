//! In-memory blob store used by tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::blob::{BlobStore, BlobVersion, BlobWrite, StoreError, VersionedBlob};

#[derive(Default)]
struct Inner {
  blobs: HashMap<String, VersionedBlob>,
  next_version: u64,
  fail_fetch: Option<StoreError>,
  fail_published: Option<StoreError>,
  writes: Vec<(String, BlobWrite)>,
  deletes: Vec<String>,
}

/// Versioned store kept in a map. Clones share state.
#[derive(Clone)]
pub struct MemoryBlobStore {
  inner: Arc<Mutex<Inner>>,
  credential: bool,
}

impl MemoryBlobStore {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner::default())),
      credential: true,
    }
  }

  pub fn without_credential(mut self) -> Self {
    self.credential = false;
    self
  }

  /// Put a blob directly, bumping its version.
  pub fn seed(&self, path: &str, content: &[u8]) -> BlobVersion {
    let mut inner = self.inner.lock().unwrap();
    inner.next_version += 1;
    let version = BlobVersion(format!("v{}", inner.next_version));
    inner.blobs.insert(
      path.to_string(),
      VersionedBlob {
        content: content.to_vec(),
        version: version.clone(),
      },
    );
    version
  }

  pub fn content(&self, path: &str) -> Option<Vec<u8>> {
    let inner = self.inner.lock().unwrap();
    inner.blobs.get(path).map(|b| b.content.clone())
  }

  pub fn fail_fetch_with(&self, error: StoreError) {
    self.inner.lock().unwrap().fail_fetch = Some(error);
  }

  pub fn fail_published_with(&self, error: StoreError) {
    self.inner.lock().unwrap().fail_published = Some(error);
  }

  /// Paths and requests of every write attempted, accepted or not.
  pub fn writes(&self) -> Vec<(String, BlobWrite)> {
    self.inner.lock().unwrap().writes.clone()
  }

  pub fn deletes(&self) -> Vec<String> {
    self.inner.lock().unwrap().deletes.clone()
  }

  fn ensure_credential(&self) -> Result<(), StoreError> {
    if self.credential {
      Ok(())
    } else {
      Err(StoreError::MissingCredential)
    }
  }
}

fn not_found() -> StoreError {
  StoreError::Remote {
    status: 404,
    message: "Not Found".to_string(),
  }
}

fn conflict(path: &str, version: &BlobVersion) -> StoreError {
  StoreError::Remote {
    status: 409,
    message: format!("{} does not match {}", path, version),
  }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
  fn has_credential(&self) -> bool {
    self.credential
  }

  async fn read_published(&self, path: &str) -> Result<Vec<u8>, StoreError> {
    let inner = self.inner.lock().unwrap();
    if let Some(e) = &inner.fail_published {
      return Err(e.clone());
    }
    inner
      .blobs
      .get(path)
      .map(|b| b.content.clone())
      .ok_or_else(not_found)
  }

  async fn fetch(&self, path: &str) -> Result<VersionedBlob, StoreError> {
    self.ensure_credential()?;
    let inner = self.inner.lock().unwrap();
    if let Some(e) = &inner.fail_fetch {
      return Err(e.clone());
    }
    inner.blobs.get(path).cloned().ok_or_else(not_found)
  }

  async fn write(&self, path: &str, write: BlobWrite) -> Result<(), StoreError> {
    self.ensure_credential()?;
    {
      let mut inner = self.inner.lock().unwrap();
      inner.writes.push((path.to_string(), write.clone()));

      let current = inner.blobs.get(path).map(|b| b.version.clone());
      match (&current, &write.version) {
        (Some(current), Some(given)) if current != given => return Err(conflict(path, given)),
        (Some(_), None) => {
          return Err(StoreError::Remote {
            status: 422,
            message: "\"sha\" wasn't supplied.".to_string(),
          })
        }
        (None, Some(_)) => return Err(not_found()),
        _ => {}
      }
    }

    self.seed(path, &write.content);
    Ok(())
  }

  async fn delete(&self, path: &str, version: &BlobVersion, _message: &str) -> Result<(), StoreError> {
    self.ensure_credential()?;
    let mut inner = self.inner.lock().unwrap();
    inner.deletes.push(path.to_string());

    match inner.blobs.get(path) {
      None => Err(not_found()),
      Some(blob) if &blob.version != version => Err(conflict(path, version)),
      Some(_) => {
        inner.blobs.remove(path);
        Ok(())
      }
    }
  }
}
