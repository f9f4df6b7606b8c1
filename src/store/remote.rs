use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};

use super::blob::{BlobStore, BlobWrite, StoreError};
use crate::config::StoreConfig;
use crate::project::{self, Project};

const SAVED_MESSAGE: &str = "Projects saved to GitHub! Changes will be live in 2-3 minutes.";
const MAX_SLUG_LEN: usize = 50;

/// Where things live inside the blob store.
#[derive(Debug, Clone)]
pub struct StoreLayout {
  /// Path of the project collection document
  pub file_path: String,
  /// Store folder holding uploaded assets
  pub assets_folder: String,
  /// Public URL prefix the site serves `assets_folder` under
  pub asset_url_prefix: String,
}

impl From<&StoreConfig> for StoreLayout {
  fn from(config: &StoreConfig) -> Self {
    Self {
      file_path: config.file_path.clone(),
      assets_folder: config.assets_folder.trim_end_matches('/').to_string(),
      asset_url_prefix: config.asset_url_prefix.clone(),
    }
  }
}

/// An asset stored by `upload_asset`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
  /// Public URL to reference from a project
  pub url: String,
  pub message: String,
}

/// Project persistence on top of a versioned blob store.
///
/// Writes are read-version-then-write with no retry: if another writer lands
/// between the two calls the store rejects the write and the error is
/// returned as-is.
#[derive(Clone)]
pub struct RemoteProjectStore<B: BlobStore> {
  blobs: B,
  layout: StoreLayout,
}

impl<B: BlobStore> RemoteProjectStore<B> {
  pub fn new(blobs: B, layout: StoreLayout) -> Self {
    Self { blobs, layout }
  }

  /// Read the published collection.
  ///
  /// Any failure (transport, status, parse) yields an empty collection, which
  /// callers cannot tell apart from an intentionally empty store.
  pub async fn load(&self) -> Vec<Project> {
    let bytes = match self.blobs.read_published(&self.layout.file_path).await {
      Ok(bytes) => bytes,
      Err(e) => {
        warn!("Error loading projects from remote store: {}", e);
        return Vec::new();
      }
    };

    match project::from_blob(&bytes) {
      Ok(projects) => {
        info!("Loaded {} projects from remote store", projects.len());
        projects
      }
      Err(e) => {
        warn!("Remote projects are not valid JSON: {}", e);
        Vec::new()
      }
    }
  }

  /// Overwrite the remote collection with `projects`.
  pub async fn save(&self, projects: &[Project]) -> Result<String, StoreError> {
    if !self.blobs.has_credential() {
      return Err(StoreError::MissingCredential);
    }

    let current = self.blobs.fetch(&self.layout.file_path).await.map_err(|e| {
      warn!("Failed to fetch current project file: {}", e);
      e
    })?;

    let content = project::to_blob(projects).map_err(|e| StoreError::Encode(e.to_string()))?;
    let write = BlobWrite {
      message: format!("Update projects - {}", Utc::now().to_rfc3339()),
      content,
      version: Some(current.version),
    };

    self
      .blobs
      .write(&self.layout.file_path, write)
      .await
      .map_err(|e| {
        warn!("Remote save rejected: {}", e);
        e
      })?;

    info!("Saved {} projects to remote store", projects.len());
    Ok(SAVED_MESSAGE.to_string())
  }

  /// Store a new asset file and return the URL the site will serve it under.
  pub async fn upload_asset(
    &self,
    file_name: &str,
    bytes: Vec<u8>,
    project_title: &str,
  ) -> Result<UploadedAsset, StoreError> {
    if !self.blobs.has_credential() {
      return Err(StoreError::MissingCredential);
    }

    let name = asset_file_name(project_title, file_name, Utc::now().timestamp_millis());
    let path = format!("{}/{}", self.layout.assets_folder, name);

    self
      .blobs
      .write(
        &path,
        BlobWrite {
          message: format!("Add video: {}", name),
          content: bytes,
          version: None,
        },
      )
      .await?;

    info!("Uploaded asset {}", path);
    Ok(UploadedAsset {
      url: format!("{}{}", self.layout.asset_url_prefix, name),
      message: format!("Video uploaded successfully: {}", name),
    })
  }

  /// Remove an uploaded asset by its public URL.
  ///
  /// Only URLs under the configured asset prefix are accepted.
  pub async fn delete_asset(&self, asset_url: &str) -> Result<String, StoreError> {
    let file_name = self.asset_file(asset_url)?;

    if !self.blobs.has_credential() {
      return Err(StoreError::MissingCredential);
    }

    let path = format!("{}/{}", self.layout.assets_folder, file_name);
    let current = self.blobs.fetch(&path).await.map_err(|e| {
      warn!("Asset {} not readable: {}", path, e);
      StoreError::AssetNotFound(asset_url.to_string())
    })?;

    self
      .blobs
      .delete(&path, &current.version, &format!("Delete video: {}", file_name))
      .await?;

    info!("Deleted asset {}", path);
    Ok("Video deleted successfully".to_string())
  }

  /// Whether `url` points at an asset this store manages.
  pub fn is_managed_asset(&self, url: &str) -> bool {
    self.asset_file(url).is_ok()
  }

  fn asset_file<'a>(&self, asset_url: &'a str) -> Result<&'a str, StoreError> {
    let invalid = || StoreError::InvalidAssetPath(asset_url.to_string());

    let file_name = asset_url
      .strip_prefix(self.layout.asset_url_prefix.as_str())
      .ok_or_else(invalid)?;

    if file_name.is_empty() || file_name.contains('/') || file_name.contains('\\') || file_name == ".." {
      return Err(invalid());
    }

    Ok(file_name)
  }
}

/// `<slug>-<millis>.<ext>`, slug limited to lowercase alphanumerics and dashes.
fn asset_file_name(project_title: &str, original_name: &str, millis: i64) -> String {
  let mut slug = String::new();
  for c in project_title.to_lowercase().chars() {
    let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
      c
    } else {
      '-'
    };
    if c == '-' && slug.ends_with('-') {
      continue;
    }
    slug.push(c);
  }
  let slug: String = slug.chars().take(MAX_SLUG_LEN).collect();

  match Path::new(original_name).extension().and_then(|e| e.to_str()) {
    Some(ext) => format!("{}-{}.{}", slug, millis, ext),
    None => format!("{}-{}", slug, millis),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::memory::MemoryBlobStore;
  use crate::store::GithubStore;
  use crate::project::ProjectDraft;

  fn layout() -> StoreLayout {
    StoreLayout::from(&StoreConfig::default())
  }

  fn github_store(server: &mockito::ServerGuard) -> RemoteProjectStore<GithubStore> {
    let config = StoreConfig {
      owner: "octo".to_string(),
      repo: "site".to_string(),
      api_url: server.url(),
      raw_url: server.url(),
      ..StoreConfig::default()
    };
    let github = GithubStore::new(&config, Some("secret".to_string())).unwrap();
    RemoteProjectStore::new(github, StoreLayout::from(&config))
  }

  fn sample(title: &str, tech: &[&str]) -> Project {
    ProjectDraft {
      title: title.to_string(),
      description: "desc".to_string(),
      tech: tech.iter().map(|t| t.to_string()).collect(),
      ..Default::default()
    }
    .into_project()
    .unwrap()
  }

  #[tokio::test]
  async fn test_load_parses_published_collection() {
    let blobs = MemoryBlobStore::new();
    let projects = vec![sample("a", &["C"]), sample("b", &["Rust"])];
    blobs.seed("public/projects.json", &project::to_blob(&projects).unwrap());

    let store = RemoteProjectStore::new(blobs, layout());
    assert_eq!(store.load().await, projects);
  }

  #[tokio::test]
  async fn test_load_keeps_good_entries_next_to_bad_ones() {
    let blobs = MemoryBlobStore::new();
    blobs.seed(
      "public/projects.json",
      br#"{"projects": [{"title": "A", "tech": ["C"]}, {"title": "B", "description": null}, {"tech": []}]}"#,
    );

    let store = RemoteProjectStore::new(blobs, layout());
    let loaded = store.load().await;
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[1].title, "B");
  }

  #[tokio::test]
  async fn test_load_failures_yield_empty() {
    let blobs = MemoryBlobStore::new();
    let store = RemoteProjectStore::new(blobs.clone(), layout());

    // Missing file
    assert!(store.load().await.is_empty());

    // Unparseable body
    blobs.seed("public/projects.json", b"<html>rate limited</html>");
    assert!(store.load().await.is_empty());

    // Transport failure
    blobs.fail_published_with(StoreError::Transport("connection reset".to_string()));
    assert!(store.load().await.is_empty());
  }

  #[tokio::test]
  async fn test_save_writes_with_current_version() {
    let blobs = MemoryBlobStore::new();
    let version = blobs.seed("public/projects.json", br#"{"projects": []}"#);
    let store = RemoteProjectStore::new(blobs.clone(), layout());

    let projects = vec![sample("a", &["C"])];
    let message = store.save(&projects).await.unwrap();
    assert_eq!(message, SAVED_MESSAGE);

    let writes = blobs.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].1.version, Some(version));
    assert!(writes[0].1.message.starts_with("Update projects - "));

    let stored = blobs.content("public/projects.json").unwrap();
    assert_eq!(project::from_blob(&stored).unwrap(), projects);
  }

  #[tokio::test]
  async fn test_save_without_credential_does_no_io() {
    let blobs = MemoryBlobStore::new().without_credential();
    let store = RemoteProjectStore::new(blobs.clone(), layout());

    let err = store.save(&[sample("a", &["C"])]).await.unwrap_err();
    assert_eq!(err, StoreError::MissingCredential);
    assert!(blobs.writes().is_empty());
  }

  #[tokio::test]
  async fn test_save_stops_when_version_fetch_fails() {
    let blobs = MemoryBlobStore::new();
    blobs.seed("public/projects.json", br#"{"projects": []}"#);
    blobs.fail_fetch_with(StoreError::Remote {
      status: 401,
      message: "Bad credentials".to_string(),
    });
    let store = RemoteProjectStore::new(blobs.clone(), layout());

    let err = store.save(&[sample("a", &["C"])]).await.unwrap_err();
    assert_eq!(err.to_string(), "Bad credentials");
    assert!(blobs.writes().is_empty());
  }

  #[tokio::test]
  async fn test_save_stops_when_version_fetch_fails_over_http() {
    let mut server = mockito::Server::new_async().await;
    let get = server
      .mock("GET", "/repos/octo/site/contents/public/projects.json")
      .with_status(404)
      .with_body(r#"{"message": "Not Found"}"#)
      .create_async()
      .await;
    let put = server
      .mock("PUT", "/repos/octo/site/contents/public/projects.json")
      .expect(0)
      .create_async()
      .await;

    let store = github_store(&server);
    let err = store.save(&[sample("a", &["C"])]).await.unwrap_err();
    assert_eq!(err.to_string(), "Not Found");

    get.assert_async().await;
    put.assert_async().await;
  }

  // GitHub omits inline content for files over 1 MB
  const LARGE_FILE: &str = r#"{"sha":"abc123","content":"","encoding":"none"}"#;

  #[tokio::test]
  async fn test_delete_large_asset_uses_its_sha() {
    let mut server = mockito::Server::new_async().await;
    let get = server
      .mock("GET", "/repos/octo/site/contents/public/videos/big.mp4")
      .with_status(200)
      .with_body(LARGE_FILE)
      .create_async()
      .await;
    let delete = server
      .mock("DELETE", "/repos/octo/site/contents/public/videos/big.mp4")
      .match_body(mockito::Matcher::PartialJson(serde_json::json!({
        "sha": "abc123",
        "message": "Delete video: big.mp4",
      })))
      .with_status(200)
      .with_body("{}")
      .create_async()
      .await;

    let store = github_store(&server);
    let message = store.delete_asset("/videos/big.mp4").await.unwrap();
    assert_eq!(message, "Video deleted successfully");

    get.assert_async().await;
    delete.assert_async().await;
  }

  #[tokio::test]
  async fn test_save_over_large_collection_uses_its_sha() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/repos/octo/site/contents/public/projects.json")
      .with_status(200)
      .with_body(LARGE_FILE)
      .create_async()
      .await;
    let put = server
      .mock("PUT", "/repos/octo/site/contents/public/projects.json")
      .match_body(mockito::Matcher::PartialJson(serde_json::json!({ "sha": "abc123" })))
      .with_status(200)
      .with_body("{}")
      .create_async()
      .await;

    let store = github_store(&server);
    assert_eq!(store.save(&[sample("a", &["C"])]).await.unwrap(), SAVED_MESSAGE);
    put.assert_async().await;
  }

  #[tokio::test]
  async fn test_stale_version_is_rejected_by_store() {
    let blobs = MemoryBlobStore::new();
    blobs.seed("public/projects.json", br#"{"projects": []}"#);
    let store = RemoteProjectStore::new(blobs.clone(), layout());

    // Another writer updates the blob after our version read
    let current = blobs.fetch("public/projects.json").await.unwrap();
    blobs.seed("public/projects.json", br#"{"projects": []}"#);

    let err = blobs
      .write(
        "public/projects.json",
        BlobWrite {
          message: "stale".to_string(),
          content: Vec::new(),
          version: Some(current.version),
        },
      )
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::Remote { status: 409, .. }));

    // A fresh save reads the new version and succeeds
    assert!(store.save(&[]).await.is_ok());
  }

  #[tokio::test]
  async fn test_upload_then_delete_asset() {
    let blobs = MemoryBlobStore::new();
    let store = RemoteProjectStore::new(blobs.clone(), layout());

    let uploaded = store
      .upload_asset("demo.MP4", vec![1, 2, 3], "Line Follower Robot!")
      .await
      .unwrap();
    assert!(uploaded.url.starts_with("/videos/line-follower-robot-"));
    assert!(uploaded.url.ends_with(".MP4"));
    assert!(store.is_managed_asset(&uploaded.url));

    let file_name = uploaded.url.trim_start_matches("/videos/");
    assert_eq!(
      blobs.content(&format!("public/videos/{}", file_name)),
      Some(vec![1, 2, 3])
    );

    let message = store.delete_asset(&uploaded.url).await.unwrap();
    assert_eq!(message, "Video deleted successfully");
    assert_eq!(blobs.content(&format!("public/videos/{}", file_name)), None);
  }

  #[tokio::test]
  async fn test_delete_asset_rejects_paths_outside_folder() {
    let blobs = MemoryBlobStore::new();
    let store = RemoteProjectStore::new(blobs.clone(), layout());

    for url in ["/docs/report.pdf", "/videos/", "/videos/../projects.json", "data:video/mp4;base64,AA"] {
      assert_eq!(
        store.delete_asset(url).await.unwrap_err(),
        StoreError::InvalidAssetPath(url.to_string()),
        "{}",
        url
      );
    }
    assert!(blobs.deletes().is_empty());
  }

  #[tokio::test]
  async fn test_delete_missing_asset() {
    let store = RemoteProjectStore::new(MemoryBlobStore::new(), layout());
    assert_eq!(
      store.delete_asset("/videos/gone.mp4").await.unwrap_err(),
      StoreError::AssetNotFound("/videos/gone.mp4".to_string())
    );
  }

  #[test]
  fn test_asset_file_name() {
    assert_eq!(
      asset_file_name("My  IoT -- Project", "clip.webm", 42),
      "my-iot-project-42.webm"
    );
    assert_eq!(asset_file_name("x", "noext", 1), "x-1");
    let long = "a".repeat(80);
    assert_eq!(asset_file_name(&long, "v.mp4", 7), format!("{}-7.mp4", "a".repeat(50)));
  }
}
