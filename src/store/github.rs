use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::{header, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::api_types::{ApiContentFile, ApiErrorBody, ApiWriteRequest};
use super::blob::{BlobStore, BlobVersion, BlobWrite, StoreError, VersionedBlob};
use crate::config::StoreConfig;

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Blob store backed by a GitHub repository.
///
/// Published reads go to the raw content host without credentials; versioned
/// reads and writes go through the contents API with a bearer token. The
/// blob version is the file's git `sha`.
#[derive(Clone)]
pub struct GithubStore {
  http: reqwest::Client,
  api_url: Url,
  raw_url: Url,
  owner: String,
  repo: String,
  branch: String,
  token: Option<String>,
}

impl GithubStore {
  pub fn new(config: &StoreConfig, token: Option<String>) -> Result<Self, StoreError> {
    let api_url = parse_base(&config.api_url)?;
    let raw_url = parse_base(&config.raw_url)?;

    let http = reqwest::Client::builder()
      .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| StoreError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self {
      http,
      api_url,
      raw_url,
      owner: config.owner.clone(),
      repo: config.repo.clone(),
      branch: config.branch.clone(),
      token: token.filter(|t| !t.trim().is_empty()),
    })
  }

  /// `{api}/repos/{owner}/{repo}/contents/{path}`
  fn contents_url(&self, path: &str) -> Url {
    let prefix = ["repos", self.owner.as_str(), self.repo.as_str(), "contents"];
    join_segments(&self.api_url, prefix.into_iter().chain(path.split('/')))
  }

  /// `{raw}/{owner}/{repo}/{branch}/{path}`
  fn published_url(&self, path: &str) -> Url {
    let prefix = [self.owner.as_str(), self.repo.as_str(), self.branch.as_str()];
    join_segments(&self.raw_url, prefix.into_iter().chain(path.split('/')))
  }

  fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, StoreError> {
    let token = self.token.as_deref().ok_or(StoreError::MissingCredential)?;
    Ok(
      request
        .bearer_auth(token)
        .header(header::ACCEPT, GITHUB_ACCEPT),
    )
  }
}

fn parse_base(raw: &str) -> Result<Url, StoreError> {
  let url = Url::parse(raw).map_err(|e| StoreError::Config(format!("{}: {}", raw, e)))?;
  if url.cannot_be_a_base() {
    return Err(StoreError::Config(format!("{}: not a base URL", raw)));
  }
  Ok(url)
}

fn join_segments<'a>(base: &Url, segments: impl Iterator<Item = &'a str>) -> Url {
  let mut url = base.clone();
  if let Ok(mut path) = url.path_segments_mut() {
    path.pop_if_empty();
    path.extend(segments.filter(|s| !s.is_empty()));
  }
  url
}

fn transport(e: reqwest::Error) -> StoreError {
  StoreError::Transport(e.to_string())
}

/// Convert a non-success response, preferring the `message` GitHub sends.
async fn remote_error(response: Response) -> StoreError {
  let status = response.status();
  let message = response
    .json::<ApiErrorBody>()
    .await
    .ok()
    .and_then(|body| body.message)
    .unwrap_or_else(|| {
      status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
    });

  StoreError::Remote {
    status: status.as_u16(),
    message,
  }
}

/// Decode inline file content.
///
/// Files over 1 MB come back with `"encoding": "none"` and no content. The
/// sha is still valid, so they decode to an empty body.
fn decode_content(file: &ApiContentFile) -> Result<Vec<u8>, StoreError> {
  match file.encoding.as_deref() {
    None | Some("base64") => {}
    Some("none") => return Ok(Vec::new()),
    Some(other) => {
      return Err(StoreError::Decode(format!("unsupported encoding {}", other)));
    }
  }

  let compact: String = file
    .content
    .as_deref()
    .unwrap_or_default()
    .chars()
    .filter(|c| !c.is_whitespace())
    .collect();

  BASE64
    .decode(compact)
    .map_err(|e| StoreError::Decode(e.to_string()))
}

#[async_trait]
impl BlobStore for GithubStore {
  fn has_credential(&self) -> bool {
    self.token.is_some()
  }

  async fn read_published(&self, path: &str) -> Result<Vec<u8>, StoreError> {
    let url = self.published_url(path);
    debug!("GET {}", url);

    let response = self.http.get(url).send().await.map_err(transport)?;
    if !response.status().is_success() {
      return Err(remote_error(response).await);
    }

    let bytes = response.bytes().await.map_err(transport)?;
    Ok(bytes.to_vec())
  }

  async fn fetch(&self, path: &str) -> Result<VersionedBlob, StoreError> {
    let url = self.contents_url(path);
    let request = self.authorized(self.http.get(url.clone()))?;
    debug!("GET {}", url);

    let response = request.send().await.map_err(transport)?;
    if !response.status().is_success() {
      return Err(remote_error(response).await);
    }

    let file: ApiContentFile = response
      .json()
      .await
      .map_err(|e| StoreError::Decode(e.to_string()))?;

    Ok(VersionedBlob {
      content: decode_content(&file)?,
      version: BlobVersion(file.sha),
    })
  }

  async fn write(&self, path: &str, write: BlobWrite) -> Result<(), StoreError> {
    let url = self.contents_url(path);
    let body = ApiWriteRequest {
      message: &write.message,
      content: Some(BASE64.encode(&write.content)),
      sha: write.version.as_ref().map(|v| v.0.as_str()),
      branch: &self.branch,
    };
    let request = self.authorized(self.http.put(url.clone()))?.json(&body);
    debug!("PUT {} ({} bytes)", url, write.content.len());

    let response = request.send().await.map_err(transport)?;
    if !response.status().is_success() {
      return Err(remote_error(response).await);
    }

    Ok(())
  }

  async fn delete(&self, path: &str, version: &BlobVersion, message: &str) -> Result<(), StoreError> {
    let url = self.contents_url(path);
    let body = ApiWriteRequest {
      message,
      content: None,
      sha: Some(version.0.as_str()),
      branch: &self.branch,
    };
    let request = self.authorized(self.http.delete(url.clone()))?.json(&body);
    debug!("DELETE {}", url);

    let response = request.send().await.map_err(transport)?;
    if !response.status().is_success() {
      return Err(remote_error(response).await);
    }

    Ok(())
  }
}
