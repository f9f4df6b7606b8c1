//! Serde types matching GitHub contents API requests and responses.
//!
//! These types are separate from the store types so wire details (base64
//! content, `sha` naming, branch selection) stay inside the GitHub backend.

use serde::{Deserialize, Serialize};

// ============================================================================
// Responses
// ============================================================================

/// `GET /repos/{owner}/{repo}/contents/{path}` for a file
#[derive(Debug, Deserialize)]
pub struct ApiContentFile {
  pub sha: String,
  /// Base64 with embedded newlines; absent for files over 1 MB
  #[serde(default)]
  pub content: Option<String>,
  #[serde(default)]
  pub encoding: Option<String>,
}

/// Error body returned with any non-2xx status
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub message: Option<String>,
}

// ============================================================================
// Requests
// ============================================================================

/// Body of `PUT` (create/update) and `DELETE` on a contents path
#[derive(Debug, Serialize)]
pub struct ApiWriteRequest<'a> {
  pub message: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub content: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sha: Option<&'a str>,
  pub branch: &'a str,
}
