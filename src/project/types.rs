use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Stable project identifier, assigned when a project is created.
///
/// Entries written before identifiers existed get one derived from their
/// position and title, so it stays the same across reads until the next save
/// persists it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(Uuid);

impl ProjectId {
  pub fn new() -> Self {
    Self(Uuid::new_v4())
  }

  fn unassigned() -> Self {
    Self(Uuid::nil())
  }

  fn legacy(position: usize, title: &str) -> Self {
    let name = format!("{}:{}", position, title);
    Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
  }
}

impl fmt::Display for ProjectId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for ProjectId {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Uuid::parse_str(s.trim()).map(Self)
  }
}

/// A single portfolio entry.
///
/// Only `title` must be a string when reading. Every other field falls back
/// to its default when it is missing, `null` or of the wrong type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
  #[serde(default = "ProjectId::unassigned", deserialize_with = "deserialize_id")]
  pub id: ProjectId,
  pub title: String,
  #[serde(default, deserialize_with = "deserialize_text")]
  pub description: String,
  /// Technology tags in display order
  #[serde(default, deserialize_with = "deserialize_tags")]
  pub tech: Vec<String>,
  /// Relative path or data URI
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "deserialize_optional_text"
  )]
  pub video_url: Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "deserialize_optional_text"
  )]
  pub pdf_url: Option<String>,
  #[serde(default = "default_link", deserialize_with = "deserialize_link")]
  pub link: String,
}

fn default_link() -> String {
  "#".to_string()
}

fn into_text(value: Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s),
    _ => None,
  }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<ProjectId, D::Error>
where
  D: Deserializer<'de>,
{
  let id = into_text(Value::deserialize(deserializer)?)
    .and_then(|s| s.parse().ok())
    .unwrap_or_else(ProjectId::unassigned);
  Ok(id)
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(into_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn deserialize_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(into_text(Value::deserialize(deserializer)?))
}

fn deserialize_link<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(into_text(Value::deserialize(deserializer)?).unwrap_or_else(default_link))
}

/// Accept only an array of strings for `tech`; anything else reads as no tags.
fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let tags = match Value::deserialize(deserializer)? {
    Value::Array(items) => items.into_iter().filter_map(into_text).collect(),
    _ => Vec::new(),
  };
  Ok(tags)
}

/// On-disk and on-remote layout: `{ "projects": [...] }`.
///
/// Entries are kept as raw JSON so a single bad entry can be skipped.
#[derive(Debug, Deserialize)]
struct ProjectFile {
  #[serde(default)]
  projects: Value,
}

/// Serialize a collection into the persisted blob format (pretty JSON).
pub fn to_blob(projects: &[Project]) -> serde_json::Result<Vec<u8>> {
  #[derive(Serialize)]
  struct Borrowed<'a> {
    projects: &'a [Project],
  }

  serde_json::to_vec_pretty(&Borrowed { projects })
}

/// Parse the persisted blob format.
///
/// A missing or non-array `projects` value is an empty collection. Entries
/// without a string `title` are skipped with a warning; the rest are kept.
pub fn from_blob(bytes: &[u8]) -> serde_json::Result<Vec<Project>> {
  let file: ProjectFile = serde_json::from_slice(bytes)?;
  let entries = match file.projects {
    Value::Array(entries) => entries,
    _ => Vec::new(),
  };

  let mut projects = Vec::with_capacity(entries.len());
  for (position, entry) in entries.into_iter().enumerate() {
    match serde_json::from_value::<Project>(entry) {
      Ok(mut project) => {
        if project.id == ProjectId::unassigned() {
          project.id = ProjectId::legacy(position, &project.title);
        }
        projects.push(project);
      }
      Err(e) => warn!("Skipping project entry {}: {}", position, e),
    }
  }
  Ok(projects)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("Project title is required")]
  MissingTitle,
  #[error("Project description is required")]
  MissingDescription,
  #[error("At least one technology tag is required")]
  MissingTech,
}

/// User input for a new project, before validation and normalization.
#[derive(Debug, Clone, Default)]
pub struct ProjectDraft {
  pub title: String,
  pub description: String,
  pub tech: Vec<String>,
  pub video_url: Option<String>,
  pub pdf_url: Option<String>,
  pub link: Option<String>,
}

impl ProjectDraft {
  /// Validate the draft and build a project with a fresh id.
  ///
  /// Tags are trimmed and upper-cased; blank tags and blank optional URLs are dropped.
  pub fn into_project(self) -> Result<Project, ValidationError> {
    let title = self.title.trim().to_string();
    if title.is_empty() {
      return Err(ValidationError::MissingTitle);
    }

    let description = self.description.trim().to_string();
    if description.is_empty() {
      return Err(ValidationError::MissingDescription);
    }

    let tech = normalize_tags(&self.tech);
    if tech.is_empty() {
      return Err(ValidationError::MissingTech);
    }

    Ok(Project {
      id: ProjectId::new(),
      title,
      description,
      tech,
      video_url: non_blank(self.video_url),
      pdf_url: non_blank(self.pdf_url),
      link: non_blank(self.link).unwrap_or_else(default_link),
    })
  }
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
  tags
    .iter()
    .map(|t| t.trim().to_uppercase())
    .filter(|t| !t.is_empty())
    .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}

/// Split a comma-separated tag list as typed by a user.
pub fn parse_tag_list(input: &str) -> Vec<String> {
  input
    .split(',')
    .map(|t| t.trim().to_string())
    .filter(|t| !t.is_empty())
    .collect()
}
