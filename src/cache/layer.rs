//! Typed access to the cached project collection.

use std::sync::Arc;
use tracing::{debug, warn};

use super::traits::LocalCache;
use crate::project::{self, Project};

/// Slot holding the serialized project collection.
pub const PROJECTS_SLOT: &str = "portfolio-projects";

/// Reads and writes the project collection in a single cache slot.
///
/// The slot holds the same JSON document as the remote store, so a cached
/// value can be inspected or copied by hand.
#[derive(Clone)]
pub struct ProjectCache {
  cache: Arc<dyn LocalCache>,
}

impl ProjectCache {
  pub fn new(cache: Arc<dyn LocalCache>) -> Self {
    Self { cache }
  }

  /// Cached collection, or `None` on a miss or an unreadable value.
  pub fn load(&self) -> Option<Vec<Project>> {
    let raw = self.cache.get(PROJECTS_SLOT)?;
    match project::from_blob(raw.as_bytes()) {
      Ok(projects) => {
        debug!("Read {} projects from local cache", projects.len());
        Some(projects)
      }
      Err(e) => {
        warn!("Ignoring unreadable cached projects: {}", e);
        None
      }
    }
  }

  pub fn store(&self, projects: &[Project]) {
    let encoded = project::to_blob(projects)
      .map_err(|e| e.to_string())
      .and_then(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string()));

    match encoded {
      Ok(value) => self.cache.set(PROJECTS_SLOT, &value),
      Err(e) => warn!("Failed to encode projects for local cache: {}", e),
    }
  }
}
