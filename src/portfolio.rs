//! Portfolio view-model: owns the project collection and keeps the local
//! cache and remote store in step with it.
//!
//! Mutations are local-first. A change is applied in memory and written to
//! the local cache before the remote write starts, and a failed remote write
//! never reverts it. Each mutation walks the states
//! `LocalApplied -> RemotePending -> RemoteConfirmed | RemoteFailed`, and only
//! one mutation may be in flight at a time. Dropping a `PendingSync`, or the
//! `complete_sync` future that owns it, frees the slot again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::ProjectCache;
use crate::project::{derive_skills, Project, ProjectDraft, ProjectId, Skill, ValidationError};
use crate::store::{BlobStore, RemoteProjectStore};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortfolioError {
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error("Not authenticated: enter the admin password first")]
  NotAuthenticated,
  #[error("No project with id {0}")]
  NotFound(ProjectId),
  #[error("Another change is still being synced")]
  SyncInFlight,
  #[error("No matching change is waiting to be synced")]
  NoPendingSync,
}

/// Where the displayed collection last came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
  /// Nothing loaded yet
  Empty,
  LocalCache,
  Remote,
}

/// Progress of the most recent mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
  Idle,
  /// Applied in memory and in the local cache
  LocalApplied,
  /// Remote write issued, response not yet received
  RemotePending,
  RemoteConfirmed(String),
  RemoteFailed(String),
}

/// Result of pushing a change to the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
  Confirmed(String),
  Failed(String),
}

impl SyncOutcome {
  pub fn is_confirmed(&self) -> bool {
    matches!(self, SyncOutcome::Confirmed(_))
  }

  pub fn message(&self) -> &str {
    match self {
      SyncOutcome::Confirmed(m) | SyncOutcome::Failed(m) => m,
    }
  }
}

/// Ticket for a locally applied change that still has to reach the remote store.
#[derive(Debug)]
#[must_use = "a pending sync blocks further changes until completed or dropped"]
pub struct PendingSync {
  ticket: u64,
  snapshot: Vec<Project>,
  in_flight: Arc<AtomicU64>,
}

impl Drop for PendingSync {
  fn drop(&mut self) {
    // Only releases the slot if it still belongs to this ticket
    let _ = self
      .in_flight
      .compare_exchange(self.ticket, NO_TICKET, Ordering::AcqRel, Ordering::Acquire);
  }
}

const NO_TICKET: u64 = 0;

pub struct Portfolio<B: BlobStore> {
  projects: Vec<Project>,
  cache: ProjectCache,
  remote: RemoteProjectStore<B>,
  admin_password: Option<String>,
  authenticated: bool,
  load_source: LoadSource,
  sync_state: SyncState,
  in_flight: Arc<AtomicU64>,
  next_ticket: u64,
}

impl<B: BlobStore> Portfolio<B> {
  pub fn new(
    cache: ProjectCache,
    remote: RemoteProjectStore<B>,
    admin_password: Option<String>,
  ) -> Self {
    Self {
      projects: Vec::new(),
      cache,
      remote,
      admin_password,
      authenticated: false,
      load_source: LoadSource::Empty,
      sync_state: SyncState::Idle,
      in_flight: Arc::new(AtomicU64::new(NO_TICKET)),
      next_ticket: NO_TICKET,
    }
  }

  pub fn projects(&self) -> &[Project] {
    &self.projects
  }

  pub fn skills(&self) -> Vec<Skill> {
    derive_skills(&self.projects)
  }

  pub fn load_source(&self) -> LoadSource {
    self.load_source
  }

  pub fn sync_state(&self) -> &SyncState {
    &self.sync_state
  }

  pub fn remote(&self) -> &RemoteProjectStore<B> {
    &self.remote
  }

  pub fn project(&self, id: ProjectId) -> Option<&Project> {
    self.projects.iter().find(|p| p.id == id)
  }

  // ==========================================================================
  // Load
  // ==========================================================================

  /// Show whatever the local cache holds. Returns true on a cache hit.
  pub fn load_local(&mut self) -> bool {
    match self.cache.load() {
      Some(projects) => {
        self.projects = projects;
        self.load_source = LoadSource::LocalCache;
        true
      }
      None => false,
    }
  }

  /// Local cache first, then the remote store.
  ///
  /// A non-empty remote collection replaces the displayed one and the cache.
  /// An empty or failed remote load leaves the local state in place.
  pub async fn load(&mut self) -> LoadSource {
    self.load_local();

    let remote = self.remote.load().await;
    if remote.is_empty() {
      info!(
        "Remote store returned no projects, keeping {} local ones",
        self.projects.len()
      );
    } else {
      self.projects = remote;
      self.cache.store(&self.projects);
      self.load_source = LoadSource::Remote;
    }

    self.load_source
  }

  // ==========================================================================
  // Authentication
  // ==========================================================================

  /// Unlock deletion for the rest of this session.
  pub fn authenticate(&mut self, password: &str) -> bool {
    self.authenticated = match self.admin_password.as_deref() {
      Some(expected) => password == expected,
      None => {
        warn!("No admin password configured, deletion stays locked");
        false
      }
    };
    self.authenticated
  }

  // ==========================================================================
  // Mutations
  // ==========================================================================

  /// Validate and append a project, updating the local cache.
  pub fn begin_add(&mut self, draft: ProjectDraft) -> Result<(ProjectId, PendingSync), PortfolioError> {
    self.ensure_idle()?;
    let project = draft.into_project()?;
    let id = project.id;

    info!("Adding project {} ({})", project.title, id);
    self.projects.push(project);
    Ok((id, self.apply_locally()))
  }

  /// Remove a project by id, updating the local cache.
  pub fn begin_delete(&mut self, id: ProjectId) -> Result<(Project, PendingSync), PortfolioError> {
    self.ensure_idle()?;
    if !self.authenticated {
      return Err(PortfolioError::NotAuthenticated);
    }

    let index = self
      .projects
      .iter()
      .position(|p| p.id == id)
      .ok_or(PortfolioError::NotFound(id))?;

    let removed = self.projects.remove(index);
    info!("Deleted project {} ({})", removed.title, id);
    Ok((removed, self.apply_locally()))
  }

  /// Push a locally applied change to the remote store.
  ///
  /// The in-memory collection is kept whatever the outcome.
  pub async fn complete_sync(&mut self, pending: PendingSync) -> Result<SyncOutcome, PortfolioError> {
    if self.in_flight.load(Ordering::Acquire) != pending.ticket {
      return Err(PortfolioError::NoPendingSync);
    }

    self.sync_state = SyncState::RemotePending;
    let result = self.remote.save(&pending.snapshot).await;
    drop(pending);

    let outcome = match result {
      Ok(message) => {
        self.sync_state = SyncState::RemoteConfirmed(message.clone());
        SyncOutcome::Confirmed(message)
      }
      Err(e) => {
        warn!("Remote sync failed, local changes kept: {}", e);
        let message = format!("Error: {}", e);
        self.sync_state = SyncState::RemoteFailed(message.clone());
        SyncOutcome::Failed(message)
      }
    };

    Ok(outcome)
  }

  /// Add a project and sync it.
  pub async fn add(&mut self, draft: ProjectDraft) -> Result<(ProjectId, SyncOutcome), PortfolioError> {
    let (id, pending) = self.begin_add(draft)?;
    let outcome = self.complete_sync(pending).await?;
    Ok((id, outcome))
  }

  /// Delete a project and sync the removal.
  pub async fn delete(&mut self, id: ProjectId) -> Result<(Project, SyncOutcome), PortfolioError> {
    let (removed, pending) = self.begin_delete(id)?;
    let outcome = self.complete_sync(pending).await?;
    Ok((removed, outcome))
  }

  fn ensure_idle(&self) -> Result<(), PortfolioError> {
    if self.in_flight.load(Ordering::Acquire) != NO_TICKET {
      return Err(PortfolioError::SyncInFlight);
    }
    Ok(())
  }

  fn apply_locally(&mut self) -> PendingSync {
    self.cache.store(&self.projects);

    self.next_ticket += 1;
    self.in_flight.store(self.next_ticket, Ordering::Release);
    self.sync_state = SyncState::LocalApplied;

    PendingSync {
      ticket: self.next_ticket,
      snapshot: self.projects.clone(),
      in_flight: Arc::clone(&self.in_flight),
    }
  }
}
