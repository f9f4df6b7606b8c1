mod cache;
mod config;
mod logging;
mod portfolio;
mod project;
mod store;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use cache::{LocalCache, MemoryCache, NoopCache, ProjectCache, SqliteCache};
use config::Config;
use portfolio::{LoadSource, Portfolio, SyncOutcome, SyncState};
use project::{ProjectDraft, ProjectId};
use store::{GithubStore, RemoteProjectStore, StoreLayout, UploadedAsset};

#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(about = "Manage portfolio projects stored in a GitHub repository")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/folio/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Skip the on-disk cache for this run
  #[arg(long, global = true)]
  no_cache: bool,

  /// Also print logs to stderr
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List projects
  List,
  /// Show skills derived from project tags
  Skills,
  /// Refresh the local cache from the remote store
  Sync,
  /// Add a project
  Add {
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: String,
    /// Comma-separated technology tags
    #[arg(long, default_value = "")]
    tech: String,
    /// Video URL or data URI
    #[arg(long, conflicts_with = "video")]
    video_url: Option<String>,
    /// Local video file to upload and attach
    #[arg(long)]
    video: Option<PathBuf>,
    #[arg(long)]
    pdf_url: Option<String>,
    #[arg(long)]
    link: Option<String>,
  },
  /// Delete a project by id
  Delete {
    id: ProjectId,
    /// Admin password (prompted when omitted)
    #[arg(long)]
    password: Option<String>,
    /// Leave the project's uploaded video in place
    #[arg(long)]
    keep_asset: bool,
  },
  /// Upload a video file and print its URL
  UploadAsset {
    file: PathBuf,
    /// Project title used to name the file
    #[arg(long)]
    title: String,
  },
  /// Delete an uploaded video by URL
  DeleteAsset { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init(args.verbose)?;

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  let github = GithubStore::new(&config.store, Config::get_github_token())?;
  let remote = RemoteProjectStore::new(github, StoreLayout::from(&config.store));
  let cache = ProjectCache::new(open_cache(&config, args.no_cache));
  let mut portfolio = Portfolio::new(cache, remote, config.admin_password());

  match args.command {
    Command::List => {
      portfolio.load().await;
      if portfolio.projects().is_empty() {
        println!("No projects yet.");
      }
      for project in portfolio.projects() {
        println!("{}  {}  [{}]", project.id, project.title, project.tech.join(", "));
      }
    }
    Command::Skills => {
      portfolio.load().await;
      for skill in portfolio.skills() {
        let bar = "#".repeat(usize::from(skill.level) / 5);
        println!("{:<24} {:>3}% {}", skill.name, skill.level, bar);
      }
    }
    Command::Sync => {
      portfolio.load().await;
      let from = match portfolio.load_source() {
        LoadSource::Remote => "remote store",
        LoadSource::LocalCache => "local cache (remote empty or unreachable)",
        LoadSource::Empty => "nowhere",
      };
      println!("{} projects loaded from {}", portfolio.projects().len(), from);
    }
    Command::Add {
      title,
      description,
      tech,
      video_url,
      video,
      pdf_url,
      link,
    } => {
      portfolio.load().await;

      let video_url = match video {
        Some(path) => {
          let uploaded = upload_file(&portfolio, &path, &title).await?;
          println!("{}", uploaded.message);
          Some(uploaded.url)
        }
        None => video_url,
      };

      let draft = ProjectDraft {
        title,
        description,
        tech: project::parse_tag_list(&tech),
        video_url,
        pdf_url,
        link,
      };
      let (id, outcome) = portfolio.add(draft).await?;
      println!("Added project {}", id);
      report(&outcome);
    }
    Command::Delete {
      id,
      password,
      keep_asset,
    } => {
      portfolio.load().await;
      let title = portfolio
        .project(id)
        .map(|p| p.title.clone())
        .ok_or_else(|| eyre!("No project with id {}", id))?;

      let password = match password {
        Some(p) => p,
        None => prompt(&format!("Password to delete \"{}\": ", title))?,
      };
      if !portfolio.authenticate(&password) {
        return Err(eyre!("Incorrect password"));
      }

      let (removed, outcome) = portfolio.delete(id).await?;
      println!("Deleted project {}", removed.title);
      report(&outcome);

      // The video stays while the remote list may still point at it
      let removal_confirmed = matches!(portfolio.sync_state(), SyncState::RemoteConfirmed(_));
      if let Some(url) = removed
        .video_url
        .filter(|u| removal_confirmed && !keep_asset && portfolio.remote().is_managed_asset(u))
      {
        match portfolio.remote().delete_asset(&url).await {
          Ok(message) => println!("{}", message),
          Err(e) => eprintln!("Deletion failed: {}", e),
        }
      }
    }
    Command::UploadAsset { file, title } => {
      let uploaded = upload_file(&portfolio, &file, &title).await?;
      println!("{}", uploaded.message);
      println!("{}", uploaded.url);
    }
    Command::DeleteAsset { url } => {
      let message = portfolio.remote().delete_asset(&url).await?;
      println!("{}", message);
    }
  }

  Ok(())
}

/// Pick the cache backend. The cache never blocks a run: if the database
/// can't be opened we fall back to an in-memory one.
fn open_cache(config: &Config, no_cache: bool) -> Arc<dyn LocalCache> {
  if !config.cache.enabled {
    return Arc::new(NoopCache);
  }
  if no_cache {
    return Arc::new(MemoryCache::new());
  }

  let opened = match &config.cache.path {
    Some(path) => SqliteCache::open(path),
    None => SqliteCache::open_default(),
  };

  match opened {
    Ok(cache) => Arc::new(cache),
    Err(e) => {
      warn!("Local cache unavailable, using memory: {}", e);
      Arc::new(MemoryCache::new())
    }
  }
}

async fn upload_file(
  portfolio: &Portfolio<GithubStore>,
  path: &std::path::Path,
  title: &str,
) -> Result<UploadedAsset> {
  let bytes = tokio::fs::read(path)
    .await
    .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
  let file_name = path
    .file_name()
    .and_then(|n| n.to_str())
    .ok_or_else(|| eyre!("Invalid file name: {}", path.display()))?;

  portfolio
    .remote()
    .upload_asset(file_name, bytes, title)
    .await
    .map_err(|e| eyre!("Upload failed: {}", e))
}

fn report(outcome: &SyncOutcome) {
  if outcome.is_confirmed() {
    println!("{}", outcome.message());
  } else {
    eprintln!("{}", outcome.message());
    eprintln!("The change is only in the local cache; a load from a non-empty remote store will replace it.");
  }
}

fn prompt(label: &str) -> Result<String> {
  let mut stderr = std::io::stderr();
  write!(stderr, "{}", label)?;
  stderr.flush()?;

  let mut line = String::new();
  std::io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
