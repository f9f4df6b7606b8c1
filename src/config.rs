use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub store: StoreConfig,
  /// Password gating project deletion. Compared in the clear: this is
  /// friction against accidental deletes, not access control.
  pub admin_password: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
}

/// Location of the project file and assets in the backing GitHub repository
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
  pub owner: String,
  pub repo: String,
  pub branch: String,
  /// Repository path of the projects document
  pub file_path: String,
  /// Repository folder for uploaded videos
  pub assets_folder: String,
  /// URL prefix the site serves `assets_folder` under
  pub asset_url_prefix: String,
  pub api_url: String,
  pub raw_url: String,
  pub timeout_secs: u64,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      owner: String::new(),
      repo: String::new(),
      branch: "main".to_string(),
      file_path: "public/projects.json".to_string(),
      assets_folder: "public/videos".to_string(),
      asset_url_prefix: "/videos/".to_string(),
      api_url: "https://api.github.com".to_string(),
      raw_url: "https://raw.githubusercontent.com".to_string(),
      timeout_secs: 30,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub enabled: bool,
  /// Defaults to $XDG_DATA_HOME/folio/cache.db
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./folio.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/folio/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/folio/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("folio.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("folio").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config = Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;

    if config.store.owner.trim().is_empty() || config.store.repo.trim().is_empty() {
      return Err(eyre!("store.owner and store.repo are required"));
    }

    Ok(config)
  }

  /// Get the GitHub token from environment variables.
  ///
  /// Checks FOLIO_GITHUB_TOKEN first, then GITHUB_TOKEN as fallback. A
  /// missing token is not an error here; writes report it when attempted.
  pub fn get_github_token() -> Option<String> {
    std::env::var("FOLIO_GITHUB_TOKEN")
      .or_else(|_| std::env::var("GITHUB_TOKEN"))
      .ok()
      .filter(|t| !t.trim().is_empty())
  }

  /// Admin password, with FOLIO_ADMIN_PASSWORD taking precedence over the file.
  pub fn admin_password(&self) -> Option<String> {
    std::env::var("FOLIO_ADMIN_PASSWORD")
      .ok()
      .or_else(|| self.admin_password.clone())
      .filter(|p| !p.is_empty())
  }
}
