use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub scripture: ScriptureConfig,
  pub generative: GenerativeConfig,
  pub cache: CacheConfig,
  pub downloads: DownloadConfig,
  pub network: NetworkConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScriptureConfig {
  /// Base URL of the scripture lookup API
  pub base_url: String,
  /// Translation used when none is given on the command line
  pub default_translation: String,
}

impl Default for ScriptureConfig {
  fn default() -> Self {
    Self {
      base_url: "https://bible-api.com/".to_string(),
      default_translation: "web".to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerativeConfig {
  pub base_url: String,
  pub model: String,
}

impl Default for GenerativeConfig {
  fn default() -> Self {
    Self {
      base_url: "https://generativelanguage.googleapis.com/".to_string(),
      model: "gemini-2.5-flash".to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Prefix of every cache partition name
  pub app_name: String,
  /// Bump on any incompatible change to what is cached or how keys are derived
  pub generation: u32,
  /// Origin serving the app shell
  pub app_origin: String,
  /// App shell files fetched on install. Relative entries resolve against `app_origin`.
  pub shell: Vec<String>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      app_name: "lumina".to_string(),
      generation: 3,
      app_origin: "http://localhost:5173/".to_string(),
      shell: vec![
        "/".to_string(),
        "/index.html".to_string(),
        "/manifest.json".to_string(),
        "/icon.svg".to_string(),
      ],
    }
  }
}

impl CacheConfig {
  pub fn origin(&self) -> Result<Url> {
    Url::parse(&self.app_origin)
      .map_err(|e| Error::Config(format!("Invalid app_origin '{}': {}", self.app_origin, e)))
  }

  /// App shell URLs resolved against the app origin.
  pub fn shell_urls(&self) -> Result<Vec<Url>> {
    let origin = self.origin()?;
    self
      .shell
      .iter()
      .map(|entry| {
        origin
          .join(entry)
          .map_err(|e| Error::Config(format!("Invalid shell entry '{}': {}", entry, e)))
      })
      .collect()
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
  /// Per-chapter timeout; exceeding it fails the download
  pub unit_timeout_secs: u64,
  /// How many translations may download at the same time
  pub max_concurrent: usize,
}

impl Default for DownloadConfig {
  fn default() -> Self {
    Self {
      unit_timeout_secs: 30,
      max_concurrent: 2,
    }
  }
}

impl DownloadConfig {
  pub fn unit_timeout(&self) -> Duration {
    Duration::from_secs(self.unit_timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
  pub request_timeout_secs: u64,
  pub connect_timeout_secs: u64,
  pub max_retries: u32,
}

impl Default for NetworkConfig {
  fn default() -> Self {
    Self {
      request_timeout_secs: 20,
      connect_timeout_secs: 10,
      max_retries: 2,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./lumina.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/lumina/config.yaml
  ///
  /// Without any file the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(Error::Config(format!(
          "Config file not found: {}",
          p.display()
        )));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("lumina.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("lumina").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
      Error::Config(format!(
        "Failed to read config file {}: {}",
        path.display(),
        e
      ))
    })?;

    Self::from_yaml(&contents)
      .map_err(|e| Error::Config(format!("Failed to parse config file {}: {}", path.display(), e)))
  }

  pub fn from_yaml(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Get the generative-text API key from environment variables.
  ///
  /// Checks LUMINA_API_KEY first, then API_KEY as fallback. A missing key is not
  /// an error: generative features degrade to a fixed message.
  pub fn api_key() -> Option<String> {
    std::env::var("LUMINA_API_KEY")
      .or_else(|_| std::env::var("API_KEY"))
      .ok()
      .filter(|k| !k.trim().is_empty())
  }
}

/// Directory holding the cache, the status ledger and logs.
pub fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))?;

  Ok(data_dir.join("lumina"))
}
