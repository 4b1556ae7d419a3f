use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://library-management-server-xi.vercel.app/api";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  /// Books per page in the book list
  pub page_size: PageSize,
  pub cache: CacheConfig,
  pub log: LogConfig,
  /// Custom title for header (defaults to "BookNest")
  pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub url: String,
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: DEFAULT_API_URL.to_string(),
      timeout_secs: 10,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct PageSize(pub u32);

impl Default for PageSize {
  fn default() -> Self {
    Self(10)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// How long an entry without subscribers is kept (0 evicts immediately)
  pub keep_unused_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      keep_unused_secs: 60,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Filter directive, e.g. "info" or "booknest=debug"
  pub level: String,
  /// Directory for booknest.log (defaults to $XDG_DATA_HOME/booknest)
  pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      dir: None,
    }
  }
}

impl Config {
  /// Load configuration from file, falling back to defaults.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./booknest.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/booknest/config.yaml
  ///
  /// `BOOKNEST_API_URL` overrides `api.url` from any source.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var("BOOKNEST_API_URL") {
      config.api.url = url;
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("booknest.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("booknest").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file parses as null; treat it as all defaults.
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    serde_yaml::from_str(contents)
  }

  fn validate(&self) -> Result<()> {
    self.api_url()?;
    if self.page_size.0 == 0 {
      return Err(eyre!("page_size must be at least 1"));
    }
    if self.api.timeout_secs == 0 {
      return Err(eyre!("api.timeout_secs must be at least 1"));
    }
    Ok(())
  }

  pub fn api_url(&self) -> Result<Url> {
    parse_api_url(&self.api.url)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.api.timeout_secs)
  }

  pub fn keep_unused(&self) -> Duration {
    Duration::from_secs(self.cache.keep_unused_secs)
  }

  /// Directory the log file is written to.
  pub fn log_dir(&self) -> PathBuf {
    self.log.dir.clone().unwrap_or_else(|| {
      dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("booknest")
    })
  }
}

/// Parse a base URL, accepting only http and https.
pub fn parse_api_url(raw: &str) -> Result<Url> {
  let url = Url::parse(raw).map_err(|e| eyre!("Invalid API URL '{}': {}", raw, e))?;
  match url.scheme() {
    "http" | "https" => Ok(url),
    other => Err(eyre!("Invalid API URL '{}': unsupported scheme '{}'", raw, other)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.url, DEFAULT_API_URL);
    assert_eq!(config.timeout(), Duration::from_secs(10));
    assert_eq!(config.page_size, PageSize(10));
    assert_eq!(config.keep_unused(), Duration::from_secs(60));
    assert_eq!(config.log.level, "info");
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let config = Config::from_yaml(
      "api:\n  url: http://localhost:5000/api\npage_size: 25\ncache:\n  keep_unused_secs: 0\n",
    )
    .unwrap();

    assert_eq!(config.api.url, "http://localhost:5000/api");
    assert_eq!(config.api.timeout_secs, 10);
    assert_eq!(config.page_size, PageSize(25));
    assert_eq!(config.keep_unused(), Duration::ZERO);
    assert_eq!(config.log.level, "info");
  }

  #[test]
  fn test_empty_yaml_is_default() {
    let config = Config::from_yaml("  \n").unwrap();
    assert_eq!(config.api.url, DEFAULT_API_URL);
  }

  #[test]
  fn test_invalid_yaml() {
    assert!(Config::from_yaml("page_size: lots").is_err());
  }

  #[test]
  fn test_api_url_validation() {
    assert!(parse_api_url("https://example.com/api").is_ok());
    assert!(parse_api_url("not a url").is_err());
    assert!(parse_api_url("ftp://example.com").is_err());
  }

  #[test]
  fn test_zero_page_size_rejected() {
    let config = Config::from_yaml("page_size: 0").unwrap();
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_log_dir_override() {
    let config = Config::from_yaml("log:\n  dir: /tmp/booknest-logs\n").unwrap();
    assert_eq!(config.log_dir(), PathBuf::from("/tmp/booknest-logs"));
  }
}
