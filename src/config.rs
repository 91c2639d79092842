use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::QueryKind;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub store: StoreConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Page size used when a command does not pass one
  #[serde(default = "default_page_size")]
  pub default_page_size: u32,
}

fn default_page_size() -> u32 {
  10
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  /// Project URL; the REST API lives under `<url>/rest/v1`
  pub url: String,
}

/// Time-to-live per query kind. The only tunable of the cache.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  #[serde(default)]
  pub ttl: TtlTable,
}

/// TTLs in seconds. Unset kinds use the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TtlTable {
  pub list: Option<u64>,
  pub detail: Option<u64>,
  pub stats: Option<u64>,
  pub recent: Option<u64>,
  pub by_status: Option<u64>,
}

/// Used for keys without a recognizable kind.
const FALLBACK_TTL: Duration = Duration::from_secs(5 * 60);

impl CacheConfig {
  pub fn default_ttl(kind: QueryKind) -> Duration {
    let minutes = match kind {
      QueryKind::List => 5,
      QueryKind::Detail => 2,
      QueryKind::Stats => 10,
      QueryKind::Recent => 5,
      QueryKind::ByStatus => 3,
    };
    Duration::from_secs(minutes * 60)
  }

  pub fn ttl_for(&self, kind: Option<QueryKind>) -> Duration {
    let Some(kind) = kind else {
      return FALLBACK_TTL;
    };
    let configured = match kind {
      QueryKind::List => self.ttl.list,
      QueryKind::Detail => self.ttl.detail,
      QueryKind::Stats => self.ttl.stats,
      QueryKind::Recent => self.ttl.recent,
      QueryKind::ByStatus => self.ttl.by_status,
    };
    configured
      .map(Duration::from_secs)
      .unwrap_or_else(|| Self::default_ttl(kind))
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./tripdeck.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/tripdeck/config.yaml
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
        "No configuration file found. Create one at ~/.config/tripdeck/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("tripdeck.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("tripdeck").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Get the store API key from environment variables.
  ///
  /// Checks TRIPDECK_API_KEY first, then SUPABASE_ANON_KEY as fallback.
  pub fn get_api_key() -> Result<String> {
    std::env::var("TRIPDECK_API_KEY")
      .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
      .map_err(|_| {
        eyre!("Store API key not found. Set TRIPDECK_API_KEY or SUPABASE_ANON_KEY environment variable.")
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_ttls() {
    let config = CacheConfig::default();
    assert_eq!(config.ttl_for(Some(QueryKind::List)), Duration::from_secs(300));
    assert_eq!(config.ttl_for(Some(QueryKind::Detail)), Duration::from_secs(120));
    assert_eq!(config.ttl_for(Some(QueryKind::Stats)), Duration::from_secs(600));
    assert_eq!(config.ttl_for(Some(QueryKind::Recent)), Duration::from_secs(300));
    assert_eq!(config.ttl_for(Some(QueryKind::ByStatus)), Duration::from_secs(180));
    assert_eq!(config.ttl_for(None), FALLBACK_TTL);
  }

  #[test]
  fn test_parse_overrides_some_ttls() {
    let config = Config::parse(
      r#"
store:
  url: https://example.supabase.co
cache:
  ttl:
    detail: 30
    by_status: 60
"#,
    )
    .unwrap();

    assert_eq!(config.store.url, "https://example.supabase.co");
    assert_eq!(config.default_page_size, 10);
    assert_eq!(config.cache.ttl_for(Some(QueryKind::Detail)), Duration::from_secs(30));
    assert_eq!(config.cache.ttl_for(Some(QueryKind::ByStatus)), Duration::from_secs(60));
    assert_eq!(config.cache.ttl_for(Some(QueryKind::List)), Duration::from_secs(300));
  }

  #[test]
  fn test_load_from_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"store:\n  url: http://localhost:54321\ndefault_page_size: 25\n")
      .unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.default_page_size, 25);
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let err = Config::load(Some(Path::new("/nonexistent/tripdeck.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
