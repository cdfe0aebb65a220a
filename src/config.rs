//! Configuration for imgfetch.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (IMGFETCH_CACHE_DIR, IMGFETCH_TIMEOUT_SECS)
//! 2. Config file (.imgfetch/config.yaml)
//! 3. Defaults (platform cache dir, 60s timeout)
//!
//! Config file discovery:
//! - Searches current directory and parents for .imgfetch/config.yaml
//! - Paths in config file are relative to the project root (parent of .imgfetch/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const ENV_CACHE_DIR: &str = "IMGFETCH_CACHE_DIR";
const ENV_TIMEOUT_SECS: &str = "IMGFETCH_TIMEOUT_SECS";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub network: Option<NetworkConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Cache directory (relative to project root)
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Directory holding cached images
    pub cache_dir: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Transport settings
    pub network: NetworkSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkSettings {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            user_agent: default_user_agent(),
        }
    }
}

impl NetworkSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_user_agent() -> String {
    format!("imgfetch/{}", env!("CARGO_PKG_VERSION"))
}

/// Default cache directory (<platform cache>/imgfetch/images)
fn default_cache_dir() -> Result<PathBuf> {
    if let Some(cache) = dirs::cache_dir() {
        return Ok(cache.join("imgfetch").join("images"));
    }

    Ok(dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".imgfetch")
        .join("images"))
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".imgfetch").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Parse a timeout override from the environment
fn env_timeout() -> Result<Option<u64>> {
    match std::env::var(ENV_TIMEOUT_SECS) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS)),
        Err(_) => Ok(None),
    }
}

/// Merge a parsed config file with env overrides
fn resolve(config: Option<(&Path, ConfigFile)>) -> Result<ResolvedConfig> {
    let (config_file, cache_dir, mut network) = match config {
        Some((config_path, file)) => {
            // Base directory is the parent of .imgfetch/ (i.e., grandparent of config.yaml)
            let base_dir = config_path
                .parent() // .imgfetch/
                .and_then(|p| p.parent()) // project root
                .unwrap_or(Path::new("."));

            let cache_dir = match file.cache.dir {
                Some(ref dir) => resolve_path(base_dir, dir),
                None => default_cache_dir()?,
            };

            let defaults = NetworkSettings::default();
            let network = match file.network {
                Some(net) => NetworkSettings {
                    timeout_seconds: net.timeout_seconds.unwrap_or(defaults.timeout_seconds),
                    user_agent: net.user_agent.unwrap_or(defaults.user_agent),
                },
                None => defaults,
            };

            (Some(config_path.to_path_buf()), cache_dir, network)
        }
        None => (None, default_cache_dir()?, NetworkSettings::default()),
    };

    let cache_dir = std::env::var(ENV_CACHE_DIR)
        .map(PathBuf::from)
        .unwrap_or(cache_dir);

    if let Some(timeout) = env_timeout()? {
        network.timeout_seconds = timeout;
    }

    Ok(ResolvedConfig {
        cache_dir,
        config_file,
        network,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    match find_config_file() {
        Some(path) => {
            let file = load_config_file(&path)?;
            resolve(Some((path.as_path(), file)))
        }
        None => resolve(None),
    }
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(temp: &TempDir, yaml: &str) -> PathBuf {
        let dir = temp.path().join(".imgfetch");
        std::fs::create_dir_all(&dir).unwrap();

        let config_path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "{}", yaml).unwrap();
        config_path
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
cache:
  dir: ./images
network:
  timeout_seconds: 15
  user_agent: "custom-agent"
"#,
        );

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.cache.dir, Some("./images".to_string()));

        let network = config.network.unwrap();
        assert_eq!(network.timeout_seconds, Some(15));
        assert_eq!(network.user_agent, Some("custom-agent".to_string()));
    }

    #[test]
    fn test_resolve_relative_cache_dir_against_project_root() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
cache:
  dir: cache/images
"#,
        );

        let file = load_config_file(&config_path).unwrap();
        let resolved = resolve(Some((config_path.as_path(), file))).unwrap();

        if std::env::var(ENV_CACHE_DIR).is_err() {
            assert_eq!(resolved.cache_dir, temp.path().join("cache/images"));
        }
        assert_eq!(resolved.config_file, Some(config_path));
    }

    #[test]
    fn test_network_defaults_fill_gaps() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
network:
  user_agent: "only-agent"
"#,
        );

        let file = load_config_file(&config_path).unwrap();
        let resolved = resolve(Some((config_path.as_path(), file))).unwrap();

        assert_eq!(resolved.network.user_agent, "only-agent");
        if std::env::var(ENV_TIMEOUT_SECS).is_err() {
            assert_eq!(resolved.network.timeout_seconds, 60);
        }
    }

    #[test]
    fn test_default_network_settings() {
        let settings = NetworkSettings::default();
        assert_eq!(settings.timeout(), Duration::from_secs(60));
        assert!(settings.user_agent.starts_with("imgfetch/"));
    }

    #[test]
    fn test_resolve_absolute_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./images"),
            PathBuf::from("/home/user/project/./images")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/images"),
            PathBuf::from("/absolute/images")
        );
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(&temp, "cache: [not, a, map");

        assert!(load_config_file(&config_path).is_err());
    }
}
