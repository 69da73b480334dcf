// Configuration loading and parsing (scorecast.toml, credentials.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::api::StorePolicies;
use crate::sync::cache::CachePolicy;
use crate::sync::paginate::Paginator;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub poll: PollConfig,
    pub odds: OddsConfig,
    pub db_path: String,
    pub credentials: CredentialsConfig,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_secs)
    }

    pub fn store_policies(&self) -> StorePolicies {
        StorePolicies {
            game_detail: self.cache.game_detail.policy(),
            flow: self.cache.flow.policy(),
            game_list: self.cache.game_list.policy(),
        }
    }

    pub fn paginator(&self) -> Paginator {
        Paginator::new(self.odds.page_size, self.odds.max_concurrent)
    }

    /// Preferences database location. An empty `database.path` resolves to
    /// the platform data directory.
    pub fn resolve_db_path(&self) -> PathBuf {
        if !self.db_path.trim().is_empty() {
            return PathBuf::from(&self.db_path);
        }
        match ProjectDirs::from("", "", "scorecast") {
            Some(dirs) => dirs.data_dir().join("scorecast.db"),
            None => PathBuf::from("scorecast.db"),
        }
    }
}

// ---------------------------------------------------------------------------
// scorecast.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire scorecast.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ScorecastFile {
    api: ApiConfig,
    cache: CacheConfig,
    poll: PollConfig,
    odds: OddsConfig,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    #[serde(default)]
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheSection {
    pub ttl_secs: u64,
    #[serde(default)]
    pub fresh_secs: u64,
    pub capacity: usize,
}

impl CacheSection {
    pub fn policy(&self) -> CachePolicy {
        CachePolicy::new(
            Duration::from_secs(self.ttl_secs),
            Duration::from_secs(self.fresh_secs),
            self.capacity,
        )
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheConfig {
    pub game_detail: CacheSection,
    pub flow: CacheSection,
    pub game_list: CacheSection,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PollConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OddsConfig {
    pub page_size: usize,
    pub max_concurrent: usize,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/scorecast.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- scorecast.toml (required) ---
    let main_path = config_dir.join("scorecast.toml");
    let main_text = read_file(&main_path)?;
    let file: ScorecastFile = toml::from_str(&main_text).map_err(|e| ConfigError::ParseError {
        path: main_path.clone(),
        source: e,
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        api: file.api,
        cache: file.cache,
        poll: file.poll,
        odds: file.odds,
        db_path: file.database.path,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Loads config relative to the current working directory, copying
/// defaults first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let base_url = config.api.base_url.trim();
    if base_url.is_empty() {
        return Err(invalid("api.base_url", "must not be empty"));
    }
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(invalid(
            "api.base_url",
            format!("must start with http:// or https://, got {base_url}"),
        ));
    }
    if config.api.request_timeout_secs == 0 {
        return Err(invalid("api.request_timeout_secs", "must be > 0"));
    }

    let caches: &[(&str, CacheSection)] = &[
        ("cache.game_detail", config.cache.game_detail),
        ("cache.flow", config.cache.flow),
        ("cache.game_list", config.cache.game_list),
    ];
    for (name, section) in caches {
        if section.ttl_secs == 0 {
            return Err(invalid(&format!("{name}.ttl_secs"), "must be > 0"));
        }
        if section.capacity == 0 {
            return Err(invalid(&format!("{name}.capacity"), "must be > 0"));
        }
        if section.fresh_secs > section.ttl_secs {
            return Err(invalid(
                &format!("{name}.fresh_secs"),
                format!(
                    "must not exceed ttl_secs ({}), got {}",
                    section.ttl_secs, section.fresh_secs
                ),
            ));
        }
    }

    if config.poll.interval_secs == 0 {
        return Err(invalid("poll.interval_secs", "must be > 0"));
    }

    let odds_fields: &[(&str, usize)] = &[
        ("odds.page_size", config.odds.page_size),
        ("odds.max_concurrent", config.odds.max_concurrent),
    ];
    for (name, val) in odds_fields {
        if *val == 0 {
            return Err(invalid(name, "must be > 0"));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Workspace root, whether tests run from the crate or the workspace.
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("../../defaults").exists() {
            cwd.join("../..")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    /// Fresh temp dir with `config/scorecast.toml` set to `contents`.
    fn temp_config(name: &str, contents: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(format!("scorecast_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/scorecast.toml"), contents).unwrap();
        tmp
    }

    fn default_toml() -> String {
        fs::read_to_string(project_root().join("defaults/scorecast.toml")).unwrap()
    }

    #[test]
    fn load_valid_config_from_defaults() {
        let tmp = temp_config("defaults", &default_toml());
        let config = load_config_from(&tmp).expect("should load valid config");

        assert!(config.api.base_url.starts_with("https://"));
        assert_eq!(config.poll_interval(), Duration::from_secs(45));
        assert_eq!(config.store_policies(), StorePolicies::default());
        assert_eq!(config.paginator(), Paginator::default());
        assert!(config.credentials.api_key.is_none());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn credentials_toml_with_api_key() {
        let tmp = temp_config("credentials", &default_toml());
        fs::write(tmp.join("config/credentials.toml"), "api_key = \"k-123\"\n").unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.credentials.api_key.as_deref(), Some("k-123"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_fresh_window_longer_than_ttl() {
        let toml = default_toml().replace("fresh_secs = 45", "fresh_secs = 120");
        let tmp = temp_config("fresh_gt_ttl", &toml);

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "cache.game_list.fresh_secs")
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let toml = default_toml().replace("interval_secs = 45", "interval_secs = 0");
        let tmp = temp_config("zero_poll", &toml);

        let err = load_config_from(&tmp).unwrap_err();
        assert!(err.to_string().contains("poll.interval_secs"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_non_http_base_url() {
        let toml = default_toml().replace("https://", "ftp://");
        let tmp = temp_config("bad_url", &toml);

        let err = load_config_from(&tmp).unwrap_err();
        assert!(err.to_string().contains("api.base_url"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_scorecast_toml() {
        let tmp = std::env::temp_dir().join(format!("scorecast_missing_{}", std::process::id()));
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("scorecast.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = temp_config("invalid", "[api\nbase_url = ");
        assert!(matches!(
            load_config_from(&tmp).unwrap_err(),
            ConfigError::ParseError { .. }
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn explicit_db_path_wins() {
        let tmp = temp_config("db_path", &default_toml());
        let mut config = load_config_from(&tmp).unwrap();
        config.db_path = "prefs/test.db".into();
        assert_eq!(config.resolve_db_path(), PathBuf::from("prefs/test.db"));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = std::env::temp_dir().join(format!("scorecast_ensure_{}", std::process::id()));
        let _ = fs::remove_dir_all(&tmp);
        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();

        fs::copy(
            project_root().join("defaults/scorecast.toml"),
            defaults_dir.join("scorecast.toml"),
        )
        .unwrap();
        fs::write(defaults_dir.join("credentials.toml.example"), "api_key = \"...\"\n").unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/scorecast.toml").exists());
        assert!(!tmp.join("config/credentials.toml.example").exists());

        // Second run copies nothing and keeps local edits.
        fs::write(tmp.join("config/scorecast.toml"), "# custom\n").unwrap();
        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        assert_eq!(
            fs::read_to_string(tmp.join("config/scorecast.toml")).unwrap(),
            "# custom\n"
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join(format!("scorecast_none_{}", std::process::id()));
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        match ensure_config_files(&tmp).unwrap_err() {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }
}
