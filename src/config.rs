//! Configuration loader and validator for the pitch board service.
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub auth: Auth,
    pub sanity: Sanity,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub bind_addr: String,
    pub data_dir: String,
    pub sweep_interval_secs: u64,
    pub staging_ttl_minutes: u64,
    pub session_ttl_hours: u64,
}

/// Sign-in settings: the flat list of people allowed to publish.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Auth {
    pub members: Vec<Member>,
}

/// One publishing member: an access key exchanged at sign-in for a
/// session, and the author document it maps to in the content store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub access_key: String,
    pub author_ref: String,
    pub name: String,
}

/// Content store (Sanity) settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sanity {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub token: String,
    /// Override of the API origin; defaults to the project's
    /// `https://<project_id>.api.sanity.io`.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` and the
    /// staging subdirectory if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(self.staging_dir())
    }

    /// Directory that holds staged (not yet submitted) image files.
    pub fn staging_dir(&self) -> std::path::PathBuf {
        Path::new(&self.app.data_dir).join("staging")
    }

    /// Look up a member by access key.
    pub fn member_for_key(&self, key: &str) -> Option<&Member> {
        self.auth.members.iter().find(|m| m.access_key == key)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.bind_addr.parse::<SocketAddr>().is_err() {
        return Err(ConfigError::Invalid(
            "app.bind_addr must be a host:port socket address",
        ));
    }
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.sweep_interval_secs == 0 {
        return Err(ConfigError::Invalid("app.sweep_interval_secs must be > 0"));
    }
    if cfg.app.staging_ttl_minutes == 0 {
        return Err(ConfigError::Invalid("app.staging_ttl_minutes must be > 0"));
    }
    if cfg.app.session_ttl_hours == 0 {
        return Err(ConfigError::Invalid("app.session_ttl_hours must be > 0"));
    }

    for member in &cfg.auth.members {
        if member.access_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "auth.members[].access_key must be non-empty",
            ));
        }
        if member.author_ref.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "auth.members[].author_ref must be non-empty",
            ));
        }
        if member.name.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.members[].name must be non-empty"));
        }
    }
    let mut keys: Vec<&str> = cfg
        .auth
        .members
        .iter()
        .map(|m| m.access_key.as_str())
        .collect();
    keys.sort_unstable();
    keys.dedup();
    if keys.len() != cfg.auth.members.len() {
        return Err(ConfigError::Invalid(
            "auth.members[].access_key values must be unique",
        ));
    }

    if cfg.sanity.project_id.trim().is_empty() {
        return Err(ConfigError::Invalid("sanity.project_id must be non-empty"));
    }
    if cfg.sanity.dataset.trim().is_empty() {
        return Err(ConfigError::Invalid("sanity.dataset must be non-empty"));
    }
    if cfg.sanity.api_version.trim().is_empty() {
        return Err(ConfigError::Invalid("sanity.api_version must be non-empty"));
    }
    if cfg.sanity.token.trim().is_empty() {
        return Err(ConfigError::Invalid("sanity.token must be non-empty"));
    }
    if let Some(url) = &cfg.sanity.base_url {
        if url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "sanity.base_url must be non-empty when set",
            ));
        }
    }

    Ok(())
}

/// Returns an example YAML document matching the schema.
pub fn example() -> &'static str {
    r#"app:
  bind_addr: "127.0.0.1:8080"
  data_dir: "./data"
  sweep_interval_secs: 300
  staging_ttl_minutes: 60
  session_ttl_hours: 720

auth:
  members:
    - access_key: "CHANGE_ME_LONG_RANDOM_KEY"
      author_ref: "author-8c4f2b"
      name: "Ada Example"

sanity:
  project_id: "YOUR_PROJECT_ID"
  dataset: "production"
  api_version: "2024-01-01"
  token: "YOUR_SANITY_WRITE_TOKEN"
"#
}
