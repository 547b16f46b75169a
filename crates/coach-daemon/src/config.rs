// config.rs — coach.toml: server, store and account settings.
//
// Every field has a default, so an empty or missing file yields a daemon
// that listens on 127.0.0.1:8787 and stores data under `.coach/`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use coach_policy::{Caller, PolicyError, Role};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    /// Accounts allowed to call the API, one per bearer token.
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Prefix for the API routes, e.g. `/coach/v1`.
    #[serde(default = "default_base_path")]
    pub base_path: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_path: default_base_path(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_base_path() -> String {
    "/coach/v1".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one JSON file per option blob.
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_audit_log")]
    pub audit_log: PathBuf,

    /// JSONL file receiving lifecycle events.
    #[serde(default = "default_events_log")]
    pub events_log: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            audit_log: default_audit_log(),
            events_log: default_events_log(),
        }
    }
}

fn default_store_dir() -> PathBuf {
    PathBuf::from(".coach/options")
}

fn default_audit_log() -> PathBuf {
    PathBuf::from(".coach/audit.jsonl")
}

fn default_events_log() -> PathBuf {
    PathBuf::from(".coach/events.jsonl")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub token: String,
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// `authority` or `subject` (`trainer` / `student` also accepted).
    pub role: String,
}

impl AccountConfig {
    pub fn caller(&self) -> Result<Caller, PolicyError> {
        let role: Role = self.role.parse()?;
        Caller::new(role, &self.id, &self.name, &self.email)
    }
}

impl DaemonConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Load the config, or use defaults when the file does not exist.
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = DaemonConfig::load_or_default(&dir.path().join("coach.toml")).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8787");
        assert_eq!(config.server.base_path, "/coach/v1");
        assert_eq!(config.server.log_format, LogFormat::Pretty);
        assert_eq!(config.store.dir, PathBuf::from(".coach/options"));
        assert!(config.accounts.is_empty());
    }

    #[test]
    fn parses_accounts_and_partial_sections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coach.toml");
        std::fs::write(
            &path,
            r#"
[server]
log_format = "json"

[[accounts]]
token = "t-admin"
id = "ADMIN"
name = "Coach"
role = "trainer"

[[accounts]]
token = "t-s1"
id = "S1"
role = "subject"
"#,
        )
        .unwrap();

        let config = DaemonConfig::load_or_default(&path).unwrap();
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert_eq!(config.server.bind, "127.0.0.1:8787");
        assert_eq!(config.accounts.len(), 2);
        assert!(config.accounts[0].caller().unwrap().is_authority());
        assert_eq!(config.accounts[1].caller().unwrap().identity, "S1");
    }

    #[test]
    fn unknown_role_is_rejected() {
        let account = AccountConfig {
            token: "t".into(),
            id: "X".into(),
            name: String::new(),
            email: String::new(),
            role: "janitor".into(),
        };
        assert!(matches!(account.caller(), Err(PolicyError::UnknownRole(_))));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coach.toml");
        std::fs::write(&path, "[server\nbind = ").unwrap();
        assert!(DaemonConfig::load_or_default(&path).is_err());
    }
}
