//! Configuration loading and management
//!
//! Handles parsing of `inctrack.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::store::{self, OnCorrupt};
use crate::ticket_id::DEFAULT_TICKET_PREFIX;

/// File name looked up in the data directory when `--config` is not given
pub const CONFIG_FILE_NAME: &str = "inctrack.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Store location and recovery policy
    #[serde(default)]
    pub store: StoreConfig,

    /// Ticket id suggestions
    #[serde(default)]
    pub tickets: TicketsConfig,
}

/// Store-related configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Explicit store file; the platform data directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// What to do with a store file that cannot be read
    #[serde(default)]
    pub on_corrupt: OnCorrupt,
}

impl StoreConfig {
    /// The configured store path, or the per-platform default
    pub fn resolve_path(&self) -> crate::error::Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => store::default_store_path(),
        }
    }
}

/// Ticket configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketsConfig {
    /// Prefix placed before the `YYMMDD` part of suggested ids
    #[serde(default = "default_ticket_prefix")]
    pub prefix: String,
}

fn default_ticket_prefix() -> String {
    DEFAULT_TICKET_PREFIX.to_string()
}

impl Default for TicketsConfig {
    fn default() -> Self {
        Self {
            prefix: default_ticket_prefix(),
        }
    }
}

impl TicketsConfig {
    fn validate(&self) -> crate::error::Result<()> {
        let prefix = self.prefix.trim();
        if prefix.is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "tickets.prefix cannot be empty".to_string(),
            ));
        }
        if !prefix.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(crate::error::Error::InvalidConfig(
                "tickets.prefix must be alphanumeric".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from an `inctrack.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path).unwrap_or_else(|err| {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.tickets.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert!(cfg.store.path.is_none());
        assert_eq!(cfg.store.on_corrupt, OnCorrupt::Recreate);
        assert_eq!(cfg.tickets.prefix, "TH");
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        let content = r#"
[store]
path = "/srv/ledger/incident_numbers.json"
on_corrupt = "fail"

[tickets]
prefix = "OPS"
"#;
        fs::write(&path, content.trim()).expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(
            cfg.store.path,
            Some(PathBuf::from("/srv/ledger/incident_numbers.json"))
        );
        assert_eq!(cfg.store.on_corrupt, OnCorrupt::Fail);
        assert_eq!(cfg.tickets.prefix, "OPS");
        assert_eq!(
            cfg.store.resolve_path().expect("resolve"),
            PathBuf::from("/srv/ledger/incident_numbers.json")
        );
    }

    #[test]
    fn invalid_prefix_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[tickets]\nprefix = \"T-H\"").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        match err {
            crate::error::Error::InvalidConfig(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_on_corrupt_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[store]\non_corrupt = \"ignore\"").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        assert!(matches!(err, crate::error::Error::TomlParse(_)));
    }

    #[test]
    fn load_from_dir_defaults_when_missing_or_invalid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from_dir(dir.path());
        assert_eq!(cfg.tickets.prefix, "TH");

        fs::write(dir.path().join(CONFIG_FILE_NAME), "[tickets]\nprefix = \"\"")
            .expect("write config");
        let cfg = Config::load_from_dir(dir.path());
        assert_eq!(cfg.tickets.prefix, "TH");
    }

    #[test]
    fn load_from_dir_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(CONFIG_FILE_NAME), "[tickets]\nprefix = \"INC\"")
            .expect("write config");

        let cfg = Config::load_from_dir(dir.path());
        assert_eq!(cfg.tickets.prefix, "INC");
    }

    #[test]
    fn save_writes_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.toml");
        let cfg = Config::default();
        cfg.save(&path).expect("save config");

        let written = fs::read_to_string(&path).expect("read config");
        assert!(written.contains("prefix = \"TH\""));
        assert!(written.contains("on_corrupt = \"recreate\""));
    }
}
