//! Configuration loader and validator for the invoice dashboard service.
use crate::validation::ValidationMode;
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
    #[serde(default)]
    pub actions: Actions,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub listen: String,
}

/// Invoice action settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actions {
    #[serde(default)]
    pub validation: ValidationMode,
    #[serde(default = "default_invoices_path")]
    pub invoices_path: String,
}

impl Default for Actions {
    fn default() -> Self {
        Self {
            validation: ValidationMode::default(),
            invoices_path: default_invoices_path(),
        }
    }
}

fn default_invoices_path() -> String {
    crate::actions::DEFAULT_INVOICES_PATH.to_string()
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// `DATABASE_URL` if set, otherwise a SQLite file under `app.data_dir`.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/dashboard.db?mode=rwc", self.app.data_dir))
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.app
            .listen
            .parse()
            .map_err(|_| ConfigError::Invalid("app.listen must be a socket address"))
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
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    cfg.listen_addr()?;
    if !cfg.actions.invoices_path.starts_with('/') {
        return Err(ConfigError::Invalid("actions.invoices_path must start with '/'"));
    }
    Ok(())
}

/// A complete, valid sample configuration.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  listen: "127.0.0.1:3000"

actions:
  validation: lenient
  invoices_path: "/dashboard/invoices"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.actions.validation, ValidationMode::Lenient);
        assert_eq!(cfg.listen_addr().unwrap().port(), 3000);
    }

    #[test]
    fn actions_section_is_optional() {
        let cfg: Config =
            serde_yaml::from_str("app:\n  data_dir: ./d\n  listen: 0.0.0.0:80\n").unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.actions, Actions::default());
        assert_eq!(cfg.actions.invoices_path, "/dashboard/invoices");
    }

    #[test]
    fn strict_mode_parses() {
        let yaml = example().replace("validation: lenient", "validation: strict");
        let cfg: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(cfg.actions.validation, ValidationMode::Strict);
    }

    #[test]
    fn invalid_data_dir() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = " ".into();
        match validate(&cfg).unwrap_err() {
            ConfigError::Invalid(msg) => assert!(msg.contains("data_dir")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_listen() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.listen = "localhost".into();
        match validate(&cfg).unwrap_err() {
            ConfigError::Invalid(msg) => assert!(msg.contains("app.listen")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_invoices_path() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.actions.invoices_path = "dashboard/invoices".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_validation_mode_is_a_parse_error() {
        let yaml = example().replace("validation: lenient", "validation: loose");
        assert!(serde_yaml::from_str::<Config>(&yaml).is_err());
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.app.listen, "127.0.0.1:3000");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let td = tempdir().unwrap();
        let err = load(Some(&td.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
