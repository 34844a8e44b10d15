//! # Configuration
//!
//! One YAML file holds everything the daemon needs: the workflow catalog
//! (step graphs, question schema history, email templates), scheduler
//! settings, notifier selection and the health/metrics bind address.
//!
//! ## Environment overrides
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `NISINP_NOTIFIER_URL` | use the HTTP notifier with this webhook |
//! | `NISINP_NOTIFIER_TOKEN` | bearer token for the HTTP notifier |
//! | `NISINP_NOTIFIER_TIMEOUT_SECS` | HTTP notifier request timeout |
//! | `NISINP_BIND` | health/metrics listen address |
//! | `DATABASE_URL` | PostgreSQL repository (read by the store) |
//!
//! The notifier token is only ever read from the environment.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use nisinp_core::CatalogError;
use nisinp_engine::{Catalog, SchedulerConfig};
use nisinp_notify::{EmailTemplate, HttpNotifierConfig, RegulatorContact, TemplateCatalog};
use nisinp_workflow::{SchemaCatalog, SchemaHistory, StepGraph, StepGraphRegistry};

const DEFAULT_BIND: &str = "0.0.0.0:9090";

/// The configuration file as written.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Substituted for `#PUBLIC_URL#` in templates.
    #[serde(default)]
    pub public_url: String,
    /// Health/metrics listen address.
    #[serde(default)]
    pub bind: Option<String>,
    /// Sweep intervals and limits.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Where notifications go.
    #[serde(default)]
    pub notifier: NotifierSettings,
    /// The workflow catalog.
    pub catalog: CatalogFile,
}

/// Notifier selection as written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotifierSettings {
    /// Log every notification.
    #[default]
    Log,
    /// POST tickets to a webhook.
    Http {
        /// Webhook URL.
        url: String,
        /// Request timeout in seconds.
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
}

/// The catalog section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    /// Step graphs.
    pub graphs: Vec<StepGraph>,
    /// Question schema with history.
    #[serde(default)]
    pub schema: SchemaCatalog,
    /// Email templates.
    #[serde(default)]
    pub templates: Vec<EmailTemplate>,
    /// Notification addresses per regulator.
    #[serde(default)]
    pub regulators: Vec<RegulatorContact>,
}

/// The notifier to build.
#[derive(Debug, Clone)]
pub enum NotifierChoice {
    /// [`nisinp_notify::LogNotifier`].
    Log,
    /// [`nisinp_notify::HttpNotifier`].
    Http(HttpNotifierConfig),
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// The validated catalog.
    pub catalog: Catalog,
    /// Scheduler settings.
    pub scheduler: SchedulerConfig,
    /// Notifier to build.
    pub notifier: NotifierChoice,
    /// Health/metrics listen address.
    pub bind: SocketAddr,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// The file.
        path: PathBuf,
        /// The I/O failure.
        source: std::io::Error,
    },
    /// The file is not valid configuration YAML.
    #[error("cannot parse {path}: {source}")]
    Parse {
        /// The file.
        path: PathBuf,
        /// The YAML failure.
        source: serde_yaml::Error,
    },
    /// The catalog is inconsistent.
    #[error("invalid catalog: {0}")]
    Catalog(#[from] CatalogError),
    /// The notifier settings are invalid.
    #[error(transparent)]
    Notifier(#[from] nisinp_notify::ConfigError),
    /// The bind address does not parse.
    #[error("invalid bind address {0:?}")]
    InvalidBind(String),
}

/// Load `path` with overrides from the process environment.
pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
    load_with_env(path, |name| std::env::var(name).ok())
}

/// Load `path` with overrides from `env`.
pub fn load_with_env(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: FileConfig = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    resolve(file, env)
}

/// Validate a parsed file and apply overrides from `env`.
pub fn resolve(
    file: FileConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig, ConfigError> {
    let catalog = build_catalog(file.catalog, file.public_url)?;

    let token = env("NISINP_NOTIFIER_TOKEN");
    let timeout_override = env("NISINP_NOTIFIER_TIMEOUT_SECS").and_then(|s| s.parse().ok());
    let notifier = match (env("NISINP_NOTIFIER_URL"), file.notifier) {
        (Some(url), settings) => {
            let file_timeout = match settings {
                NotifierSettings::Http { timeout_secs, .. } => timeout_secs,
                NotifierSettings::Log => None,
            };
            NotifierChoice::Http(HttpNotifierConfig::new(
                &url,
                token.as_deref(),
                timeout_override
                    .or(file_timeout)
                    .unwrap_or(nisinp_notify::config::DEFAULT_TIMEOUT_SECS),
            )?)
        }
        (None, NotifierSettings::Http { url, timeout_secs }) => {
            NotifierChoice::Http(HttpNotifierConfig::new(
                &url,
                token.as_deref(),
                timeout_override
                    .or(timeout_secs)
                    .unwrap_or(nisinp_notify::config::DEFAULT_TIMEOUT_SECS),
            )?)
        }
        (None, NotifierSettings::Log) => NotifierChoice::Log,
    };

    let bind_raw = env("NISINP_BIND")
        .or(file.bind)
        .unwrap_or_else(|| DEFAULT_BIND.to_string());
    let bind = bind_raw
        .parse()
        .map_err(|_| ConfigError::InvalidBind(bind_raw.clone()))?;

    Ok(AppConfig {
        catalog,
        scheduler: file.scheduler,
        notifier,
        bind,
    })
}

fn build_catalog(file: CatalogFile, public_url: String) -> Result<Catalog, CatalogError> {
    let graphs = StepGraphRegistry::new(file.graphs)?;
    let schema = SchemaHistory::from_catalog(file.schema)?;
    let templates =
        TemplateCatalog::new(file.templates, public_url)?.with_regulators(file.regulators)?;
    Catalog::new(graphs, schema, templates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const EXAMPLE: &str = include_str!("../../../config/nisinp.example.yaml");

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn loads_example_config() {
        let file = write_config(EXAMPLE);
        let config = load_with_env(file.path(), no_env).unwrap();
        assert!(config.catalog.graphs.len() >= 2);
        assert!(matches!(config.notifier, NotifierChoice::Log));
        assert_eq!(config.bind.port(), 9090);
        assert_eq!(config.scheduler.workers, 8);

        let incident = nisinp_state::Incident::new(
            "LU-1",
            nisinp_core::StepGraphId::new("gdpr-cnpd-all"),
            nisinp_core::RegulationId::new("GDPR"),
            nisinp_core::RegulatorId::new("CNPD"),
            nisinp_core::SectorId::new("all"),
            nisinp_core::Timestamp::parse("2026-03-01T08:00:00Z").unwrap(),
        );
        assert_eq!(
            config.catalog.templates.recipients(&incident),
            vec!["databreach@cnpd.example.lu".to_string()]
        );
    }

    #[test]
    fn env_overrides_notifier_and_bind() {
        let env: HashMap<&str, &str> = [
            ("NISINP_NOTIFIER_URL", "https://tickets.example/hooks/nisinp"),
            ("NISINP_NOTIFIER_TOKEN", "hook-secret"),
            ("NISINP_BIND", "127.0.0.1:9300"),
        ]
        .into_iter()
        .collect();
        let file = write_config(EXAMPLE);
        let config =
            load_with_env(file.path(), |name| env.get(name).map(|v| v.to_string())).unwrap();

        match &config.notifier {
            NotifierChoice::Http(http) => {
                assert_eq!(http.url.as_str(), "https://tickets.example/hooks/nisinp");
                assert_eq!(http.timeout_secs, nisinp_notify::config::DEFAULT_TIMEOUT_SECS);
                assert!(http.token.is_some());
            }
            NotifierChoice::Log => panic!("expected the HTTP notifier"),
        }
        assert_eq!(config.bind.port(), 9300);
        assert!(!format!("{config:?}").contains("hook-secret"));
    }

    #[test]
    fn rejects_dangling_template() {
        let file = write_config(
            r#"
catalog:
  graphs:
    - id: g
      regulation: NIS2
      regulator: ILR
      sector: energy
      opening_email: missing
      steps:
        - position: 1
          name: Early warning
          report: ew
          trigger: NOTIFICATION_DATE
          delay_hours: 24
  schema:
    categories:
      - { id: general, label: General, position: 1 }
    placements:
      - id: ew-summary
        report: ew
        created_at: "2026-01-01T00:00:00Z"
        state: { question: q, category: general, position: 1, label: Summary, kind: FREE_TEXT }
"#,
        );
        let err = load_with_env(file.path(), no_env).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Catalog(CatalogError::DanglingReference { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_positions() {
        let file = write_config(
            r#"
catalog:
  graphs:
    - id: g
      regulation: NIS2
      regulator: ILR
      sector: energy
      steps:
        - { position: 1, name: A, report: ew, trigger: NONE }
        - { position: 1, name: B, report: ew, trigger: NONE }
"#,
        );
        assert!(matches!(
            load_with_env(file.path(), no_env).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = load_with_env(Path::new("/nonexistent/nisinp.yaml"), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn rejects_bad_bind() {
        let mut file: FileConfig = serde_yaml::from_str(EXAMPLE).unwrap();
        file.bind = Some("not-an-address".into());
        assert!(matches!(resolve(file, no_env), Err(ConfigError::InvalidBind(_))));
    }
}
