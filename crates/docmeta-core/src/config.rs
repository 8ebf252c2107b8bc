//! Configuration module for docmeta.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, environment overrides, validation, defaults, and a builder
//! pattern for programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::SiteLocator;

/// Environment variable holding the client secret.
pub const ENV_CLIENT_SECRET: &str = "DOCMETA_CLIENT_SECRET";
/// Environment variable overriding `library.tenant_id`.
pub const ENV_TENANT_ID: &str = "DOCMETA_TENANT_ID";
/// Environment variable overriding `library.client_id`.
pub const ENV_CLIENT_ID: &str = "DOCMETA_CLIENT_ID";
/// Environment variable overriding `delta.enabled` (`true`/`false`/`1`/`0`).
pub const ENV_ENABLED: &str = "DOCMETA_ENABLED";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for docmeta.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub delta: DeltaConfig,
    pub library: LibraryConfig,
    pub logging: LoggingConfig,
}

/// Delta processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeltaConfig {
    /// Master switch. A disabled worker performs no network or store access.
    pub enabled: bool,
    /// Seconds between runs in watch mode.
    pub poll_interval: u64,
    /// Maximum items processed concurrently within one page.
    pub max_workers: usize,
    /// Baseline outbound requests per second.
    pub rate_limit_per_second: u32,
}

/// Remote document library settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Azure AD tenant (directory) ID.
    pub tenant_id: String,
    /// Azure AD application (client) ID.
    pub client_id: String,
    /// Client secret. Prefer supplying it through `DOCMETA_CLIENT_SECRET`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_secret: String,
    /// Absolute URL of the site hosting the library.
    pub site_url: String,
    /// Display name of the document library (drive).
    pub drive_name: String,
    /// Optional subfolder that scopes the delta feed.
    pub folder_path: String,
    /// Where the delta cursor is persisted.
    pub state_file: PathBuf,
    /// NDJSON file receiving one record per processed item.
    pub output_path: PathBuf,
    /// Upper bound of items processed in a single run.
    pub max_items_per_run: usize,
    /// Field names to keep; empty keeps everything.
    pub include_fields: Vec<String>,
    /// HTTP request timeout in seconds.
    pub http_timeout: u64,
    /// Write every generated field even when the remote value is filled in.
    pub force_update: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/docmeta/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("docmeta")
            .join("config.yaml")
    }

    /// Overlay credentials and the enabled flag from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable lookup.
    ///
    /// Blank values are ignored; an unparsable `DOCMETA_ENABLED` leaves the
    /// flag unchanged.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(secret) = get(ENV_CLIENT_SECRET) {
            self.library.client_secret = secret;
        }
        if let Some(tenant) = get(ENV_TENANT_ID) {
            self.library.tenant_id = tenant;
        }
        if let Some(client) = get(ENV_CLIENT_ID) {
            self.library.client_id = client;
        }
        if let Some(enabled) = get(ENV_ENABLED) {
            match enabled.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => self.delta.enabled = true,
                "false" | "0" | "no" => self.delta.enabled = false,
                _ => {}
            }
        }
    }
}

impl LibraryConfig {
    /// Subfolder without surrounding slashes, `None` when the whole drive is in scope.
    pub fn folder(&self) -> Option<&str> {
        let trimmed = self.folder_path.trim().trim_matches('/');
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval: 5,
            max_workers: 20,
            rate_limit_per_second: 20,
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            site_url: String::new(),
            drive_name: "Documentos".to_string(),
            folder_path: String::new(),
            state_file: PathBuf::from(".state/delta-cursor.json"),
            output_path: PathBuf::from(".out/metadata.ndjson"),
            max_items_per_run: 500,
            include_fields: Vec::new(),
            http_timeout: 100,
            force_update: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error with the offending field path and a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"delta.max_workers"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn check_range<T>(errors: &mut Vec<ValidationError>, field: &str, value: T, min: T, max: T)
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        errors.push(ValidationError {
            field: field.into(),
            message: format!("must be in range {min}..={max}"),
        });
    }
}

fn check_required(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError {
            field: field.into(),
            message: "is required".into(),
        });
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. Library settings are
    /// only enforced while delta processing is enabled.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- delta ---
        check_range(&mut errors, "delta.poll_interval", self.delta.poll_interval, 1, 3600);
        check_range(&mut errors, "delta.max_workers", self.delta.max_workers, 1, 50);
        check_range(
            &mut errors,
            "delta.rate_limit_per_second",
            self.delta.rate_limit_per_second,
            5,
            100,
        );

        // --- library ---
        let lib = &self.library;
        check_range(
            &mut errors,
            "library.max_items_per_run",
            lib.max_items_per_run,
            1,
            100_000,
        );
        check_range(&mut errors, "library.http_timeout", lib.http_timeout, 1, 300);

        if self.delta.enabled {
            check_required(&mut errors, "library.tenant_id", &lib.tenant_id);
            check_required(&mut errors, "library.client_id", &lib.client_id);
            check_required(&mut errors, "library.client_secret", &lib.client_secret);
            check_required(&mut errors, "library.drive_name", &lib.drive_name);

            if lib.site_url.trim().is_empty() {
                check_required(&mut errors, "library.site_url", &lib.site_url);
            } else if let Err(e) = SiteLocator::parse(&lib.site_url) {
                errors.push(ValidationError {
                    field: "library.site_url".into(),
                    message: e.to_string(),
                });
            }

            if lib.state_file.as_os_str().is_empty() {
                check_required(&mut errors, "library.state_file", "");
            }
            if lib.output_path.as_os_str().is_empty() {
                check_required(&mut errors, "library.output_path", "");
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use docmeta_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .enabled(true)
///     .site_url("https://contoso.sharepoint.com/sites/legal")
///     .max_workers(8)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- delta ---

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.delta.enabled = enabled;
        self
    }

    pub fn poll_interval(mut self, seconds: u64) -> Self {
        self.config.delta.poll_interval = seconds;
        self
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.delta.max_workers = n;
        self
    }

    pub fn rate_limit_per_second(mut self, n: u32) -> Self {
        self.config.delta.rate_limit_per_second = n;
        self
    }

    // --- library ---

    pub fn credentials(
        mut self,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.config.library.tenant_id = tenant_id.into();
        self.config.library.client_id = client_id.into();
        self.config.library.client_secret = client_secret.into();
        self
    }

    pub fn site_url(mut self, url: impl Into<String>) -> Self {
        self.config.library.site_url = url.into();
        self
    }

    pub fn drive_name(mut self, name: impl Into<String>) -> Self {
        self.config.library.drive_name = name.into();
        self
    }

    pub fn folder_path(mut self, path: impl Into<String>) -> Self {
        self.config.library.folder_path = path.into();
        self
    }

    pub fn state_file(mut self, path: PathBuf) -> Self {
        self.config.library.state_file = path;
        self
    }

    pub fn output_path(mut self, path: PathBuf) -> Self {
        self.config.library.output_path = path;
        self
    }

    pub fn max_items_per_run(mut self, n: usize) -> Self {
        self.config.library.max_items_per_run = n;
        self
    }

    pub fn include_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.library.include_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn http_timeout(mut self, seconds: u64) -> Self {
        self.config.library.http_timeout = seconds;
        self
    }

    pub fn force_update(mut self, force: bool) -> Self {
        self.config.library.force_update = force;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
