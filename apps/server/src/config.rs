//! # Server Configuration
//!
//! Everything the server needs at startup: listen address, database file,
//! issuer identity, tax rate, invoice delivery mode and the SMTP relay.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FACTURA_PORT=8080                                                  │
//! │     FACTURA_SMTP_PASSWORD=...                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config / FACTURA_CONFIG, else                                    │
//! │     ~/.config/factura-server/factura.toml (Linux)                      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "factura.db"
//!
//! [issuer]
//! name = "Arca Continental"
//!
//! [invoice]
//! tax_rate_bps = 1600      # 16%
//! logo_path = "static/logo.png" # bundled logo when unset
//! delivery = "inline"      # inline | queued
//!
//! [smtp]
//! host = "smtp.gmail.com"
//! port = 587
//! username = "facturas@example.com"
//! from = "Facturas <facturas@example.com>"
//! ```

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use factura_core::validation::validate_tax_rate_bps;
use factura_core::{TaxRate, DEFAULT_TAX_RATE_BPS};
use factura_invoice::{parse_mailbox, IssuerProfile, SmtpSettings};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Delivery Mode
// =============================================================================

/// When an invoice is rendered and mailed relative to the sale commit.
///
/// ```text
/// INLINE (default)                      QUEUED
/// ────────────────                      ──────
/// commit → render → send → respond      commit → enqueue → respond
/// caller sees render/send failures      worker renders and sends later
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    #[default]
    Inline,
    Queued,
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMode::Inline => write!(f, "inline"),
            DeliveryMode::Queued => write!(f, "queued"),
        }
    }
}

impl std::str::FromStr for DeliveryMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inline" => Ok(DeliveryMode::Inline),
            "queued" | "queue" => Ok(DeliveryMode::Queued),
            other => Err(ConfigError::Invalid(format!(
                "Unknown delivery mode: '{}'. Valid options: inline, queued",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Default: the platform data dir, else `./factura.db`.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("factura.db"))
        .unwrap_or_else(|| PathBuf::from("factura.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSettings {
    /// Tax rate in basis points. Default: 1600 (16%)
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,

    /// PNG printed in the header. The bundled logo when unset.
    #[serde(default)]
    pub logo_path: Option<PathBuf>,

    /// `false` prints no logo at all.
    #[serde(default = "default_show_logo")]
    pub show_logo: bool,

    /// Offset from UTC of the store. Used for the printed invoice date and
    /// for where the dashboard's "today" begins.
    #[serde(default)]
    pub timezone_offset_minutes: i32,

    #[serde(default)]
    pub delivery: DeliveryMode,

    /// Capacity of the queued-delivery channel.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_tax_rate_bps() -> u32 {
    DEFAULT_TAX_RATE_BPS
}

fn default_show_logo() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        InvoiceSettings {
            tax_rate_bps: default_tax_rate_bps(),
            logo_path: None,
            show_logo: default_show_logo(),
            timezone_offset_minutes: 0,
            delivery: DeliveryMode::default(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl InvoiceSettings {
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Offset for printed dates. Out-of-range values fall back to UTC.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.timezone_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

// =============================================================================
// App Configuration
// =============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub issuer: IssuerProfile,

    #[serde(default)]
    pub invoice: InvoiceSettings,

    #[serde(default)]
    pub smtp: SmtpSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else the platform default)
    /// 3. `FACTURA_*` environment variables
    ///
    /// The result is validated before it is returned.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = match config_path.or_else(Self::default_config_path) {
            Some(path) if path.exists() => {
                info!(?path, "Loading config from file");
                Self::from_file(&path)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Checks the values a running server depends on.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        validate_tax_rate_bps(self.invoice.tax_rate_bps)
            .map_err(|e| ConfigError::Invalid(format!("invoice.{}", e)))?;

        if self.invoice.timezone_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::Invalid(
                "invoice.timezone_offset_minutes must be within one day".into(),
            ));
        }

        if self.invoice.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "invoice.queue_capacity must be greater than 0".into(),
            ));
        }

        if self.smtp.port == 0 {
            return Err(ConfigError::Invalid("smtp.port must be non-zero".into()));
        }

        let has_credentials = self.smtp.username.is_some() || self.smtp.password.is_some();
        if has_credentials && (self.smtp.username.is_none() || self.smtp.password.is_none()) {
            return Err(ConfigError::Invalid(
                "smtp.username and smtp.password must be set together".into(),
            ));
        }

        if has_credentials || !self.smtp.from.trim().is_empty() {
            parse_mailbox(&self.smtp.from)
                .map_err(|e| ConfigError::Invalid(format!("smtp.from: {}", e)))?;
        }

        Ok(())
    }

    /// Applies `FACTURA_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup. Unparseable values are
    /// logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("FACTURA_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Some(port) = lookup("FACTURA_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding server port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(value = %port, "Ignoring invalid FACTURA_PORT"),
            }
        }

        if let Some(path) = lookup("FACTURA_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }

        if let Some(bps) = lookup("FACTURA_TAX_RATE_BPS") {
            match bps.parse::<u32>() {
                Ok(b) => self.invoice.tax_rate_bps = b,
                Err(_) => warn!(value = %bps, "Ignoring invalid FACTURA_TAX_RATE_BPS"),
            }
        }

        if let Some(path) = lookup("FACTURA_LOGO_PATH") {
            self.invoice.logo_path = Some(PathBuf::from(path));
        }

        if let Some(mode) = lookup("FACTURA_DELIVERY") {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding delivery mode from environment");
                    self.invoice.delivery = parsed;
                }
                Err(e) => warn!(error = %e, "Ignoring FACTURA_DELIVERY"),
            }
        }

        if let Some(host) = lookup("FACTURA_SMTP_HOST") {
            self.smtp.host = host;
        }

        if let Some(port) = lookup("FACTURA_SMTP_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.smtp.port = p,
                Err(_) => warn!(value = %port, "Ignoring invalid FACTURA_SMTP_PORT"),
            }
        }

        if let Some(user) = lookup("FACTURA_SMTP_USERNAME") {
            self.smtp.username = Some(user);
        }

        if let Some(pass) = lookup("FACTURA_SMTP_PASSWORD") {
            self.smtp.password = Some(pass);
        }

        if let Some(from) = lookup("FACTURA_SMTP_FROM") {
            self.smtp.from = from;
        }
    }

    /// `factura.toml` in the platform config dir.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("factura.toml"))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "factura", "factura-server")
}
