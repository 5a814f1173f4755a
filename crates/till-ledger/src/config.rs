//! # Ledger Configuration
//!
//! Configuration management for the ledger engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TILL_INVOICE_PREFIX=FAC-                                           │
//! │     TILL_DRAWER_POLICY=per_cashier                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/till-ledger/ledger.toml (Linux)                          │
//! │     ~/Library/Application Support/com.till.ledger/ledger.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     INV-0001, shared drawer                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # ledger.toml
//! [sequence]
//! invoice_prefix = "INV-"
//! next_invoice_number = 1
//! width = 4
//!
//! [drawer]
//! policy = "shared"  # shared | per_cashier
//!
//! [database]
//! path = "/var/lib/till/ledger.db"
//! max_connections = 5
//!
//! [events]
//! capacity = 256
//! ```
//!
//! The sequence section is only a starting point. On startup the stored
//! counter wins whenever it is ahead of `next_invoice_number`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use till_core::validation::{validate_invoice_prefix, validate_invoice_width};
use till_core::{DrawerPolicy, InvoiceSequence, DEFAULT_INVOICE_PREFIX, DEFAULT_INVOICE_WIDTH};

// =============================================================================
// Sections
// =============================================================================

/// Initial state of the invoice sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSettings {
    #[serde(default = "default_prefix")]
    pub invoice_prefix: String,

    #[serde(default = "default_next_invoice_number")]
    pub next_invoice_number: u64,

    /// Zero-padded digits after the prefix.
    #[serde(default = "default_width")]
    pub width: u32,
}

fn default_prefix() -> String {
    DEFAULT_INVOICE_PREFIX.to_string()
}

fn default_next_invoice_number() -> u64 {
    1
}

fn default_width() -> u32 {
    DEFAULT_INVOICE_WIDTH
}

impl Default for SequenceSettings {
    fn default() -> Self {
        SequenceSettings {
            invoice_prefix: default_prefix(),
            next_invoice_number: default_next_invoice_number(),
            width: default_width(),
        }
    }
}

impl SequenceSettings {
    /// The allocator this section describes.
    pub fn to_sequence(&self) -> InvoiceSequence {
        InvoiceSequence::new(&self.invoice_prefix, self.next_invoice_number, self.width)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawerSettings {
    #[serde(default)]
    pub policy: DrawerPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to `ledger.db` in the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSettings {
    /// Events buffered per subscriber before the slowest one starts lagging.
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

fn default_event_capacity() -> usize {
    256
}

impl Default for EventSettings {
    fn default() -> Self {
        EventSettings {
            capacity: default_event_capacity(),
        }
    }
}

// =============================================================================
// Ledger Config
// =============================================================================

/// Complete ledger configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub sequence: SequenceSettings,

    #[serde(default)]
    pub drawer: DrawerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub events: EventSettings,
}

impl LedgerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (ledger.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| EngineError::ConfigLoadFailed(e.to_string()))?;
                config = toml::from_str(&contents)
                    .map_err(|e| EngineError::ConfigLoadFailed(e.to_string()))?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load ledger config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> EngineResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| EngineError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| EngineError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| EngineError::ConfigSaveFailed(e.to_string()))?;
        std::fs::write(&path, contents).map_err(|e| EngineError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Ledger config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        let seq = &self.sequence;
        validate_invoice_prefix(&seq.invoice_prefix)
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        validate_invoice_width(seq.width).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

        if seq.next_invoice_number == 0 {
            return Err(EngineError::InvalidConfig(
                "next_invoice_number must be at least 1".into(),
            ));
        }
        let capacity = seq.to_sequence().capacity();
        if seq.next_invoice_number > capacity {
            return Err(EngineError::InvalidConfig(format!(
                "next_invoice_number {} does not fit in {} digits",
                seq.next_invoice_number, seq.width
            )));
        }

        if self.database.max_connections == 0 {
            return Err(EngineError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }
        if self.events.capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "event capacity must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(prefix) = var("TILL_INVOICE_PREFIX") {
            debug!(prefix = %prefix, "Overriding invoice prefix from environment");
            self.sequence.invoice_prefix = prefix;
        }

        if let Some(next) = var("TILL_NEXT_INVOICE_NUMBER") {
            match next.parse::<u64>() {
                Ok(n) => self.sequence.next_invoice_number = n,
                Err(_) => warn!(value = %next, "Ignoring invalid TILL_NEXT_INVOICE_NUMBER"),
            }
        }

        if let Some(width) = var("TILL_INVOICE_WIDTH") {
            match width.parse::<u32>() {
                Ok(w) => self.sequence.width = w,
                Err(_) => warn!(value = %width, "Ignoring invalid TILL_INVOICE_WIDTH"),
            }
        }

        if let Some(policy) = var("TILL_DRAWER_POLICY") {
            match policy.to_lowercase().replace('-', "_").as_str() {
                "shared" => self.drawer.policy = DrawerPolicy::Shared,
                "per_cashier" => self.drawer.policy = DrawerPolicy::PerCashier,
                _ => warn!(policy = %policy, "Unknown drawer policy in environment"),
            }
        }

        if let Some(path) = var("TILL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(capacity) = var("TILL_EVENT_CAPACITY") {
            if let Ok(c) = capacity.parse::<usize>() {
                self.events.capacity = c;
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "till", "ledger")
            .map(|dirs| dirs.config_dir().join("ledger.toml"))
    }

    /// Database file to open: the configured path, else `ledger.db` in the
    /// platform data directory, else the working directory.
    pub fn database_path(&self) -> PathBuf {
        self.database.path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("com", "till", "ledger")
                .map(|dirs| dirs.data_dir().join("ledger.db"))
                .unwrap_or_else(|| PathBuf::from("ledger.db"))
        })
    }

    pub fn drawer_policy(&self) -> DrawerPolicy {
        self.drawer.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.sequence.invoice_prefix, "INV-");
        assert_eq!(config.sequence.next_invoice_number, 1);
        assert_eq!(config.sequence.width, 4);
        assert_eq!(config.drawer.policy, DrawerPolicy::Shared);
        assert_eq!(config.events.capacity, 256);
        assert!(config.validate().is_ok());
        assert_eq!(config.sequence.to_sequence().peek().unwrap().as_str(), "INV-0001");
    }

    #[test]
    fn test_config_validation() {
        let mut config = LedgerConfig::default();

        config.sequence.invoice_prefix = "IN V".to_string();
        assert!(config.validate().is_err());

        config.sequence.invoice_prefix = "FAC-".to_string();
        config.sequence.next_invoice_number = 0;
        assert!(config.validate().is_err());

        // 10000 does not fit in four digits
        config.sequence.next_invoice_number = 10_000;
        assert!(config.validate().is_err());

        config.sequence.width = 5;
        assert!(config.validate().is_ok());

        config.events.capacity = 0;
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TILL_INVOICE_PREFIX", "FAC-"),
            ("TILL_NEXT_INVOICE_NUMBER", "42"),
            ("TILL_INVOICE_WIDTH", "not-a-number"),
            ("TILL_DRAWER_POLICY", "per-cashier"),
            ("TILL_DB_PATH", "/tmp/till.db"),
        ]
        .into_iter()
        .collect();

        let mut config = LedgerConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.sequence.invoice_prefix, "FAC-");
        assert_eq!(config.sequence.next_invoice_number, 42);
        assert_eq!(config.sequence.width, 4);
        assert_eq!(config.drawer.policy, DrawerPolicy::PerCashier);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/till.db"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: LedgerConfig = toml::from_str(
            r#"
            [sequence]
            invoice_prefix = "T-"

            [drawer]
            policy = "per_cashier"
            "#,
        )
        .unwrap();

        assert_eq!(config.sequence.invoice_prefix, "T-");
        assert_eq!(config.sequence.width, 4);
        assert_eq!(config.drawer.policy, DrawerPolicy::PerCashier);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!(
            "till-ledger-config-{}.toml",
            std::process::id()
        ));
        let mut config = LedgerConfig::default();
        config.sequence.next_invoice_number = 120;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[sequence]"));
        assert!(contents.contains("[drawer]"));

        let parsed: LedgerConfig = toml::from_str(&contents).unwrap();
        assert_eq!(parsed, config);
        let _ = std::fs::remove_file(path);
    }
}
