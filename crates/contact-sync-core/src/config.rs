//! Configuration types for contact reconciliation
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Country calling code used to expand national phone numbers
    ///
    /// Digits only, without `+` or leading zeros (e.g. "49"). When unset,
    /// national numbers are compared as written.
    #[serde(default)]
    pub country_hint: Option<String>,

    /// Sort matcher candidates by remote id before matching
    ///
    /// Keeps ambiguous matches reproducible when the remote directory does
    /// not return contacts in a stable order.
    #[serde(default = "default_sort_candidates")]
    pub sort_candidates: bool,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Sync record store configuration
    #[serde(default)]
    pub record_store: SyncRecordStoreConfig,

    /// Configuration snapshot cache settings
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

impl SyncConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            country_hint: None,
            sort_candidates: default_sort_candidates(),
            event_channel_capacity: default_event_channel_capacity(),
            record_store: SyncRecordStoreConfig::default(),
            snapshot: SnapshotConfig::default(),
        }
    }

    /// Set the country calling code hint
    pub fn with_country_hint(mut self, hint: impl Into<String>) -> Self {
        self.country_hint = Some(hint.into());
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if let Some(hint) = &self.country_hint {
            if hint.is_empty() || !hint.chars().all(|c| c.is_ascii_digit()) {
                return Err(crate::Error::config(format!(
                    "Country hint must contain digits only, got '{}'",
                    hint
                )));
            }
            if hint.starts_with('0') {
                return Err(crate::Error::config(format!(
                    "Country hint must not start with 0, got '{}'",
                    hint
                )));
            }
        }

        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        self.record_store.validate()?;
        self.snapshot.validate()?;

        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Sync record store configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncRecordStoreConfig {
    /// File-based store
    File {
        /// Path to the sync record file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,
}

impl SyncRecordStoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SyncRecordStoreConfig::File { path } if path.trim().is_empty() => Err(
                crate::Error::config("Sync record file path cannot be empty"),
            ),
            _ => Ok(()),
        }
    }
}

/// Configuration snapshot cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Age after which a cached snapshot is served as stale (in seconds)
    #[serde(default = "default_snapshot_ttl_secs")]
    pub ttl_secs: u64,
}

impl SnapshotConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.ttl_secs).unwrap_or(i64::MAX))
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.ttl_secs == 0 {
            return Err(crate::Error::config("Snapshot TTL must be > 0"));
        }
        Ok(())
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_snapshot_ttl_secs(),
        }
    }
}

fn default_sort_candidates() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_snapshot_ttl_secs() -> u64 {
    24 * 60 * 60
}
