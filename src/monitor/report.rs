//! Directory health classification and report types

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Health tier of one storage location, re-evaluated from scratch each cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationHealth {
    /// Directory absent on disk
    Missing,
    /// Directory present but empty
    Critical,
    /// Stock below the configured threshold
    Low,
    Healthy,
}

impl LocationHealth {
    /// Classify an existing location by its stock count
    pub fn classify(count: u64, low_threshold: u64) -> Self {
        if count == 0 {
            Self::Critical
        } else if count < low_threshold {
            Self::Low
        } else {
            Self::Healthy
        }
    }

    /// Classify a location including its presence on disk
    pub fn assess(directory: &Path, count: u64, low_threshold: u64) -> Self {
        if directory.exists() {
            Self::classify(count, low_threshold)
        } else {
            Self::Missing
        }
    }
}

/// One storage location observed during a monitor cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationEntry {
    /// Community the location belongs to ("global" for defaults)
    pub community: String,
    pub item_type: String,
    pub directory: PathBuf,
    pub count: u64,
}

/// Output of one directory-check cycle.
///
/// Ephemeral: produced, emitted to the alert sink, then discarded. The
/// emitted copy may be capped per category for message-size reasons; the
/// report built by `check_all` always carries the full lists.
#[derive(Debug, Clone, Default)]
pub struct DirectoryHealthReport {
    /// Locations that were absent and have been created this cycle
    pub created: Vec<LocationEntry>,
    /// Locations with zero stock
    pub critical: Vec<LocationEntry>,
    /// Locations below the low-stock threshold
    pub low: Vec<LocationEntry>,
    /// Total locations examined
    pub checked: usize,
    pub generated_at: Option<DateTime<Utc>>,
}

impl DirectoryHealthReport {
    pub fn new() -> Self {
        Self {
            generated_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Whether anything in this cycle warrants an operator alert
    pub fn requires_alert(&self) -> bool {
        !self.created.is_empty() || !self.critical.is_empty() || !self.low.is_empty()
    }

    /// Copy with each category truncated to the first `cap` entries.
    ///
    /// Presentation limit only; the full data stays in `self`.
    pub fn capped(&self, cap: usize) -> Self {
        Self {
            created: self.created.iter().take(cap).cloned().collect(),
            critical: self.critical.iter().take(cap).cloned().collect(),
            low: self.low.iter().take(cap).cloned().collect(),
            checked: self.checked,
            generated_at: self.generated_at,
        }
    }
}
