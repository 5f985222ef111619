//! Configuration for Depot
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::time::Duration;
use uuid::Uuid;

/// Depot - entitlement-gated distribution core for file-backed asset pools
#[derive(Parser, Debug, Clone)]
#[command(name = "depot")]
#[command(about = "Distributes file-backed entitlement items across communities")]
pub struct Args {
    /// Unique node identifier for this depot instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "depot")]
    pub mongodb_db: String,

    /// Stock cache refresh interval in seconds
    #[arg(long, env = "STOCK_REFRESH_SECONDS", default_value = "300")]
    pub stock_refresh_seconds: u64,

    /// Directory health check interval in seconds
    #[arg(long, env = "DIRECTORY_CHECK_SECONDS", default_value = "3600")]
    pub directory_check_seconds: u64,

    /// Stock count below which a location is reported as low
    #[arg(long, env = "LOW_STOCK_THRESHOLD", default_value = "5")]
    pub low_stock_threshold: u64,

    /// Maximum entries per category in an emitted health report
    #[arg(long, env = "REPORT_ENTRY_CAP", default_value = "10")]
    pub report_entry_cap: usize,

    /// File extension that marks a distributable asset (without dot)
    #[arg(long, env = "ASSET_EXTENSION", default_value = "txt")]
    pub asset_extension: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Stock refresh interval as a Duration
    pub fn stock_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.stock_refresh_seconds)
    }

    /// Directory check interval as a Duration
    pub fn directory_check_interval(&self) -> Duration {
        Duration::from_secs(self.directory_check_seconds)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.stock_refresh_seconds == 0 {
            return Err("STOCK_REFRESH_SECONDS must be greater than zero".to_string());
        }

        if self.directory_check_seconds == 0 {
            return Err("DIRECTORY_CHECK_SECONDS must be greater than zero".to_string());
        }

        if self.asset_extension.is_empty() || self.asset_extension.starts_with('.') {
            return Err("ASSET_EXTENSION must be a bare extension like 'txt'".to_string());
        }

        Ok(())
    }
}
