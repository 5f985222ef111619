//! Depot - entitlement-gated distribution core
//!
//! Depot resolves role-based entitlements against per-community policy
//! documents in MongoDB and serves claims from file-backed asset pools,
//! keeping stock counts fresh through scheduled cache refresh and
//! directory-health cycles.

pub mod alert;
pub mod claim;
pub mod config;
pub mod db;
pub mod monitor;
pub mod policy;
pub mod ratelimit;
pub mod stock;
pub mod stores;
pub mod types;

pub use claim::{ClaimDecision, ClaimService};
pub use config::Args;
pub use monitor::DirectoryMonitor;
pub use types::{DepotError, Result};
