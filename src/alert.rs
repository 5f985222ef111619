//! Alerting seam for directory health reports
//!
//! The monitor produces [`DirectoryHealthReport`]s; rendering and delivery
//! (operator channels, dashboards) live behind this trait, outside the core.

use async_trait::async_trait;
use tracing::warn;

use crate::monitor::DirectoryHealthReport;

/// Accepts health reports for delivery to operators
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn emit(&self, report: DirectoryHealthReport);
}

/// Default sink that logs report summaries through tracing
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn emit(&self, report: DirectoryHealthReport) {
        for entry in &report.created {
            warn!(
                "Missing directory created: {} ({}/{})",
                entry.directory.display(),
                entry.community,
                entry.item_type
            );
        }
        for entry in &report.critical {
            warn!(
                "Out of stock: {} ({}/{})",
                entry.directory.display(),
                entry.community,
                entry.item_type
            );
        }
        for entry in &report.low {
            warn!(
                "Low stock: {} files at {} ({}/{})",
                entry.count,
                entry.directory.display(),
                entry.community,
                entry.item_type
            );
        }
    }
}
