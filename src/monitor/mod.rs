//! Directory-health monitor
//!
//! Two scheduled cycles reconcile the stock cache and the filesystem against
//! the configured storage locations: a frequent stock refresh and an
//! infrequent directory check that creates missing locations and raises
//! health alerts. Each cycle is single-flight: a tick that lands while the
//! previous cycle of the same task is still running is skipped.

mod report;

pub use report::{DirectoryHealthReport, LocationEntry, LocationHealth};

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::alert::AlertSink;
use crate::stock::StockCache;
use crate::stores::PolicyStore;
use crate::types::Result;

/// Community label used for global default locations
const GLOBAL_COMMUNITY: &str = "global";

/// Placeholder artifact written into newly created locations
const PLACEHOLDER_FILE: &str = "README";

/// Monitor configuration; intervals and thresholds are policy, not literals
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub stock_refresh_interval: Duration,
    pub directory_check_interval: Duration,
    /// Stock count below which a location is reported as low
    pub low_stock_threshold: u64,
    /// Maximum entries per category in an emitted report
    pub report_entry_cap: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            stock_refresh_interval: Duration::from_secs(300),
            directory_check_interval: Duration::from_secs(3600),
            low_stock_threshold: 5,
            report_entry_cap: 10,
        }
    }
}

/// Reconciles cached stock against the filesystem and raises health alerts
pub struct DirectoryMonitor {
    config: MonitorConfig,
    policy: Arc<dyn PolicyStore>,
    cache: Arc<StockCache>,
    alerts: Arc<dyn AlertSink>,
    /// Lifecycle flag; loops watch it so `stop` wakes them immediately
    /// instead of waiting out the next tick
    running: watch::Sender<bool>,
    refresh_in_flight: AtomicBool,
    check_in_flight: AtomicBool,
}

impl DirectoryMonitor {
    pub fn new(
        config: MonitorConfig,
        policy: Arc<dyn PolicyStore>,
        cache: Arc<StockCache>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            config,
            policy,
            cache,
            alerts,
            running: watch::Sender::new(false),
            refresh_in_flight: AtomicBool::new(false),
            check_in_flight: AtomicBool::new(false),
        }
    }

    /// Every configured storage location, defaults first, then enabled
    /// communities, de-duplicated by path with the first occurrence kept.
    /// The ordering is policy: global defaults take precedence over
    /// community entries that share a path.
    async fn configured_locations(&self) -> Result<Vec<LocationEntry>> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut locations = Vec::new();

        if let Some(config) = self.policy.global_config().await? {
            for (item_type, item) in &config.default_items {
                if !item.enabled {
                    continue;
                }
                let directory = PathBuf::from(&item.directory);
                if seen.insert(directory.clone()) {
                    locations.push(LocationEntry {
                        community: GLOBAL_COMMUNITY.to_string(),
                        item_type: item_type.clone(),
                        directory,
                        count: 0,
                    });
                }
            }
        }

        for community in self.policy.enabled_communities().await? {
            for (item_type, item) in &community.items {
                if !item.enabled {
                    continue;
                }
                let directory = PathBuf::from(&item.directory);
                if seen.insert(directory.clone()) {
                    locations.push(LocationEntry {
                        community: community.name.clone(),
                        item_type: item_type.clone(),
                        directory,
                        count: 0,
                    });
                }
            }
        }

        Ok(locations)
    }

    /// Rebuild the stock cache from the configured locations.
    ///
    /// A policy-store failure aborts the cycle and leaves the previous cache
    /// contents in place; the next scheduled run retries.
    pub async fn refresh_stock_cache(&self) -> Result<()> {
        if self.refresh_in_flight.swap(true, Ordering::SeqCst) {
            warn!("Stock refresh still running, skipping this cycle");
            return Ok(());
        }

        let result = self.refresh_stock_cache_inner().await;
        self.refresh_in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn refresh_stock_cache_inner(&self) -> Result<()> {
        let locations = self.configured_locations().await?;
        let paths: Vec<PathBuf> = locations.into_iter().map(|l| l.directory).collect();

        self.cache.refresh_all(&paths).await;
        debug!("Stock refresh complete: {} locations", paths.len());
        Ok(())
    }

    /// Check every configured location, creating missing directories, and
    /// emit a capped health report when anything needs operator attention.
    pub async fn check_directories(&self) -> Result<()> {
        if self.check_in_flight.swap(true, Ordering::SeqCst) {
            warn!("Directory check still running, skipping this cycle");
            return Ok(());
        }

        let result = self.check_directories_inner().await;
        self.check_in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn check_directories_inner(&self) -> Result<()> {
        let report = self.check_all().await?;

        info!(
            "Directory check: {} checked, {} created, {} critical, {} low",
            report.checked,
            report.created.len(),
            report.critical.len(),
            report.low.len()
        );

        if report.requires_alert() {
            self.alerts
                .emit(report.capped(self.config.report_entry_cap))
                .await;
        }

        Ok(())
    }

    /// One full reconciliation pass, returning the uncapped report.
    ///
    /// Also usable on demand by operator tooling.
    pub async fn check_all(&self) -> Result<DirectoryHealthReport> {
        let locations = self.configured_locations().await?;
        let mut report = DirectoryHealthReport::new();

        for mut entry in locations {
            report.checked += 1;

            if entry.directory.exists() {
                entry.count = self.cache.get(&entry.directory).await;
            }

            match LocationHealth::assess(
                &entry.directory,
                entry.count,
                self.config.low_stock_threshold,
            ) {
                LocationHealth::Missing => match self.create_location(&entry.directory) {
                    Ok(()) => {
                        info!("Created missing directory {}", entry.directory.display());
                        report.created.push(entry);
                    }
                    Err(e) => {
                        // Leave it for the next cycle; count it as empty now
                        error!("Failed to create {}: {}", entry.directory.display(), e);
                        report.critical.push(entry);
                    }
                },
                LocationHealth::Critical => report.critical.push(entry),
                LocationHealth::Low => report.low.push(entry),
                LocationHealth::Healthy => {}
            }
        }

        Ok(report)
    }

    fn create_location(&self, directory: &std::path::Path) -> std::io::Result<()> {
        std::fs::create_dir_all(directory)?;
        std::fs::write(
            directory.join(PLACEHOLDER_FILE),
            "Asset files dropped into this directory become claimable stock.\n",
        )
    }

    /// Start both scheduled loops
    pub async fn start(self: Arc<Self>) {
        if *self.running.borrow() {
            warn!("Directory monitor already running");
            return;
        }
        self.running.send_replace(true);

        info!(
            "Starting directory monitor (refresh {:?}, check {:?})",
            self.config.stock_refresh_interval, self.config.directory_check_interval
        );

        let refresher = Arc::clone(&self);
        let mut refresh_running = self.running.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(refresher.config.stock_refresh_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if !*refresh_running.borrow() {
                            break;
                        }
                        if let Err(e) = refresher.refresh_stock_cache().await {
                            error!("Stock refresh cycle failed: {}", e);
                        }
                    }
                    _ = refresh_running.changed() => {
                        if !*refresh_running.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Stock refresh loop stopped");
        });

        let checker = Arc::clone(&self);
        let mut check_running = self.running.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(checker.config.directory_check_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if !*check_running.borrow() {
                            break;
                        }
                        if let Err(e) = checker.check_directories().await {
                            error!("Directory check cycle failed: {}", e);
                        }
                    }
                    _ = check_running.changed() => {
                        if !*check_running.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Directory check loop stopped");
        });
    }

    /// Stop both loops; the watch wakes them without waiting for a tick
    pub fn stop(&self) {
        self.running.send_replace(false);
        info!("Stopping directory monitor");
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }
}
