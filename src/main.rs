//! Depot - entitlement-gated distribution core

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use depot::{
    alert::TracingAlertSink,
    config::Args,
    db::MongoClient,
    monitor::{DirectoryMonitor, MonitorConfig},
    stock::{StockCache, StockCacheConfig},
    stores::{MongoClaimStore, MongoPolicyStore},
    ClaimService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("depot={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Depot - Distribution Core");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Stock refresh: every {}s", args.stock_refresh_seconds);
    info!("Directory check: every {}s", args.directory_check_seconds);
    info!("Low stock threshold: {}", args.low_stock_threshold);
    info!("Asset extension: .{}", args.asset_extension);
    info!("======================================");

    // Connect to MongoDB
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            client
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let policy = Arc::new(MongoPolicyStore::new(&mongo).await?);
    let claims = Arc::new(MongoClaimStore::new(&mongo).await?);

    let cache = Arc::new(StockCache::new(StockCacheConfig {
        asset_extension: args.asset_extension.clone(),
    }));

    let monitor = Arc::new(DirectoryMonitor::new(
        MonitorConfig {
            stock_refresh_interval: args.stock_refresh_interval(),
            directory_check_interval: args.directory_check_interval(),
            low_stock_threshold: args.low_stock_threshold,
            report_entry_cap: args.report_entry_cap,
        },
        Arc::clone(&policy) as Arc<dyn depot::stores::PolicyStore>,
        Arc::clone(&cache),
        Arc::new(TracingAlertSink),
    ));

    // Prime the cache before any claims are served
    if let Err(e) = monitor.refresh_stock_cache().await {
        error!("Initial stock refresh failed: {}", e);
    }

    // Held for the process lifetime; claim traffic arrives through callers
    // embedding this service (the library surface), not through main
    let _claims = ClaimService::new(
        policy as Arc<dyn depot::stores::PolicyStore>,
        claims as Arc<dyn depot::stores::ClaimStore>,
        Arc::clone(&cache),
        args.low_stock_threshold,
    );

    Arc::clone(&monitor).start().await;
    info!("Monitor cycles started");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping monitor");
    monitor.stop();

    Ok(())
}
