//! Corporate Gift Ordering Backend
//!
//! This is the main entry point for the gift-ordering service.
//! The application accepts gift batches over HTTP and submits each one to the
//! commerce platform as a single billing draft plus one fulfillment order per recipient.
//!
//! # Architecture
//!
//! The application follows a modular architecture with:
//! - Commerce layer for the external platform API
//! - Service layer for billing, fulfillment and batch orchestration
//! - API layer for HTTP endpoints
//! - An in-memory store of submission results
//! - Metrics for monitoring
//!
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use app_config::AppConfig;
use cache::SubmissionCache;
use commerce::ShopifyClient;
use server::Server;
use service::{DeliveryFeeTable, GiftOrderService, GiftOrderServiceImpl};

/// Initialize the tracing subscriber for logging
fn init_logger() -> Result<()> {
    tracing_subscriber::fmt::init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(err) = init_logger() {
        eprintln!("Failed to initialize logger: {}", err);
        return Err(anyhow::anyhow!("Failed to initialize logger"));
    }

    info!("Gift ordering backend starting...");

    let config = AppConfig::load().context("Failed to load configuration")?;

    if config.commerce_api_token.is_empty() {
        warn!("COMMERCE_API_TOKEN is not set; commerce platform calls will be rejected");
    }

    let platform = ShopifyClient::from_config(&config)
        .context("Failed to create commerce platform client")?;
    info!(
        store = %config.commerce_store_url,
        api_version = %config.commerce_api_version,
        "Commerce platform client initialized"
    );

    let order_service: Arc<dyn GiftOrderService> = Arc::new(GiftOrderServiceImpl::new(
        platform,
        DeliveryFeeTable::standard(),
    ));
    let submission_cache = Arc::new(SubmissionCache::new());

    let mut tasks = JoinSet::new();

    let http_port = config.http_port.to_string();
    info!("Using HTTP port: {}", http_port);

    let http_server = Server::new(http_port, order_service, submission_cache);
    tasks.spawn(async move {
        if let Err(err) = http_server.start().await {
            error!("HTTP server error: {}", err);
            std::process::exit(1);
        }
    });

    while let Some(res) = tasks.join_next().await {
        if let Err(err) = res {
            error!("Task error: {}", err);
        }
    }

    info!("Application stopped");
    Ok(())
}
