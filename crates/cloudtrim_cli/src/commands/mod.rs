//! CLI command definitions.
//!
//! Each subcommand maps to one use of the analysis engine. Commands run
//! in-process against an inventory snapshot file; the price catalog can
//! optionally be reached over HTTP.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use cloudtrim_core::AnalyzerConfig;
use cloudtrim_provider::{HttpPriceCatalog, PriceCatalogApi, SnapshotProvider};

pub mod analyze;
pub mod cache;
pub mod price;

/// Default location of the file-backed result cache.
pub const DEFAULT_CACHE_DIR: &str = ".cloudtrim/cache";

/// cloudtrim - cloud cost analysis and recommendations
#[derive(Parser)]
#[command(name = "cloudtrim")]
#[command(version, about = "cloudtrim - cloud cost analysis and recommendations")]
#[command(long_about = r#"
cloudtrim inspects a region's compute and storage inventory, correlates each
resource with its utilization and price, and recommends cost reductions with
an estimated monthly savings figure.

COMMANDS:
  analyze       → Analyze an inventory snapshot and print recommendations
  price         → Resolve the hourly and monthly price of an instance type
  cache clear   → Remove cached analysis results

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or configuration
  3 - Inventory collection failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze an inventory snapshot for cost savings
    Analyze(analyze::AnalyzeArgs),

    /// Resolve the price of an instance type
    Price(price::PriceArgs),

    /// Manage the analysis result cache
    Cache(cache::CacheArgs),
}

/// Raised for bad user input: unreadable config or snapshot files.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct InvalidInput(pub String);

/// Live price catalog options shared by commands.
#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    /// HTTP price catalog endpoint (overrides snapshot prices)
    #[arg(long, env = "CLOUDTRIM_PRICE_ENDPOINT")]
    pub price_endpoint: Option<String>,

    /// Bearer token for the price catalog endpoint
    #[arg(long, env = "CLOUDTRIM_PRICE_API_KEY", hide_env_values = true)]
    pub price_api_key: Option<String>,
}

impl CatalogArgs {
    /// The HTTP catalog client, if an endpoint was given.
    pub fn http_catalog(&self) -> Option<Arc<dyn PriceCatalogApi>> {
        let mut catalog = HttpPriceCatalog::new(self.price_endpoint.as_deref()?);
        if let Some(key) = &self.price_api_key {
            catalog = catalog.with_api_key(key.clone());
        }
        debug!("Using HTTP price catalog at {}", catalog.endpoint());
        Some(Arc::new(catalog))
    }
}

/// Load the analyzer configuration, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig> {
    let Some(path) = path else {
        return Ok(AnalyzerConfig::default());
    };

    debug!("Loading configuration from {}", path.display());
    AnalyzerConfig::load(path).map_err(|e| {
        anyhow::Error::new(InvalidInput(format!(
            "Failed to load config {}: {}",
            path.display(),
            e
        )))
    })
}

/// Load an inventory snapshot file.
pub fn load_snapshot(path: &Path) -> Result<SnapshotProvider> {
    debug!("Loading snapshot from {}", path.display());
    SnapshotProvider::load(path).map_err(|e| {
        anyhow::Error::new(InvalidInput(format!(
            "Failed to load snapshot {}: {}",
            path.display(),
            e
        )))
    })
}
