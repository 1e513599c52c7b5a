//! Analyze command - Run a cost analysis over an inventory snapshot.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use cloudtrim_core::{
    fingerprint, AnalysisRequest, AnalysisResponse, AnalysisResult, AnalysisService, Analyzer,
    AnalyzerConfig, FileCache,
};
use cloudtrim_provider::ProviderClients;

use super::{load_config, load_snapshot, CatalogArgs, InvalidInput, DEFAULT_CACHE_DIR};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// What to look for (recorded with the request)
    #[arg(short, long, default_value = "")]
    pub prompt: String,

    /// Region to analyze (defaults to the configured default region)
    #[arg(short, long, env = "CLOUDTRIM_REGION")]
    pub region: Option<String>,

    /// Inventory snapshot file (.yaml, .yml or .json)
    #[arg(short, long, env = "CLOUDTRIM_SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Analyzer configuration file (.toml, .yaml or .json)
    #[arg(short, long, env = "CLOUDTRIM_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Directory of the result cache
    #[arg(long, env = "CLOUDTRIM_CACHE_DIR", default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Skip the result cache
    #[arg(long)]
    pub no_cache: bool,

    /// Print the JSON response instead of a report
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: AnalyzeArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let snapshot = load_snapshot(&args.snapshot)?;

    let mut clients = ProviderClients::from_provider(snapshot);
    if let Some(catalog) = args.catalog.http_catalog() {
        clients = clients.with_price_catalog(catalog);
    }

    let use_cache = !args.no_cache && config.cache.enabled;
    let scope = if use_cache {
        Some(cache_scope(&args, &config)?)
    } else {
        None
    };

    let mut service = AnalysisService::new(Analyzer::new(clients, config)?);
    if let Some(scope) = scope {
        let cache = FileCache::new(&args.cache_dir);
        info!("Using result cache at {}", cache.dir().display());
        service = service
            .with_cache(Arc::new(cache))
            .with_cache_scope(scope);
    }

    let request = AnalysisRequest {
        prompt: args.prompt,
        region: args.region,
    };
    let result = service.analyze(&request).await?;

    if args.json {
        let response = AnalysisResponse::from(&result);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_report(&result);
    }

    Ok(())
}

/// Cache scope covering the inputs outside the request that shape a result.
/// Editing the snapshot or config, or switching catalogs, yields a new scope.
fn cache_scope(args: &AnalyzeArgs, config: &AnalyzerConfig) -> Result<String> {
    let snapshot = std::fs::read(&args.snapshot).map_err(|e| {
        anyhow::Error::new(InvalidInput(format!(
            "Failed to read snapshot {}: {}",
            args.snapshot.display(),
            e
        )))
    })?;
    let location = std::fs::canonicalize(&args.snapshot).unwrap_or_else(|_| args.snapshot.clone());
    let config = serde_json::to_vec(config).context("Failed to encode configuration")?;
    let endpoint = args.catalog.price_endpoint.as_deref().unwrap_or_default();

    Ok(fingerprint([
        location.to_string_lossy().as_bytes(),
        snapshot.as_slice(),
        config.as_slice(),
        endpoint.as_bytes(),
    ]))
}

fn print_report(result: &AnalysisResult) {
    println!(
        "📊 Cost analysis for {} ({} resources)",
        result.region,
        result.resources.len()
    );
    println!();

    if result.resources.is_empty() {
        println!("   No resources found");
    } else {
        println!("📦 Resources:");
        for resource in &result.resources {
            let utilization = resource
                .utilization_pct
                .map(|u| format!("{:.1}%", u))
                .unwrap_or_else(|| "n/a".to_string());
            println!(
                "   {:<24} {:<12} {:<10} ${:>9.2}/month   CPU {}",
                resource.id,
                resource.subtype,
                resource.lifecycle_state,
                resource.monthly_cost_estimate,
                utilization
            );
        }
    }
    println!();

    let specific: Vec<_> = result.resource_recommendations().collect();
    if !specific.is_empty() {
        println!("💡 Recommendations:");
        for rec in specific {
            println!("   • {}", rec.message);
        }
        println!();
    }

    println!("📝 General:");
    for rec in result.general_recommendations() {
        println!("   • {}", rec.message);
    }
    println!();

    println!(
        "💰 Estimated monthly savings: ${:.2}",
        result.total_estimated_savings
    );
}
