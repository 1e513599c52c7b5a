//! Price command - Resolve the price of an instance type.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use cloudtrim_core::{catalog_location, PriceLookup, PriceTable, PricingResolver};
use cloudtrim_provider::PriceCatalogApi;

use super::{load_config, load_snapshot, CatalogArgs};

#[derive(Args)]
pub struct PriceArgs {
    /// Instance type, e.g. m5.large
    #[arg(long)]
    pub subtype: String,

    /// Region code (defaults to the configured default region)
    #[arg(short, long, env = "CLOUDTRIM_REGION")]
    pub region: Option<String>,

    /// Inventory snapshot whose prices act as the catalog
    #[arg(short, long, env = "CLOUDTRIM_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Analyzer configuration file (.toml, .yaml or .json)
    #[arg(short, long, env = "CLOUDTRIM_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: PriceArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let region = match args.region.as_deref().map(str::trim) {
        Some(r) if !r.is_empty() => r.to_string(),
        _ => config.default_region.clone(),
    };

    let catalog: Option<Arc<dyn PriceCatalogApi>> = match (args.catalog.http_catalog(), &args.snapshot) {
        (Some(http), _) => Some(http),
        (None, Some(path)) => Some(Arc::new(load_snapshot(path)?)),
        (None, None) => None,
    };

    let table = PriceTable::new(config.pricing.fallback.clone());
    let resolver = match catalog {
        Some(catalog) if config.pricing.catalog_enabled => PricingResolver::new(catalog, table),
        _ => PricingResolver::offline(table),
    }
    .with_hours_per_month(config.hours_per_month);

    let (hourly, source) = match resolver.lookup_catalog(&args.subtype, &region).await {
        PriceLookup::Found(price) => (price, "catalog".to_string()),
        PriceLookup::Unavailable(reason) => {
            let price = resolver.fallback_price(&args.subtype, &region);
            (price, format!("reference table ({})", reason))
        }
    };
    let monthly = hourly * resolver.hours_per_month();
    let location = catalog_location(&region).to_string();

    if args.json {
        let body = json!({
            "subtype": args.subtype,
            "region": region,
            "location": location,
            "hourly": hourly,
            "monthly": monthly,
            "source": source,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("💲 {} in {} ({})", args.subtype, region, location);
        println!("   Hourly:  ${:.4}", hourly);
        println!("   Monthly: ${:.2}", monthly);
        println!("   Source:  {}", source);
    }

    Ok(())
}
