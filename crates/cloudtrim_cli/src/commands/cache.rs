//! Cache command - Manage cached analysis results.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use cloudtrim_core::{FileCache, ResultCache};

use super::DEFAULT_CACHE_DIR;

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Remove every cached analysis result
    Clear {
        /// Directory of the result cache
        #[arg(long, env = "CLOUDTRIM_CACHE_DIR", default_value = DEFAULT_CACHE_DIR)]
        cache_dir: PathBuf,
    },
}

pub async fn execute(args: CacheArgs) -> Result<()> {
    match args.action {
        CacheAction::Clear { cache_dir } => {
            let cache = FileCache::new(&cache_dir);
            let removed = cache
                .clear()
                .await
                .with_context(|| format!("Failed to clear cache at {}", cache.dir().display()))?;
            println!("🧹 Removed {} cached result(s) from {}", removed, cache.dir().display());
        }
    }
    Ok(())
}
