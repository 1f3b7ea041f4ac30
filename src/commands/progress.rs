//! Progress command handler: summarize what earlier runs produced.

use anyhow::{Context, Result};
use archive_harvester::{HarvestConfig, ProgressReport};

pub async fn run_progress_command(config: &HarvestConfig) -> Result<()> {
    let report = ProgressReport::gather(config)
        .await
        .with_context(|| format!("cannot read {}", config.database_path.display()))?;
    println!("{report}");
    Ok(())
}
