//! Run command handler: execute the harvest pipeline.

use anyhow::{Context, Result};
use archive_harvester::{HarvestConfig, Harvester, LogProgress, ProgressSink};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

/// Byte progress bar for the file currently downloading.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl ProgressSink for BarProgress {
    fn start(&mut self, name: &str, total: Option<u64>) {
        self.bar.finish_and_clear();
        self.bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template(
                        "{msg} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template("{spinner} {msg} {bytes} ({bytes_per_sec})")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        self.bar.set_message(name.to_string());
    }

    fn advance(&mut self, bytes: u64) {
        self.bar.inc(bytes);
    }

    fn finish(&mut self, _bytes: u64) {
        self.bar.finish_and_clear();
    }

    fn abandon(&mut self) {
        self.bar.abandon();
    }
}

pub async fn run_harvest_command(config: HarvestConfig, show_bar: bool) -> Result<()> {
    let mut sink: Box<dyn ProgressSink> = if show_bar {
        Box::new(BarProgress::new())
    } else {
        Box::new(LogProgress::new(config.progress_interval_bytes))
    };

    let mut harvester = Harvester::open(config)
        .await
        .context("cannot start harvester")?;

    // Resolves only on an actual Ctrl-C; a missing signal handler never fires.
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let interrupted = tokio::select! {
        _ = harvester.run(sink.as_mut()) => false,
        () = interrupt => true,
    };
    if interrupted {
        warn!("interrupted, run stopped");
    }

    let stats = harvester.statistics();
    println!("{stats}");
    info!(
        downloaded = stats.files_downloaded,
        skipped = stats.files_skipped,
        interrupted,
        "run complete"
    );

    harvester.into_store().close().await;
    Ok(())
}
