mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, commands::Commands};
use kaipo_counters::collectors::{InterfaceStatsCollector, create_platform_collector};
use kaipo_counters::config::Settings;
use kaipo_counters::monitor;
use log::info;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&settings.log_level))
        .init();

    let collector: Arc<dyn InterfaceStatsCollector> =
        Arc::from(create_platform_collector(&settings.collector_options())?);

    match cli.command {
        Commands::Snapshot { format } => {
            let format = format.unwrap_or(settings.format);
            let batch = monitor::collect_with_timeout(collector, settings.collect_timeout())
                .await
                .context("Unable to collect interface counters")?;

            let mut stdout = std::io::stdout().lock();
            cli::output::write_batch(&mut stdout, &batch, format)?;
        }
        Commands::Watch {
            interval,
            count,
            format,
        } => {
            let mut settings = settings;
            if let Some(interval) = interval {
                settings.interval_secs = interval;
                settings.validate()?;
            }
            let format = format.unwrap_or(settings.format);

            let watcher = monitor::watch(
                collector,
                settings.interval(),
                settings.collect_timeout(),
                count,
                |batch| {
                    let mut stdout = std::io::stdout().lock();
                    cli::output::write_batch(&mut stdout, batch, format)
                },
            );

            tokio::select! {
                result = watcher => {
                    let emitted = result?;
                    info!("Watch finished after {} successful collections", emitted);
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping watch");
                }
            }
        }
    }

    Ok(())
}
