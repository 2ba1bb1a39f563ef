use anyhow::Context;
use clap::Parser;
use portal_fetch::utils::{logger, validation::Validate};
use portal_fetch::{AttemptStatus, AutomationEngine, ChromeSession, CliConfig, JsonlLedger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting portal-fetch");
    if config.verbose {
        tracing::debug!(owner = %config.owner, max_downloads = config.max_downloads, "run configuration");
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("error: {e}");
        std::process::exit(1);
    }

    let driver = ChromeSession::launch(&config.session_options())
        .await
        .context("could not start the browser session")?;
    let ledger = JsonlLedger::new(config.ledger_path.clone());
    let engine = AutomationEngine::new(driver, ledger, config.engine_options());

    match engine.run(&config.credentials()).await {
        Ok(batch) => {
            println!(
                "Batch finished: {} completed, {} failed",
                batch.completed_count(),
                batch.failed_count()
            );
            for attempt in &batch.attempts {
                match attempt.status {
                    AttemptStatus::Completed => {
                        println!(
                            "  ok      {} ({} bytes)",
                            attempt.filename, attempt.file_size_bytes
                        );
                    }
                    AttemptStatus::Failed => {
                        println!(
                            "  failed  {} ({})",
                            attempt.source_url,
                            attempt.error_message.as_deref().unwrap_or("unknown error")
                        );
                    }
                }
            }
            println!("History recorded in {}", config.ledger_path.display());
        }
        Err(e) => {
            tracing::error!("Automation run failed: {}", e);
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}
