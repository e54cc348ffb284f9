//! sdrsync binary: resolve configuration, set up logging and the interrupt
//! handler, then run the sync engine until cancelled.

use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sdrsync::{Config, SyncEngine};

fn init_logging(log_level: &str) {
    // RUST_LOG wins; otherwise the LOG_LEVEL config key applies globally
    let filter = if let Ok(directives) = std::env::var("RUST_LOG") {
        directives
    } else {
        log_level.to_lowercase()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log_level);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, exiting...");
                cancel.cancel();
            }
        });
    }

    SyncEngine::new(config, cancel).run().await;
    ExitCode::SUCCESS
}
