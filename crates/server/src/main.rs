//! Binary entry point: load configuration, initialize logging, and run
//! the server from [`server::spawn`] until Ctrl-C (spec §6 exit codes:
//! `0` clean stop, `1` uncaught error, `2` invalid configuration).

use clap::Parser;
use server::config::{self, Args};
use std::process::ExitCode;
use tokio::signal;

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e:#}");
            return ExitCode::from(2);
        }
    };

    init_logging(&config.log_level);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start async runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("server error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn run(config: common::Config) -> anyhow::Result<()> {
    let handle = server::spawn(config).await?;
    tracing::info!(addr = %handle.addr, "press Ctrl-C to shut down");
    signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, stopping");
    handle.shutdown().await;
    Ok(())
}
