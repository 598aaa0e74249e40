//! CLI argument parsing and config-file loading (spec §6 "Configuration
//! inputs", exit code `2` for invalid configuration).

use anyhow::{Context, Result, bail};
use clap::Parser;
use common::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sawit-server", about = "TCP front-end for a single-file relational database")]
pub struct Args {
    /// Path to a TOML or JSON config file; CLI flags below override its fields.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    #[arg(long = "max-connections")]
    pub max_connections: Option<usize>,

    #[arg(long = "query-timeout-ms")]
    pub query_timeout_ms: Option<u64>,

    #[arg(long = "log-level")]
    pub log_level: Option<String>,

    #[arg(long = "worker-count")]
    pub worker_count: Option<usize>,

    #[arg(long = "buffer-pool-pages")]
    pub buffer_pool_pages: Option<usize>,

    /// Disable the write-ahead log entirely (overrides the config file).
    #[arg(long = "no-wal")]
    pub no_wal: bool,
}

/// Build the effective [`Config`]: defaults, overlaid by `--config`'s
/// file (if any), overlaid by explicit CLI flags.
pub fn load(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };

    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(n) = args.max_connections {
        config.max_connections = n;
    }
    if let Some(ms) = args.query_timeout_ms {
        config.query_timeout_ms = ms;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    if let Some(n) = args.worker_count {
        config.worker_count = Some(n);
    }
    if let Some(n) = args.buffer_pool_pages {
        config.buffer_pool_pages = n;
    }
    if args.no_wal {
        config.wal.enabled = false;
    }

    validate(&config)?;
    Ok(config)
}

fn read_config_file(path: &PathBuf) -> Result<Config> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&text).with_context(|| format!("parsing {} as JSON", path.display())),
        _ => toml::from_str(&text).with_context(|| format!("parsing {} as TOML", path.display())),
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.port == 0 {
        bail!("port must be nonzero");
    }
    if config.max_connections == 0 {
        bail!("maxConnections must be nonzero");
    }
    if config.query_timeout_ms == 0 {
        bail!("queryTimeoutMs must be nonzero");
    }
    if config.wal.checkpoint_interval == 0 {
        bail!("wal.checkpointInterval must be nonzero");
    }
    if !matches!(config.log_level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        bail!("logLevel must be one of trace|debug|info|warn|error, got '{}'", config.log_level);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_win_over_defaults() {
        let args = Args {
            config: None,
            host: Some("0.0.0.0".to_string()),
            port: Some(9999),
            data_dir: None,
            max_connections: None,
            query_timeout_ms: None,
            log_level: None,
            worker_count: Some(4),
            buffer_pool_pages: None,
            no_wal: true,
        };
        let config = load(&args).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9999);
        assert_eq!(config.worker_count, Some(4));
        assert!(!config.wal.enabled);
    }

    #[test]
    fn rejects_zero_port() {
        let args = Args {
            config: None,
            host: None,
            port: Some(0),
            data_dir: None,
            max_connections: None,
            query_timeout_ms: None,
            log_level: None,
            worker_count: None,
            buffer_pool_pages: None,
            no_wal: false,
        };
        assert!(load(&args).is_err());
    }
}
