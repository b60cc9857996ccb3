//! Command-line and file configuration for the code server.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::Config;

/// CLI arguments for the code server.
#[derive(Parser, Debug)]
#[command(about = "Issues short unique codes over HTTP")]
pub struct CliArgs {
    /// Path to config file (TOML). Defaults are used when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port to listen on.
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Seconds to wait for in-flight requests after a shutdown signal.
    #[arg(long, default_value_t = 10)]
    pub shutdown_timeout_secs: u64,
}

impl CliArgs {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Load the code store configuration from file or use defaults.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                let config: Config = toml::from_str(&contents)?;
                Ok(config)
            }
            None => Ok(Config::default()),
        }
    }

    /// Builds the server configuration.
    pub fn server_config(&self) -> CodeServerConfig {
        CodeServerConfig {
            port: self.port,
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout_secs),
        }
    }
}

/// Configuration for the HTTP server itself.
#[derive(Debug, Clone)]
pub struct CodeServerConfig {
    pub port: u16,
    /// How long shutdown waits for in-flight requests before dropping them.
    pub shutdown_timeout: Duration,
}
