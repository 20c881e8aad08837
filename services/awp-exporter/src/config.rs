//! Command-line and environment configuration.

use std::time::Duration;

use clap::Parser;

use crate::mirror::{MirrorConfig, DEFAULT_MIRROR_PATH};

#[derive(Parser, Debug, Clone)]
#[command(name = "awp-exporter")]
#[command(about = "Prometheus exporter for AWP weather-station reports")]
pub struct Args {
    /// Port to listen on
    #[arg(long, env = "AWP_PORT", default_value = "6255")]
    pub port: u16,

    /// Enable verbose (debug) logging
    #[arg(short, long, env = "AWP_VERBOSE")]
    pub verbose: bool,

    /// Host to mirror reports to (mirroring is enabled when set)
    #[arg(long, env = "AWP_MIRROR_HOST")]
    pub mirror_host: Option<String>,

    /// Mirror port [default: 8000, or 443 with --mirror-https]
    #[arg(long, env = "AWP_MIRROR_PORT")]
    pub mirror_port: Option<u16>,

    /// Path prefix for mirrored reports; the station is appended
    #[arg(long, env = "AWP_MIRROR_PATH", default_value = DEFAULT_MIRROR_PATH)]
    pub mirror_path: String,

    /// Use HTTPS for mirrored reports
    #[arg(long, env = "AWP_MIRROR_HTTPS")]
    pub mirror_https: bool,

    /// Timeout for a mirrored report, in seconds
    #[arg(long, env = "AWP_MIRROR_TIMEOUT_SECS", default_value = "10")]
    pub mirror_timeout_secs: u64,
}

impl Args {
    pub fn mirror_config(&self) -> MirrorConfig {
        MirrorConfig {
            host: self.mirror_host.clone(),
            port: self.mirror_port,
            path: self.mirror_path.clone(),
            https: self.mirror_https,
            timeout: Duration::from_secs(self.mirror_timeout_secs),
        }
    }
}
