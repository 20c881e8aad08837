//! Best-effort forwarding of reports to a secondary collector.
//!
//! The mirror receives the full observation set, identity fields included,
//! re-encoded as a query string against `{path}/{station}`. A report is sent
//! once; failures are logged and dropped.

use std::time::Duration;

use awp_protocol::ObservationSet;
use reqwest::{header, Client, Url};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// User-Agent sent on every mirrored request.
pub const MIRROR_USER_AGENT: &str = "awp-exporter-mirror/1.0";

pub const DEFAULT_MIRROR_PORT: u16 = 8000;
pub const DEFAULT_MIRROR_HTTPS_PORT: u16 = 443;
pub const DEFAULT_MIRROR_PATH: &str = "/data/report";
pub const DEFAULT_MIRROR_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("invalid mirror url: {0}")]
    InvalidUrl(String),

    #[error("mirror request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mirror returned status {status}")]
    Status { status: u16 },
}

/// Mirror sink settings.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Sink host; `None` or empty disables mirroring
    pub host: Option<String>,
    /// Explicit sink port, if one was given
    pub port: Option<u16>,
    pub path: String,
    pub https: bool,
    pub timeout: Duration,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            path: DEFAULT_MIRROR_PATH.to_string(),
            https: false,
            timeout: DEFAULT_MIRROR_TIMEOUT,
        }
    }
}

impl MirrorConfig {
    pub fn enabled_host(&self) -> Option<&str> {
        self.host.as_deref().filter(|h| !h.is_empty())
    }

    pub fn scheme(&self) -> &'static str {
        if self.https {
            "https"
        } else {
            "http"
        }
    }

    /// Port actually used. HTTPS moves an unset or plain port-80 setting to 443.
    pub fn effective_port(&self) -> u16 {
        match (self.port, self.https) {
            (None, false) => DEFAULT_MIRROR_PORT,
            (None, true) | (Some(80), true) => DEFAULT_MIRROR_HTTPS_PORT,
            (Some(port), _) => port,
        }
    }
}

/// Resolved sink location.
#[derive(Debug, Clone)]
struct MirrorTarget {
    base: Url,
    path: String,
}

/// Forwards reports to the configured sink without blocking the caller.
#[derive(Debug, Clone)]
pub struct MirrorDispatcher {
    client: Client,
    target: Option<MirrorTarget>,
}

impl MirrorDispatcher {
    pub fn new(config: &MirrorConfig) -> Result<Self, MirrorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()?;

        let target = match config.enabled_host() {
            Some(host) => {
                let raw = format!("{}://{}:{}", config.scheme(), host, config.effective_port());
                let base = Url::parse(&raw).map_err(|e| MirrorError::InvalidUrl(format!("{}: {}", raw, e)))?;
                Some(MirrorTarget {
                    base,
                    path: config.path.trim_end_matches('/').to_string(),
                })
            }
            None => None,
        };

        Ok(Self { client, target })
    }

    /// Dispatcher that never forwards anything.
    pub fn disabled() -> Result<Self, MirrorError> {
        Self::new(&MirrorConfig::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Outbound URL for a report, or an error when mirroring is disabled.
    pub fn mirror_url(&self, station: &str, observations: &ObservationSet) -> Result<Url, MirrorError> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| MirrorError::InvalidUrl("mirroring is disabled".to_string()))?;

        // Dot segments cannot be carried in a URL path, even percent-encoded.
        if station == "." || station == ".." {
            return Err(MirrorError::InvalidUrl(format!(
                "station '{}' is not a usable path segment",
                station
            )));
        }

        let mut url = target.base.clone();
        url.set_path(&target.path);
        url.path_segments_mut()
            .map_err(|_| MirrorError::InvalidUrl(format!("{} cannot take a path", target.base)))?
            .pop_if_empty()
            .push(station);
        if !observations.is_empty() {
            url.query_pairs_mut().extend_pairs(observations.iter_all());
        }
        Ok(url)
    }

    /// Send one report to the sink and return the response status.
    pub async fn forward(&self, station: &str, observations: &ObservationSet) -> Result<u16, MirrorError> {
        let url = self.mirror_url(station, observations)?;

        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, MIRROR_USER_AGENT)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(MirrorError::Status { status });
        }
        Ok(status)
    }

    /// Spawn a detached forward. Returns `None` when mirroring is disabled.
    ///
    /// The task's outcome only reaches the logs; callers may drop the handle.
    pub fn dispatch(&self, station: String, observations: ObservationSet) -> Option<JoinHandle<()>> {
        if !self.is_enabled() {
            return None;
        }

        let dispatcher = self.clone();
        Some(tokio::spawn(async move {
            match dispatcher.forward(&station, &observations).await {
                Ok(status) => {
                    debug!(station = %station, status = status, "Mirror request successful");
                }
                Err(e) => {
                    let url = dispatcher
                        .mirror_url(&station, &observations)
                        .map(|u| u.to_string())
                        .unwrap_or_default();
                    warn!(station = %station, url = %url, error = %e, "Mirror request failed");
                }
            }
        }))
    }
}
