//! Application state shared by all handlers.

use anyhow::{Context, Result};

use crate::mirror::{MirrorConfig, MirrorDispatcher};
use crate::registry::MetricRegistry;

/// Shared application state.
pub struct AppState {
    pub registry: MetricRegistry,
    pub mirror: MirrorDispatcher,
}

impl AppState {
    pub fn new(mirror: &MirrorConfig) -> Result<Self> {
        let mirror = MirrorDispatcher::new(mirror).context("Failed to create mirror client")?;

        Ok(Self {
            registry: MetricRegistry::new(),
            mirror,
        })
    }
}
