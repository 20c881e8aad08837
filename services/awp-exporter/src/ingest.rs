//! Registry updates for a decoded report.

use awp_protocol::{is_ignored_field, ObservationSet};
use tracing::debug;

use crate::registry::MetricRegistry;

/// What happened to each field of one report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Fields written to a gauge
    pub recorded: usize,
    /// Identity/metadata fields
    pub ignored: usize,
    /// Fields with a non-numeric value or an unusable metric name
    pub skipped: usize,
}

/// Write the first value of every sensor field to its station gauge.
pub fn ingest_observations(
    registry: &MetricRegistry,
    station: &str,
    observations: &ObservationSet,
) -> IngestSummary {
    let mut summary = IngestSummary::default();

    for (field, value) in observations.iter_first() {
        if is_ignored_field(field) {
            summary.ignored += 1;
            continue;
        }

        match value.parse::<f64>() {
            Ok(reading) => match registry.get_or_create(field) {
                Some(gauge) => {
                    gauge.set(station, reading);
                    summary.recorded += 1;
                }
                None => summary.skipped += 1,
            },
            Err(e) => {
                debug!(station = %station, field = %field, value = %value, error = %e, "Skipping non-numeric value");
                summary.skipped += 1;
            }
        }
    }

    summary
}
