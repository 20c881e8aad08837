//! Dynamic gauge registry for AWP sensor fields.
//!
//! Every distinct field name seen in a report becomes one gauge family,
//! `awp_<field>{station="<id>"}`. Families are created lazily and never
//! removed. The registry owns its own Prometheus recorder instead of
//! installing a global one, so `/metrics` lists only station readings.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use metrics::{Key, KeyName, Label, Level, Metadata, Recorder, SharedString};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use tracing::debug;

/// Prefix applied to every field-derived metric name.
pub const METRIC_PREFIX: &str = "awp_";

/// Label carrying the station identifier.
pub const STATION_LABEL: &str = "station";

/// Handle to one field's per-station gauge family.
#[derive(Clone)]
pub struct FieldGauge {
    name: String,
    recorder: Arc<PrometheusRecorder>,
}

impl FieldGauge {
    /// Full metric name, e.g. `awp_tempf`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the current value for `station`. Last write wins.
    pub fn set(&self, station: &str, value: f64) {
        let key = Key::from_parts(
            self.name.clone(),
            vec![Label::new(STATION_LABEL, station.to_string())],
        );
        let metadata = Metadata::new(module_path!(), Level::INFO, Some(module_path!()));
        self.recorder.register_gauge(&key, &metadata).set(value);
    }
}

impl std::fmt::Debug for FieldGauge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldGauge").field("name", &self.name).finish()
    }
}

/// Field name to gauge family mapping.
pub struct MetricRegistry {
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
    gauges: Mutex<HashMap<String, FieldGauge>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        Self {
            recorder: Arc::new(recorder),
            handle,
            gauges: Mutex::new(HashMap::new()),
        }
    }

    /// Existing gauge family for `field`, or a newly described one.
    ///
    /// Lookup, description and insertion share one critical section so a
    /// field is registered exactly once under concurrent first sightings.
    /// Returns `None` when `awp_<field>` is not a valid Prometheus metric
    /// name; the exposed name always equals the registry key.
    pub fn get_or_create(&self, field: &str) -> Option<FieldGauge> {
        if !is_valid_field_name(field) {
            debug!(field = %field, "Skipping field with invalid metric name");
            return None;
        }

        let mut gauges = self.gauges.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(gauge) = gauges.get(field) {
            return Some(gauge.clone());
        }

        let name = metric_name(field);
        self.recorder.describe_gauge(
            KeyName::from(name.clone()),
            None,
            SharedString::from(format!("AWP sensor value for {}", field)),
        );

        let gauge = FieldGauge {
            name,
            recorder: self.recorder.clone(),
        };
        gauges.insert(field.to_string(), gauge.clone());

        debug!(metric = %gauge.name, "Created gauge");
        Some(gauge)
    }

    /// Number of registered field families.
    pub fn len(&self) -> usize {
        self.gauges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered field names, sorted.
    pub fn fields(&self) -> Vec<String> {
        let gauges = self.gauges.lock().unwrap_or_else(PoisonError::into_inner);
        let mut fields: Vec<String> = gauges.keys().cloned().collect();
        fields.sort();
        fields
    }

    /// Prometheus text exposition of every registered gauge.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Metric name for a sensor field. Field casing is kept as received.
pub fn metric_name(field: &str) -> String {
    format!("{}{}", METRIC_PREFIX, field)
}

/// Whether `awp_<field>` is a Prometheus metric name the exporter renders
/// unchanged. Colons are left out since they are reserved for recording rules.
pub fn is_valid_field_name(field: &str) -> bool {
    !field.is_empty()
        && field
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_returns_same_family() {
        let registry = MetricRegistry::new();
        let first = registry.get_or_create("tempf").unwrap();
        let second = registry.get_or_create("tempf").unwrap();

        assert_eq!(first.name(), "awp_tempf");
        assert_eq!(second.name(), "awp_tempf");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_set_renders_station_label() {
        let registry = MetricRegistry::new();
        registry.get_or_create("tempf").unwrap().set("BACKYARD", 72.5);

        let output = registry.render();
        assert!(output.contains("# HELP awp_tempf AWP sensor value for tempf"));
        assert!(output.contains("# TYPE awp_tempf gauge"));
        assert!(output.contains("awp_tempf{station=\"BACKYARD\"} 72.5"));
    }

    #[test]
    fn test_later_value_overwrites() {
        let registry = MetricRegistry::new();
        registry.get_or_create("tempf").unwrap().set("S1", 70.5);
        registry.get_or_create("tempf").unwrap().set("S1", 71.25);

        let output = registry.render();
        assert!(output.contains("awp_tempf{station=\"S1\"} 71.25"));
        assert!(!output.contains("70.5"));
    }

    #[test]
    fn test_stations_are_independent() {
        let registry = MetricRegistry::new();
        let gauge = registry.get_or_create("humidity").unwrap();
        gauge.set("north", 40.5);
        gauge.set("south", 55.5);

        let output = registry.render();
        assert!(output.contains("awp_humidity{station=\"north\"} 40.5"));
        assert!(output.contains("awp_humidity{station=\"south\"} 55.5"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_field_casing_is_preserved() {
        let registry = MetricRegistry::new();
        registry.get_or_create("UV");
        registry.get_or_create("uv");

        assert_eq!(registry.fields(), vec!["UV".to_string(), "uv".to_string()]);
    }

    #[test]
    fn test_concurrent_first_sighting_registers_once() {
        let registry = MetricRegistry::new();

        std::thread::scope(|scope| {
            for i in 0..16 {
                let registry = &registry;
                scope.spawn(move || {
                    registry
                        .get_or_create("solarradiation")
                        .unwrap()
                        .set(&format!("station-{}", i), 150.5);
                });
            }
        });

        assert_eq!(registry.len(), 1);
        let output = registry.render();
        assert_eq!(output.matches("# TYPE awp_solarradiation gauge").count(), 1);
        assert_eq!(output.matches("awp_solarradiation{").count(), 16);
    }

    #[test]
    fn test_invalid_metric_names_are_rejected() {
        let registry = MetricRegistry::new();

        assert!(registry.get_or_create("temp-f").is_none());
        assert!(registry.get_or_create("rain.in").is_none());
        assert!(registry.get_or_create("t\u{e9}mp").is_none());
        assert!(registry.get_or_create("").is_none());
        registry.get_or_create("temp_f").unwrap().set("S", 2.5);

        assert_eq!(registry.fields(), vec!["temp_f".to_string()]);
        let output = registry.render();
        assert!(output.contains("# HELP awp_temp_f AWP sensor value for temp_f"));
        assert!(output.contains("awp_temp_f{station=\"S\"} 2.5"));
    }

    #[test]
    fn test_field_name_validation() {
        assert!(is_valid_field_name("tempf"));
        assert!(is_valid_field_name("UV"));
        assert!(is_valid_field_name("soilmoisture1"));
        assert!(is_valid_field_name("wh65_batt"));
        assert!(!is_valid_field_name("temp-f"));
        assert!(!is_valid_field_name("a:b"));
        assert!(!is_valid_field_name("temp f"));
    }

    #[test]
    fn test_registries_do_not_share_state() {
        let a = MetricRegistry::new();
        let b = MetricRegistry::new();
        a.get_or_create("tempf").unwrap().set("S", 1.5);

        assert!(b.is_empty());
        assert!(!b.render().contains("awp_tempf"));
    }
}
