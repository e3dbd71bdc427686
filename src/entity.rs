//! Sensor entity descriptions and states.
//!
//! Pure builders mapping a (target, normalized sample) pair to the
//! attribute-rich data point a host automation platform publishes: a
//! durable unique id, a friendly name, device metadata, and the full
//! attribute set. The host's entity lifecycle itself lives outside this
//! crate; these types are the contract it consumes.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::classify::SeriesClass;
use crate::config::TargetConfig;
use crate::coordinator::Snapshot;
use crate::series::NormalizedSample;

/// Integration domain, used as the unique-id namespace.
pub const DOMAIN: &str = "prometheus_provider";

/// Device metadata shared by all of a target's sensors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub manufacturer: String,
    pub model: Option<String>,
}

/// Identity of one sensor, stable across poll cycles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorDescription {
    /// Durable unique id: domain, device id, sanitized metric name, and
    /// sorted sanitized label pairs.
    pub unique_id: String,

    /// Friendly display name.
    pub name: String,

    /// Device this sensor belongs to.
    pub device: DeviceInfo,

    /// The series key this sensor tracks in the coordinator's map.
    pub metric_key: String,
}

/// Current state of one sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    /// Value as reported by the metrics API, uncoerced.
    pub value: String,

    /// Inferred unit, category, statistic kind, and icon.
    pub class: SeriesClass,

    /// All non-name labels plus the originating metric name, key, and
    /// last-synced timestamp.
    pub attributes: BTreeMap<String, serde_json::Value>,

    /// Whether the sensor should be exposed as available.
    pub available: bool,
}

/// Build the stable description of the sensor for a series.
pub fn describe(target: &TargetConfig, sample: &NormalizedSample) -> SensorDescription {
    let sanitized_name = sanitize(&sample.name);
    let mut unique_id = format!("{}_{}_{}", DOMAIN, target.device.id, sanitized_name);

    // Labels are already sorted in the normalized sample, so the id does
    // not depend on the order the API transmitted them in.
    let label_parts: Vec<String> = sample
        .labels
        .iter()
        .map(|(label, value)| format!("{}_{}", sanitize(label), sanitize(value)))
        .collect();
    if !label_parts.is_empty() {
        unique_id.push('_');
        unique_id.push_str(&label_parts.join("_"));
    }

    let mut name = format!("{} {}", target.device.name, sample.name);
    if !sample.labels.is_empty() {
        let label_desc: Vec<String> = sample
            .labels
            .iter()
            .map(|(label, value)| format!("{}={}", label, value))
            .collect();
        name.push_str(&format!(" ({})", label_desc.join(", ")));
    }

    SensorDescription {
        unique_id,
        name,
        device: DeviceInfo {
            id: target.device.id.clone(),
            name: target.device.name.clone(),
            manufacturer: target.device.manufacturer.clone(),
            model: target.device.model.clone(),
        },
        metric_key: sample.key.clone(),
    }
}

/// Build the state of a sensor from its current sample.
pub fn state(sample: &NormalizedSample, available: bool) -> SensorState {
    let mut attributes: BTreeMap<String, serde_json::Value> = sample
        .labels
        .iter()
        .map(|(label, value)| (label.clone(), serde_json::Value::String(value.clone())))
        .collect();

    attributes.insert(
        "prometheus_metric_name".to_string(),
        serde_json::json!(sample.name),
    );
    attributes.insert(
        "prometheus_metric_key".to_string(),
        serde_json::json!(sample.key),
    );
    attributes.insert(
        "last_synced_timestamp".to_string(),
        serde_json::json!(sample.timestamp),
    );

    SensorState {
        value: sample.value.clone(),
        class: sample.class,
        attributes,
        available,
    }
}

/// Whether the sensor for a key should currently be available: the last
/// cycle must have succeeded and the key must still be present. A series
/// that disappears between cycles goes unavailable rather than silently
/// retaining its last value.
pub fn availability(snapshot: &Snapshot, key: &str) -> bool {
    snapshot.last_update_success && snapshot.data.contains_key(key)
}

/// Replace characters that host platforms reject in ids.
fn sanitize(part: &str) -> String {
    part.replace(['.', '-'], "_")
}
