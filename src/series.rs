//! Sample model and stable series identity.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::classify::{SeriesClass, classify};

/// Reserved label under which Prometheus reports the metric name.
pub const NAME_LABEL: &str = "__name__";

/// A raw sample as returned by the instant-query API.
///
/// `metric` carries the metric name under [`NAME_LABEL`] alongside the
/// series labels; `value` is `[timestamp, value_string]` with the timestamp
/// in (possibly fractional) seconds since epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub metric: HashMap<String, String>,
    pub value: (f64, String),
}

impl RawSample {
    /// The metric name, if present and non-empty.
    pub fn name(&self) -> Option<&str> {
        self.metric
            .get(NAME_LABEL)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }
}

/// A series' latest value plus derived key and classification, held by a
/// coordinator between polls.
///
/// The value is kept as the original string: downstream consumers may want
/// the exact textual representation, so no numeric coercion happens here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSample {
    /// Metric name (the reserved name label stripped out of `labels`).
    pub name: String,

    /// Series labels, excluding the metric name.
    pub labels: BTreeMap<String, String>,

    /// Sample value as reported by the API.
    pub value: String,

    /// Sample timestamp in seconds since epoch.
    pub timestamp: f64,

    /// Stable, order-independent series identity.
    pub key: String,

    /// Inferred display semantics.
    pub class: SeriesClass,
}

impl NormalizedSample {
    /// Build a normalized sample from a raw one.
    ///
    /// Returns `None` for samples without a metric name.
    pub fn from_raw(raw: &RawSample) -> Option<Self> {
        let name = raw.name()?.to_string();
        let key = derive_key(&name, &raw.metric);

        let labels: BTreeMap<String, String> = raw
            .metric
            .iter()
            .filter(|(label, _)| label.as_str() != NAME_LABEL)
            .map(|(label, value)| (label.clone(), value.clone()))
            .collect();

        Some(Self {
            class: classify(&name),
            name,
            labels,
            value: raw.value.1.clone(),
            timestamp: raw.value.0,
            key,
        })
    }
}

/// Derive a stable key for a series from its metric name and label mapping.
///
/// The reserved name label is removed, the remaining entries are sorted by
/// label name, each is rendered as `name_value`, and the pairs are joined
/// with underscores behind the metric name. Sorting makes the key
/// independent of the order in which the API transmitted the labels.
///
/// Known limitation: a label value that itself contains an underscore can
/// collide with a differently-split label set; label values are not escaped.
pub fn derive_key(name: &str, labels: &HashMap<String, String>) -> String {
    let mut pairs: Vec<(&str, &str)> = labels
        .iter()
        .filter(|(label, _)| label.as_str() != NAME_LABEL)
        .map(|(label, value)| (label.as_str(), value.as_str()))
        .collect();
    pairs.sort();

    if pairs.is_empty() {
        return name.to_string();
    }

    let joined: Vec<String> = pairs
        .iter()
        .map(|(label, value)| format!("{}_{}", label, value))
        .collect();

    format!("{}_{}", name, joined.join("_"))
}
