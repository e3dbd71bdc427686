//! Heuristic classification of metric names.
//!
//! Infers display unit, semantic category, statistic kind, and an icon hint
//! from the lexical conventions of Prometheus metric names. This is
//! best-effort: a wrong guess degrades display quality but never
//! correctness, and labels are deliberately not consulted.

use serde::{Deserialize, Serialize};

/// Display unit of measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Bytes,
    Seconds,
    Celsius,
    Fahrenheit,
    Percent,
    Volts,
    Amperes,
    KilowattHours,
    Watts,
}

impl Unit {
    /// The display string for this unit.
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Bytes => "bytes",
            Unit::Seconds => "s",
            Unit::Celsius => "°C",
            Unit::Fahrenheit => "°F",
            Unit::Percent => "%",
            Unit::Volts => "V",
            Unit::Amperes => "A",
            Unit::KilowattHours => "kWh",
            Unit::Watts => "W",
        }
    }
}

/// Semantic category of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    DataSize,
    Duration,
    Temperature,
    RelativeFraction,
    Voltage,
    Current,
    Energy,
    Power,
}

/// Whether a series accumulates or measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticKind {
    /// Monotonically non-decreasing accumulator, reset only on restart.
    Counter,
    /// Point-in-time value that can rise or fall freely.
    Gauge,
}

/// Icon hint for metrics without a recognized unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Icon {
    Cpu,
    Memory,
    Disk,
    Network,
    Process,
    Generic,
}

impl Icon {
    /// The Material Design icon identifier for this hint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Icon::Cpu => "mdi:cpu-64-bit",
            Icon::Memory => "mdi:memory",
            Icon::Disk => "mdi:harddisk",
            Icon::Network => "mdi:network-outline",
            Icon::Process => "mdi:cogs",
            Icon::Generic => "mdi:chart-line",
        }
    }
}

/// Inferred display semantics for a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesClass {
    /// Display unit, if one was recognized.
    pub unit: Option<Unit>,

    /// Semantic category, if one was recognized.
    pub category: Option<Category>,

    /// Counter vs. gauge.
    pub statistic_kind: StatisticKind,

    /// Icon hint, set only when no unit was recognized.
    pub icon: Option<Icon>,
}

/// Unit rules, evaluated in order; the first rule whose substring matches wins.
const UNIT_RULES: &[(&[&str], Unit, Category)] = &[
    (&["_bytes"], Unit::Bytes, Category::DataSize),
    (&["_seconds"], Unit::Seconds, Category::Duration),
    (
        &["_celsius", "temperature_celsius"],
        Unit::Celsius,
        Category::Temperature,
    ),
    (
        &["_fahrenheit", "temperature_fahrenheit"],
        Unit::Fahrenheit,
        Category::Temperature,
    ),
    (
        &["_percent", "_ratio"],
        Unit::Percent,
        Category::RelativeFraction,
    ),
    (&["voltage"], Unit::Volts, Category::Voltage),
    (&["current", "amperes"], Unit::Amperes, Category::Current),
    (
        &["energy_kwh", "_kwh"],
        Unit::KilowattHours,
        Category::Energy,
    ),
    (&["power_watts", "_watts"], Unit::Watts, Category::Power),
];

/// Icon rules for names without a recognized unit, first match wins.
const ICON_RULES: &[(&str, Icon)] = &[
    ("cpu", Icon::Cpu),
    ("memory", Icon::Memory),
    ("disk", Icon::Disk),
    ("network", Icon::Network),
    ("process", Icon::Process),
];

/// Classify a metric name.
///
/// Pure function over the name string only; calling it twice with the same
/// name yields identical results.
pub fn classify(name: &str) -> SeriesClass {
    let unit_match = UNIT_RULES
        .iter()
        .find(|(patterns, _, _)| patterns.iter().any(|pattern| name.contains(pattern)));

    let (unit, category, icon) = match unit_match {
        Some((_, unit, category)) => (Some(*unit), Some(*category), None),
        None => {
            let icon = ICON_RULES
                .iter()
                .find(|(pattern, _)| name.contains(pattern))
                .map(|(_, icon)| *icon)
                .unwrap_or(Icon::Generic);
            (None, None, Some(icon))
        }
    };

    let statistic_kind = if name.contains("_total") || name.ends_with("_count") {
        StatisticKind::Counter
    } else {
        StatisticKind::Gauge
    };

    SeriesClass {
        unit,
        category,
        statistic_kind,
        icon,
    }
}
