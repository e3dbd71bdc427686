//! Metric-name filtering.

use crate::config::TargetConfig;
use crate::series::RawSample;

/// Narrows the dynamically-discovered series set down to a target's
/// configured subset.
///
/// A sample is retained iff it has a non-empty metric name, the name starts
/// with the configured prefix (if any), the name is a member of the
/// include-list (if one is set and non-empty), and the name is not a member
/// of the exclude-list. The predicates are independent and all must pass.
#[derive(Debug, Clone, Default)]
pub struct SeriesFilter {
    prefix: Option<String>,
    include: Option<Vec<String>>,
    exclude: Vec<String>,
}

impl SeriesFilter {
    /// Create a filter from its three predicates.
    pub fn new(
        prefix: Option<String>,
        include: Option<Vec<String>>,
        exclude: Vec<String>,
    ) -> Self {
        Self {
            prefix,
            include,
            exclude,
        }
    }

    /// Build the filter for a target's configuration.
    pub fn from_target(target: &TargetConfig) -> Self {
        Self::new(
            target.metrics_prefix.clone(),
            target.included_metrics.clone(),
            target.excluded_metrics.clone(),
        )
    }

    /// Whether a metric name passes all three predicates.
    ///
    /// An empty include-list means "no inclusion restriction", not
    /// "exclude everything".
    pub fn matches(&self, name: &str) -> bool {
        if let Some(prefix) = &self.prefix {
            if !name.starts_with(prefix.as_str()) {
                return false;
            }
        }

        if let Some(include) = &self.include {
            if !include.is_empty() && !include.iter().any(|included| included == name) {
                return false;
            }
        }

        !self.exclude.iter().any(|excluded| excluded == name)
    }

    /// Retain the matching subset of a raw sample list, preserving order.
    ///
    /// Samples without a metric name are dropped.
    pub fn retain(&self, samples: Vec<RawSample>) -> Vec<RawSample> {
        samples
            .into_iter()
            .filter(|sample| sample.name().is_some_and(|name| self.matches(name)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample(name: &str) -> RawSample {
        let mut metric = HashMap::new();
        if !name.is_empty() {
            metric.insert("__name__".to_string(), name.to_string());
        }
        RawSample {
            metric,
            value: (1700000000.0, "1".to_string()),
        }
    }

    fn names(samples: &[RawSample]) -> Vec<&str> {
        samples.iter().filter_map(|s| s.name()).collect()
    }

    #[test]
    fn test_no_filters_keeps_everything_named() {
        let filter = SeriesFilter::default();
        let kept = filter.retain(vec![sample("up"), sample(""), sample("down")]);
        assert_eq!(names(&kept), vec!["up", "down"]);
    }

    #[test]
    fn test_include_list() {
        let filter = SeriesFilter::new(None, Some(vec!["up".to_string()]), Vec::new());
        let kept = filter.retain(vec![sample("up"), sample("down")]);
        assert_eq!(names(&kept), vec!["up"]);
    }

    #[test]
    fn test_empty_include_list_is_no_restriction() {
        // Easy off-by-one in intent: an empty include-list must not
        // suppress all samples.
        let filter = SeriesFilter::new(None, Some(Vec::new()), Vec::new());
        let kept = filter.retain(vec![sample("up"), sample("down")]);
        assert_eq!(names(&kept), vec!["up", "down"]);
    }

    #[test]
    fn test_prefix_and_exclude() {
        let filter = SeriesFilter::new(
            Some("node_".to_string()),
            None,
            vec!["node_internal".to_string()],
        );
        let kept = filter.retain(vec![
            sample("node_cpu"),
            sample("node_internal"),
            sample("other_metric"),
        ]);
        assert_eq!(names(&kept), vec!["node_cpu"]);
    }

    #[test]
    fn test_all_predicates_are_anded() {
        let filter = SeriesFilter::new(
            Some("node_".to_string()),
            Some(vec!["node_load1".to_string(), "node_load5".to_string()]),
            vec!["node_load5".to_string()],
        );

        assert!(filter.matches("node_load1"));
        assert!(!filter.matches("node_load5")); // excluded
        assert!(!filter.matches("node_load15")); // not included
        assert!(!filter.matches("load1")); // wrong prefix
    }

    #[test]
    fn test_retain_preserves_order_and_fabricates_nothing() {
        let input = vec![
            sample("node_a"),
            sample("skip_me"),
            sample("node_b"),
            sample("node_c"),
        ];
        let filter = SeriesFilter::new(Some("node_".to_string()), None, Vec::new());
        let kept = filter.retain(input.clone());

        assert_eq!(names(&kept), vec!["node_a", "node_b", "node_c"]);
        for retained in &kept {
            assert!(input.contains(retained));
        }
    }
}
