//! Per-target polling lifecycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::client::{FetchError, QueryApi, Selector};
use crate::config::TargetConfig;
use crate::filter::SeriesFilter;
use crate::series::NormalizedSample;

/// The current key-to-sample mapping for one target.
pub type SampleMap = HashMap<String, NormalizedSample>;

/// Observable state of one coordinator, replaced wholesale after each cycle.
///
/// A failed cycle keeps `data` from the last successful cycle so consumers
/// can mark themselves unavailable without losing last-known values.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Normalized samples from the last successful cycle.
    pub data: Arc<SampleMap>,

    /// Whether the most recent completed cycle succeeded.
    pub last_update_success: bool,

    /// Cause of the most recent failure, cleared on success.
    pub last_error: Option<String>,

    /// Wall-clock time of the last successful cycle.
    pub last_success_at: Option<DateTime<Utc>>,

    /// Completed cycles since registration (zero while idle).
    pub cycles: u64,
}

impl Snapshot {
    fn idle() -> Self {
        Self {
            data: Arc::new(SampleMap::new()),
            last_update_success: false,
            last_error: None,
            last_success_at: None,
            cycles: 0,
        }
    }
}

/// Owns one target's polling lifecycle.
///
/// Runs fetch, filter, key derivation, and classification on a fixed
/// interval and publishes the resulting [`Snapshot`] to subscribers. Only
/// the coordinator's own cycle mutates its state, and a cycle always runs
/// to completion before the next one starts, so a target is never polled
/// concurrently with itself.
pub struct PollCoordinator<C> {
    target: TargetConfig,
    client: C,
    selector: Selector,
    filter: SeriesFilter,
    interval: Duration,
    state: watch::Sender<Snapshot>,
}

impl<C: QueryApi> PollCoordinator<C> {
    /// Create a coordinator for a target.
    pub fn new(target: TargetConfig, client: C, interval: Duration) -> Self {
        let selector = Selector::from_target(&target);
        let filter = SeriesFilter::from_target(&target);
        let (state, _) = watch::channel(Snapshot::idle());

        Self {
            target,
            client,
            selector,
            filter,
            interval,
            state,
        }
    }

    /// The target this coordinator polls.
    pub fn target(&self) -> &TargetConfig {
        &self.target
    }

    /// The effective poll interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Subscribe to state changes. Each completed cycle publishes a snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    /// Run one poll cycle to completion and publish the outcome.
    ///
    /// Returns whether the cycle succeeded. The first call after
    /// registration lets the caller await a full cycle before deciding
    /// whether to expose any entities at all.
    pub async fn refresh(&self) -> bool {
        match self.poll_once().await {
            Ok(map) => {
                tracing::debug!(
                    target = %self.target.name,
                    series = map.len(),
                    "Poll cycle succeeded"
                );
                self.state.send_modify(|snapshot| {
                    snapshot.data = Arc::new(map);
                    snapshot.last_update_success = true;
                    snapshot.last_error = None;
                    snapshot.last_success_at = Some(Utc::now());
                    snapshot.cycles += 1;
                });
                true
            }
            Err(e) => {
                tracing::warn!(
                    target = %self.target.name,
                    error = %e,
                    "Poll cycle failed; keeping previous data"
                );
                self.state.send_modify(|snapshot| {
                    snapshot.last_update_success = false;
                    snapshot.last_error = Some(e.to_string());
                    snapshot.cycles += 1;
                });
                false
            }
        }
    }

    /// Fetch, filter, and normalize one cycle's samples.
    async fn poll_once(&self) -> Result<SampleMap, FetchError> {
        let raw = self.client.fetch(&self.selector).await?;
        let kept = self.filter.retain(raw);

        let mut map = SampleMap::with_capacity(kept.len());
        for sample in &kept {
            if let Some(normalized) = NormalizedSample::from_raw(sample) {
                map.insert(normalized.key.clone(), normalized);
            }
        }

        Ok(map)
    }

    /// Run the polling loop on the configured interval.
    ///
    /// The first tick is skipped: registration already ran the first
    /// refresh. A persistently failing target retries at the same cadence
    /// indefinitely; there is no backoff beyond the fixed interval.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        tracing::info!(
            target = %self.target.name,
            interval_secs = self.interval.as_secs(),
            "Starting poller"
        );

        loop {
            ticker.tick().await;
            self.refresh().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::RawSample;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Query API returning a scripted sequence of responses; repeats the
    /// last one once the script runs out.
    struct ScriptedClient {
        script: Mutex<VecDeque<Result<Vec<RawSample>, String>>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<Vec<RawSample>, String>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    impl QueryApi for ScriptedClient {
        async fn fetch(&self, _selector: &Selector) -> Result<Vec<RawSample>, FetchError> {
            let mut script = self.script.lock().unwrap();
            let next = if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            };
            next.map_err(FetchError::Api)
        }
    }

    fn sample(name: &str, labels: &[(&str, &str)], value: &str) -> RawSample {
        let mut metric: HashMap<String, String> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        metric.insert("__name__".to_string(), name.to_string());
        RawSample {
            metric,
            value: (1700000000.0, value.to_string()),
        }
    }

    fn target() -> TargetConfig {
        json5::from_str(
            r#"{
                name: "homelab",
                job: "node",
                instance_label: "instance",
                instance_value: "server01:9100",
                device: { id: "server01", name: "Server 01" }
            }"#,
        )
        .unwrap()
    }

    fn coordinator(
        script: Vec<Result<Vec<RawSample>, String>>,
    ) -> PollCoordinator<ScriptedClient> {
        PollCoordinator::new(
            target(),
            ScriptedClient::new(script),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_idle_before_first_refresh() {
        let coordinator = coordinator(vec![Ok(vec![])]);
        let snapshot = coordinator.snapshot();

        assert_eq!(snapshot.cycles, 0);
        assert!(!snapshot.last_update_success);
        assert!(snapshot.data.is_empty());
    }

    #[tokio::test]
    async fn test_successful_cycle_builds_map() {
        let coordinator = coordinator(vec![Ok(vec![
            sample("node_load1", &[], "0.42"),
            sample("node_cpu_seconds_total", &[("cpu", "0"), ("mode", "idle")], "12345"),
        ])]);

        assert!(coordinator.refresh().await);

        let snapshot = coordinator.snapshot();
        assert!(snapshot.last_update_success);
        assert_eq!(snapshot.cycles, 1);
        assert!(snapshot.last_error.is_none());
        assert!(snapshot.last_success_at.is_some());
        assert_eq!(snapshot.data.len(), 2);
        assert!(snapshot.data.contains_key("node_load1"));
        assert!(
            snapshot
                .data
                .contains_key("node_cpu_seconds_total_cpu_0_mode_idle")
        );
    }

    #[tokio::test]
    async fn test_empty_result_is_an_empty_map() {
        let coordinator = coordinator(vec![Ok(vec![])]);
        assert!(coordinator.refresh().await);

        let snapshot = coordinator.snapshot();
        assert!(snapshot.last_update_success);
        assert!(snapshot.data.is_empty());
    }

    #[tokio::test]
    async fn test_failure_preserves_previous_data() {
        let coordinator = coordinator(vec![
            Ok(vec![sample("node_load1", &[], "0.10")]),
            Ok(vec![sample("node_load1", &[], "0.20")]),
            Err("connection refused".to_string()),
        ]);

        assert!(coordinator.refresh().await);
        assert!(coordinator.refresh().await);

        // Third, fourth, and fifth cycles all fail; data stays at the
        // second cycle's result throughout.
        for _ in 0..3 {
            assert!(!coordinator.refresh().await);
        }

        let snapshot = coordinator.snapshot();
        assert!(!snapshot.last_update_success);
        assert_eq!(snapshot.cycles, 5);
        assert_eq!(snapshot.data["node_load1"].value, "0.20");
        assert_eq!(
            snapshot.last_error.as_deref(),
            Some("Prometheus API error: connection refused")
        );
    }

    #[tokio::test]
    async fn test_recovery_after_failure() {
        let coordinator = coordinator(vec![
            Err("boom".to_string()),
            Ok(vec![sample("up", &[], "1")]),
        ]);

        assert!(!coordinator.refresh().await);
        assert!(coordinator.snapshot().data.is_empty());

        assert!(coordinator.refresh().await);
        let snapshot = coordinator.snapshot();
        assert!(snapshot.last_update_success);
        assert!(snapshot.last_error.is_none());
        assert_eq!(snapshot.data["up"].value, "1");
    }

    #[tokio::test]
    async fn test_disappeared_series_leaves_map() {
        let coordinator = coordinator(vec![
            Ok(vec![
                sample("node_load1", &[], "0.10"),
                sample("node_load5", &[], "0.15"),
            ]),
            Ok(vec![sample("node_load1", &[], "0.12")]),
        ]);

        coordinator.refresh().await;
        assert_eq!(coordinator.snapshot().data.len(), 2);

        // The map is replaced wholesale on success: a series missing from
        // the new cycle is gone from the new map.
        coordinator.refresh().await;
        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.data.len(), 1);
        assert!(!snapshot.data.contains_key("node_load5"));
    }

    #[tokio::test]
    async fn test_subscribers_notified_per_cycle() {
        let coordinator = coordinator(vec![
            Ok(vec![sample("up", &[], "1")]),
            Err("down".to_string()),
        ]);
        let mut updates = coordinator.subscribe();

        coordinator.refresh().await;
        assert!(updates.changed().await.is_ok());
        assert!(updates.borrow_and_update().last_update_success);

        // Failed cycles notify too, so consumers can mark themselves
        // unavailable.
        coordinator.refresh().await;
        assert!(updates.changed().await.is_ok());
        let snapshot = updates.borrow_and_update().clone();
        assert!(!snapshot.last_update_success);
        assert_eq!(snapshot.data["up"].value, "1");
    }

    #[tokio::test]
    async fn test_filter_applied_in_pipeline() {
        let target: TargetConfig = json5::from_str(
            r#"{
                name: "homelab",
                job: "node",
                instance_label: "instance",
                instance_value: "server01:9100",
                device: { id: "server01", name: "Server 01" },
                included_metrics: ["up"]
            }"#,
        )
        .unwrap();

        let coordinator = PollCoordinator::new(
            target,
            ScriptedClient::new(vec![Ok(vec![
                sample("up", &[], "1"),
                sample("down", &[], "0"),
            ])]),
            Duration::from_secs(60),
        );

        coordinator.refresh().await;
        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.data.len(), 1);
        assert!(snapshot.data.contains_key("up"));
    }
}
