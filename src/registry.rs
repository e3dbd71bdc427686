//! Registry of configured targets and their running coordinators.

use std::collections::HashMap;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::QueryApi;
use crate::config::{ConfigError, TargetConfig};
use crate::coordinator::{PollCoordinator, Snapshot};

/// A registered target: its configuration, a subscription to its
/// coordinator's state, and the spawned poll task.
pub struct RegisteredTarget {
    pub target: TargetConfig,
    pub updates: watch::Receiver<Snapshot>,
    task: JoinHandle<()>,
}

impl RegisteredTarget {
    /// The current snapshot for this target.
    pub fn snapshot(&self) -> Snapshot {
        self.updates.borrow().clone()
    }
}

impl Drop for RegisteredTarget {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Holds one coordinator per configured target.
///
/// Writes happen only at registration and deregistration; poll cycles never
/// touch the registry. There is no ambient global state: whoever owns the
/// publishing layer owns the registry.
#[derive(Default)]
pub struct TargetRegistry {
    targets: HashMap<String, RegisteredTarget>,
}

impl TargetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a coordinator and start its polling loop.
    ///
    /// Runs the first refresh to completion before spawning the loop, so
    /// the caller can decide whether to expose entities based on the
    /// returned success flag. A failed first refresh still registers the
    /// target; it retries on its normal cadence and is surfaced as
    /// unavailable until it recovers.
    ///
    /// Fails with a validation error on duplicate target names or device
    /// ids; the registry is left unchanged in that case.
    pub async fn register<C>(&mut self, coordinator: PollCoordinator<C>) -> Result<bool, ConfigError>
    where
        C: QueryApi + Send + Sync + 'static,
    {
        let target = coordinator.target().clone();

        if self.targets.contains_key(&target.name) {
            return Err(ConfigError::Validation(format!(
                "Duplicate target name '{}'",
                target.name
            )));
        }

        if self
            .targets
            .values()
            .any(|registered| registered.target.device.id == target.device.id)
        {
            return Err(ConfigError::Validation(format!(
                "Target '{}': duplicate device id '{}'",
                target.name, target.device.id
            )));
        }

        let first_refresh_ok = coordinator.refresh().await;
        let updates = coordinator.subscribe();
        let task = tokio::spawn(coordinator.run());

        self.targets.insert(
            target.name.clone(),
            RegisteredTarget {
                target,
                updates,
                task,
            },
        );

        Ok(first_refresh_ok)
    }

    /// Deregister a target, stopping further poll cycles.
    ///
    /// Any in-flight cycle is dropped with the task; its result would be
    /// discarded anyway.
    pub fn deregister(&mut self, name: &str) -> bool {
        self.targets.remove(name).is_some()
    }

    /// Look up a registered target by name.
    pub fn get(&self, name: &str) -> Option<&RegisteredTarget> {
        self.targets.get(name)
    }

    /// Iterate over registered targets.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RegisteredTarget)> {
        self.targets.iter()
    }

    /// Number of registered targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
