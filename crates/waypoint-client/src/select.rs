//! Healthy-endpoint selection.

use crate::config::{Endpoint, SelectionPolicy};
use crate::health::HealthySnapshot;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// How often an empty snapshot is re-checked while waiting for health data.
const POLL_CADENCE: Duration = Duration::from_millis(100);

/// Picks one endpoint per call from the monitor's published snapshot.
///
/// Selection never fails and never blocks past its wait budget: when no
/// healthy endpoint appears in time it degrades to a best-effort choice over
/// the full configured set, with a warning. That contract is visible in the
/// signatures — both variants return an `Endpoint`, not a `Result`.
pub(crate) struct EndpointSelector {
    configured: Arc<[Endpoint]>,
    snapshot_rx: watch::Receiver<HealthySnapshot>,
    policy: SelectionPolicy,
}

impl EndpointSelector {
    /// `configured` is validated non-empty at client construction.
    pub(crate) fn new(
        configured: Arc<[Endpoint]>,
        snapshot_rx: watch::Receiver<HealthySnapshot>,
        policy: SelectionPolicy,
    ) -> Self {
        Self { configured, snapshot_rx, policy }
    }

    /// Async variant: cooperative suspension while polling the snapshot.
    pub(crate) async fn select(&self, max_wait: Duration) -> Endpoint {
        if let Some(endpoint) = self.try_now() {
            return endpoint;
        }
        let deadline = Instant::now() + max_wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(POLL_CADENCE.min(remaining)).await;
            if let Some(endpoint) = self.try_now() {
                return endpoint;
            }
        }
        self.fallback(max_wait)
    }

    /// Sync variant: identical semantics over real sleeps.
    pub(crate) fn select_blocking(&self, max_wait: Duration) -> Endpoint {
        if let Some(endpoint) = self.try_now() {
            return endpoint;
        }
        let deadline = Instant::now() + max_wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            std::thread::sleep(POLL_CADENCE.min(remaining));
            if let Some(endpoint) = self.try_now() {
                return endpoint;
            }
        }
        self.fallback(max_wait)
    }

    fn try_now(&self) -> Option<Endpoint> {
        // Single-endpoint configurations short-circuit: there is nothing to
        // choose between.
        if self.configured.len() == 1 {
            return self.configured.first().cloned();
        }
        let snapshot = self.snapshot_rx.borrow().clone();
        self.pick(&snapshot)
    }

    fn fallback(&self, max_wait: Duration) -> Endpoint {
        tracing::warn!(
            "No healthy endpoint within {:?}; best-effort choice over all {} configured",
            max_wait,
            self.configured.len()
        );
        // `configured` is non-empty by construction, so pick cannot miss.
        self.pick(&self.configured)
            .expect("configured endpoint set is non-empty")
    }

    fn pick(&self, candidates: &[Endpoint]) -> Option<Endpoint> {
        match self.policy {
            SelectionPolicy::LatestFirst => candidates.first().cloned(),
            SelectionPolicy::Random => candidates.choose(&mut rand::thread_rng()).cloned(),
        }
    }
}
