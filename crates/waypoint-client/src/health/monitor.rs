//! Health monitor implementation.

use dashmap::DashMap;
use futures::StreamExt;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::config::{ClientConfig, Endpoint};

/// Published healthy snapshot: endpoints whose last successful probe is
/// within one polling interval of now, most-recent-first. Replaced wholesale
/// each cycle, never mutated in place.
pub type HealthySnapshot = Arc<[Endpoint]>;

/// Cumulative probe counters for one endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ProbeStats {
    pub successes: u64,
    pub failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct EndpointStats {
    successes: AtomicU64,
    failures: AtomicU64,
}

/// Why a single probe did not count as healthy. Logged, never raised.
#[derive(Debug)]
enum ProbeFailure {
    Status(reqwest::StatusCode),
    Transport(reqwest::Error),
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::Status(status) => write!(f, "status {status}"),
            ProbeFailure::Transport(e) => write!(f, "{e}"),
        }
    }
}

/// Background liveness prober for the configured endpoint set.
pub(crate) struct HealthMonitor {
    endpoints: Arc<[Endpoint]>,
    health_path: String,
    interval: Duration,
    probe_timeout: Duration,
    probe_concurrency: usize,
    http: reqwest::Client,
    snapshot_tx: watch::Sender<HealthySnapshot>,
    stats: Arc<DashMap<Endpoint, EndpointStats>>,
}

/// Handle kept by the client: snapshot receiver, stats, and shutdown signal.
pub(crate) struct MonitorHandle {
    pub(crate) snapshot_rx: watch::Receiver<HealthySnapshot>,
    stats: Arc<DashMap<Endpoint, EndpointStats>>,
    shutdown_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal the monitor loop to exit after its current sleep.
    pub(crate) fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Stop and wait for the loop to finish.
    pub(crate) async fn join(self) {
        self.stop();
        let _ = self.task.await;
    }

    pub(crate) fn probe_stats(&self) -> HashMap<Endpoint, ProbeStats> {
        self.stats
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    ProbeStats {
                        successes: entry.value().successes.load(Ordering::Relaxed),
                        failures: entry.value().failures.load(Ordering::Relaxed),
                    },
                )
            })
            .collect()
    }
}

impl HealthMonitor {
    /// Start the monitor on the ambient runtime. Must be called from a tokio
    /// context; the loop runs until [`MonitorHandle::stop`] or the handle is
    /// dropped.
    pub(crate) fn spawn(
        endpoints: Arc<[Endpoint]>,
        config: &ClientConfig,
        http: reqwest::Client,
    ) -> MonitorHandle {
        let (snapshot_tx, snapshot_rx) = watch::channel(HealthySnapshot::from(Vec::new()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let stats: Arc<DashMap<Endpoint, EndpointStats>> = Arc::new(DashMap::new());
        for endpoint in endpoints.iter() {
            stats.insert(endpoint.clone(), EndpointStats::default());
        }

        let monitor = Self {
            endpoints,
            health_path: config.health_check_path.clone(),
            interval: Duration::from_secs(config.health_check_interval_secs),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            probe_concurrency: config.probe_concurrency.max(1),
            http,
            snapshot_tx,
            stats: Arc::clone(&stats),
        };

        let task = tokio::spawn(monitor.run(shutdown_rx));

        MonitorHandle { snapshot_rx, stats, shutdown_tx, task }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        tracing::info!(
            "Health monitor started: {} endpoints, {:?} interval",
            self.endpoints.len(),
            self.interval
        );

        // Records are owned by this task: written only between probe batches,
        // published to readers as an immutable snapshot.
        let mut records: HashMap<Endpoint, Instant> = HashMap::new();

        loop {
            let cycle_start = Instant::now();
            self.probe_all(&mut records).await;
            self.snapshot_tx
                .send_replace(healthy_snapshot(&records, self.interval, Instant::now()));

            let remaining = self.interval.saturating_sub(cycle_start.elapsed());
            tokio::select! {
                () = tokio::time::sleep(remaining) => {}
                _ = shutdown_rx.changed() => {
                    tracing::info!("Health monitor shutting down");
                    break;
                }
            }
        }
    }

    /// One probe batch: bounded fan-out, joined before the cycle continues.
    /// Failures never clear a prior success; staleness is expressed only
    /// through the recency window at snapshot time.
    async fn probe_all(&self, records: &mut HashMap<Endpoint, Instant>) {
        let results: Vec<(Endpoint, Result<(), ProbeFailure>)> =
            futures::stream::iter(self.endpoints.iter().cloned())
                .map(|endpoint| async move {
                    let result = self.probe(&endpoint).await;
                    (endpoint, result)
                })
                .buffer_unordered(self.probe_concurrency)
                .collect()
                .await;

        for (endpoint, result) in results {
            match result {
                Ok(()) => {
                    records.insert(endpoint.clone(), Instant::now());
                    if let Some(entry) = self.stats.get(&endpoint) {
                        entry.successes.fetch_add(1, Ordering::Relaxed);
                    }
                }
                Err(failure) => {
                    tracing::debug!("Probe failed for {}: {}", endpoint, failure);
                    if let Some(entry) = self.stats.get(&endpoint) {
                        entry.failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }
    }

    async fn probe(&self, endpoint: &Endpoint) -> Result<(), ProbeFailure> {
        let response = self
            .http
            .get(endpoint.join(&self.health_path))
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(ProbeFailure::Transport)?;

        if response.status() == reqwest::StatusCode::OK {
            Ok(())
        } else {
            Err(ProbeFailure::Status(response.status()))
        }
    }
}

/// Endpoints with a record within `window` of `now`, most-recent-first.
pub(crate) fn healthy_snapshot(
    records: &HashMap<Endpoint, Instant>,
    window: Duration,
    now: Instant,
) -> HealthySnapshot {
    let mut recent: Vec<(&Endpoint, Instant)> = records
        .iter()
        .filter(|(_, ts)| now.saturating_duration_since(**ts) <= window)
        .map(|(endpoint, ts)| (endpoint, *ts))
        .collect();
    recent.sort_by(|a, b| b.1.cmp(&a.1));
    recent.into_iter().map(|(endpoint, _)| endpoint.clone()).collect()
}
