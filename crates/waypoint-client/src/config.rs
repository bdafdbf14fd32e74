//! Client configuration types.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// One configured backend base URL.
///
/// The configured set is fixed for the client's lifetime; only health status
/// changes at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut url = base_url.into();
        while url.ends_with('/') {
            url.pop();
        }
        Self(url)
    }

    /// The base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.0
    }

    /// Join a relative path onto the base URL.
    pub(crate) fn join(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.0, path)
        } else {
            format!("{}/{}", self.0, path)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rule for choosing one endpoint from the healthy snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Most recently confirmed healthy endpoint (snapshot head).
    LatestFirst,
    /// Uniform choice over the snapshot.
    Random,
}

impl FromStr for SelectionPolicy {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest_first" => Ok(SelectionPolicy::LatestFirst),
            "random" => Ok(SelectionPolicy::Random),
            other => Err(ClientError::Configuration(format!(
                "unknown selection policy: {other:?} (expected \"latest_first\" or \"random\")"
            ))),
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::LatestFirst => write!(f, "latest_first"),
            SelectionPolicy::Random => write!(f, "random"),
        }
    }
}

/// Configuration accepted at client construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend base URLs. Fixed at construction.
    pub endpoints: Vec<String>,
    /// Relative path probed for liveness (default: "/health").
    pub health_check_path: String,
    /// Seconds between probe cycles; also the recency window (default: 10).
    pub health_check_interval_secs: u64,
    /// Per-probe timeout in seconds (default: 2).
    pub probe_timeout_secs: u64,
    /// Per-call timeout in seconds (default: 120).
    pub call_timeout_secs: u64,
    /// Max seconds a call waits for a healthy endpoint to appear (default: 5).
    pub max_wait_for_health_secs: u64,
    /// Endpoint selection policy (default: latest_first).
    pub selection_policy: SelectionPolicy,
    /// Upper bound on concurrent probes per cycle (default: 3).
    pub probe_concurrency: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            health_check_path: "/health".to_string(),
            health_check_interval_secs: 10,
            probe_timeout_secs: 2,
            call_timeout_secs: 120,
            max_wait_for_health_secs: 5,
            selection_policy: SelectionPolicy::LatestFirst,
            probe_concurrency: 3,
        }
    }
}

impl ClientConfig {
    /// Build a config from a comma-delimited endpoint list, defaults elsewhere.
    pub fn from_endpoint_list(list: &str) -> Self {
        Self {
            endpoints: list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            ..Default::default()
        }
    }

    /// Validate the config and materialize the fixed endpoint set.
    ///
    /// An empty endpoint set is rejected here, at construction time, never
    /// at selection time.
    pub(crate) fn validate(&self) -> Result<Arc<[Endpoint]>, ClientError> {
        let endpoints: Vec<Endpoint> = self
            .endpoints
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(Endpoint::new)
            .collect();
        if endpoints.is_empty() {
            return Err(ClientError::Configuration(
                "no endpoints configured".to_string(),
            ));
        }
        Ok(endpoints.into())
    }
}
