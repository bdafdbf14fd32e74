//! Client facade: select → build → execute → decode.

use crate::config::{ClientConfig, Endpoint};
use crate::decode;
use crate::error::ClientError;
use crate::health::{HealthMonitor, MonitorHandle, ProbeStats};
use crate::request::{build_request, CallArgs, OutgoingRequest};
use crate::select::EndpointSelector;
use crate::spec::{CallSpec, ResponseShape};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Discovery-aware client for a fleet of HTTP worker endpoints.
///
/// Construction validates the config and starts the background health
/// monitor, so it must happen inside a tokio runtime. Every declared
/// operation is callable both asynchronously (`call_*`) and synchronously
/// (`call_*_blocking`); the blocking entry points use `reqwest::blocking`
/// and must not be invoked from an async context.
///
/// Each invocation makes exactly one network attempt. Retry composition is
/// deliberately left to the caller.
pub struct WaypointClient {
    http: reqwest::Client,
    blocking_http: Mutex<Option<reqwest::blocking::Client>>,
    selector: EndpointSelector,
    monitor: MonitorHandle,
    call_timeout: Duration,
    max_wait: Duration,
}

impl WaypointClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let configured = config.validate()?;
        let call_timeout = Duration::from_secs(config.call_timeout_secs);
        let http = reqwest::Client::builder().timeout(call_timeout).build()?;

        let monitor = HealthMonitor::spawn(Arc::clone(&configured), &config, http.clone());
        let selector = EndpointSelector::new(
            configured,
            monitor.snapshot_rx.clone(),
            config.selection_policy,
        );

        Ok(Self {
            http,
            blocking_http: Mutex::new(None),
            selector,
            monitor,
            call_timeout,
            max_wait: Duration::from_secs(config.max_wait_for_health_secs),
        })
    }

    /// Invoke an operation declared to return a single structured value.
    pub async fn call_one<T: DeserializeOwned>(
        &self,
        spec: &CallSpec,
        args: CallArgs,
    ) -> Result<T, ClientError> {
        require_shape(spec, ResponseShape::Item)?;
        decode::decode_item(self.invoke(spec, &args).await?)
    }

    /// Invoke an operation declared to return an ordered list.
    pub async fn call_list<T: DeserializeOwned>(
        &self,
        spec: &CallSpec,
        args: CallArgs,
    ) -> Result<Vec<T>, ClientError> {
        require_shape(spec, ResponseShape::List)?;
        decode::decode_list(self.invoke(spec, &args).await?)
    }

    /// Invoke an operation declared to return raw JSON.
    pub async fn call_raw(&self, spec: &CallSpec, args: CallArgs) -> Result<Value, ClientError> {
        require_shape(spec, ResponseShape::Raw)?;
        self.invoke(spec, &args).await
    }

    /// Blocking form of [`Self::call_one`].
    pub fn call_one_blocking<T: DeserializeOwned>(
        &self,
        spec: &CallSpec,
        args: CallArgs,
    ) -> Result<T, ClientError> {
        require_shape(spec, ResponseShape::Item)?;
        decode::decode_item(self.invoke_blocking(spec, &args)?)
    }

    /// Blocking form of [`Self::call_list`].
    pub fn call_list_blocking<T: DeserializeOwned>(
        &self,
        spec: &CallSpec,
        args: CallArgs,
    ) -> Result<Vec<T>, ClientError> {
        require_shape(spec, ResponseShape::List)?;
        decode::decode_list(self.invoke_blocking(spec, &args)?)
    }

    /// Blocking form of [`Self::call_raw`].
    pub fn call_raw_blocking(&self, spec: &CallSpec, args: CallArgs) -> Result<Value, ClientError> {
        require_shape(spec, ResponseShape::Raw)?;
        self.invoke_blocking(spec, &args)
    }

    /// Endpoints currently considered healthy, most-recent-first.
    pub fn healthy_endpoints(&self) -> Vec<Endpoint> {
        self.monitor.snapshot_rx.borrow().to_vec()
    }

    /// Cumulative probe counters per configured endpoint.
    pub fn probe_stats(&self) -> HashMap<Endpoint, ProbeStats> {
        self.monitor.probe_stats()
    }

    /// Signal the health monitor to exit. In-flight calls are unaffected.
    pub fn stop(&self) {
        self.monitor.stop();
    }

    /// Stop the monitor and wait for its loop to finish.
    pub async fn shutdown(self) {
        self.monitor.join().await;
    }

    async fn invoke(&self, spec: &CallSpec, args: &CallArgs) -> Result<Value, ClientError> {
        let endpoint = self.selector.select(self.max_wait).await;
        let request = build_request(spec, &endpoint, args)?;
        tracing::debug!("{:?} {}", request.method, request.url);
        self.execute(request).await
    }

    async fn execute(&self, request: OutgoingRequest) -> Result<Value, ClientError> {
        let mut builder = self.http.request(request.method.as_reqwest(), &request.url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        // Exactly one network attempt; transport failures propagate as-is.
        let response = builder.send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::RemoteCall { status: status.as_u16(), body });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    fn invoke_blocking(&self, spec: &CallSpec, args: &CallArgs) -> Result<Value, ClientError> {
        let endpoint = self.selector.select_blocking(self.max_wait);
        let request = build_request(spec, &endpoint, args)?;
        tracing::debug!("{:?} {} (blocking)", request.method, request.url);
        self.execute_blocking(request)
    }

    fn execute_blocking(&self, request: OutgoingRequest) -> Result<Value, ClientError> {
        let http = self.blocking_http()?;
        let mut builder = http.request(request.method.as_reqwest(), &request.url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        let response = builder.send()?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().unwrap_or_default();
            return Err(ClientError::RemoteCall { status: status.as_u16(), body });
        }
        response
            .json::<Value>()
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// The blocking transport is built lazily, on the first blocking call:
    /// constructing it eagerly would happen inside the caller's runtime.
    fn blocking_http(&self) -> Result<reqwest::blocking::Client, ClientError> {
        let mut slot = self.blocking_http.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.call_timeout)
            .build()?;
        *slot = Some(client.clone());
        Ok(client)
    }
}

fn require_shape(spec: &CallSpec, expected: ResponseShape) -> Result<(), ClientError> {
    match spec.response_shape() {
        Some(shape) if shape == expected => Ok(()),
        Some(shape) => Err(ClientError::Configuration(format!(
            "{:?} declares {shape:?} responses, entry point expects {expected:?}",
            spec.path()
        ))),
        None => Err(ClientError::Configuration(format!(
            "call spec {:?} declares no response shape",
            spec.path()
        ))),
    }
}
