//! Endpoint liveness monitoring.
//!
//! One background task per client probes every configured endpoint's health
//! path each cycle and publishes an immutable healthy snapshot through a
//! watch channel. The monitor is the only writer; selectors read whole
//! replacement values and never see a partial update.

mod monitor;

pub use monitor::{HealthySnapshot, ProbeStats};
pub(crate) use monitor::{HealthMonitor, MonitorHandle};
