#![doc = include_str!("../README.md")]

mod client;
mod config;
mod decode;
mod error;
mod health;
mod request;
mod select;
mod spec;

pub use client::WaypointClient;
pub use config::{ClientConfig, Endpoint, SelectionPolicy};
pub use error::ClientError;
pub use health::{HealthySnapshot, ProbeStats};
pub use request::CallArgs;
pub use spec::{BodySource, CallSpec, Method, ResponseShape};
