//! # vaaloader-observability
//!
//! Structured logging for VAALoader. Human-readable text by default, JSON
//! lines (ELK / Loki / CloudWatch friendly) on request, with log levels
//! configurable per component.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, LogConfig};
