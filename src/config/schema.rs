//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! service. All types derive Serde traits for deserialization from config
//! files, and every field has a default so a minimal config is valid.

use serde::{Deserialize, Serialize};

/// Root configuration for the fibonacci service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Where recursive sub-calls are sent (normally this service itself).
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Telemetry backend settings.
    pub telemetry: TelemetryConfig,

    /// Resource sampler settings.
    pub sampler: SamplerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Upstream configuration for recursive sub-calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL the handler dispatches sub-calls to, without a trailing
    /// slash (e.g., "http://127.0.0.1:3000"). The recursive endpoint path
    /// is appended to it.
    pub base_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Inbound request timeout in seconds. 0 disables the timeout layer;
    /// sub-calls then have no deadline and an unresponsive recursive call
    /// stalls its request indefinitely.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 0 }
    }
}

/// Telemetry backend settings.
///
/// Exporter wiring lives outside this service; the access token is carried
/// as an opaque string for whatever collector is attached to the
/// subscriber.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name reported on telemetry resources.
    pub service_name: String,

    /// Service version reported on telemetry resources.
    pub service_version: String,

    /// Deployment environment label.
    pub environment: String,

    /// Access credential for the trace backend. Overridden by the
    /// `LS_ACCESS_TOKEN` environment variable at startup.
    pub access_token: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "fib".to_string(),
            service_version: "v0.1.0".to_string(),
            environment: "workshop".to_string(),
            access_token: String::new(),
        }
    }
}

/// Resource sampler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Enable the background resource sampler.
    pub enabled: bool,

    /// Sampling interval in seconds.
    pub interval_secs: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Fallback log directive when `RUST_LOG` is absent.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "fib_service=debug,tower_http=debug".to_string(),
            metrics_enabled: true,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
