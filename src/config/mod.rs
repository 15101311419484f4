//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, named by FIB_CONFIG)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → shared with subsystems at startup
//! ```
//!
//! Config is immutable once loaded; the service reads it exactly once at
//! startup. Identity labels consumed by the sampler are the exception:
//! those are resolved from the environment at emission time.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{resolve_config, ConfigError};
pub use schema::ServiceConfig;
pub use schema::{
    ListenerConfig, ObservabilityConfig, SamplerConfig, TelemetryConfig, TimeoutConfig,
    UpstreamConfig,
};
