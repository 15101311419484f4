//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and the sampler produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → tracing.rs (causal spans, emitted as JSON records)
//!
//! Across the recursive HTTP hop:
//!     outbound: propagation.rs encodes the active SpanContext into headers
//!     inbound:  propagation.rs decodes headers back into a SpanContext
//! ```
//!
//! The handlers depend only on the span/metrics interfaces here, never on
//! a specific telemetry backend.

pub mod logging;
pub mod metrics;
pub mod propagation;
pub mod tracing;

pub use self::tracing::{AttributeValue, CausalSpan, SpanContext, SpanStatus};
