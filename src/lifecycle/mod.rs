//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Init logging/metrics → Spawn sampler → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → server drains, sampler loop exits
//!
//! Signals (signals.rs):
//!     SIGTERM / Ctrl+C → trigger shutdown
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
