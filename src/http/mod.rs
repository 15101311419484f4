//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, routes, middleware)
//!     → request.rs (request ID)
//!     → fanout.rs (/fib and /fibinternal: decompose, sub-call, aggregate)
//!         ↘ recursive sub-calls loop back into server.rs over the network
//! ```

pub mod fanout;
pub mod request;
pub mod server;

pub use request::{RequestIdLayer, X_REQUEST_ID};
pub use server::HttpServer;
