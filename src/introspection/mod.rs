//! # Introspection Module
//!
//! The optional HTTP surface of the monitor.
//!
//! ## Components:
//!
//! - **`IntrospectionServer`**: (Defined in `server.rs`) An `axum` listener
//!   serving the `/debug/pprof` routes with graceful shutdown.
//!
//! - **Profiling handlers**: (Defined in `profiling.rs`) index, command line,
//!   CPU profile, symbol lookup, execution trace, and the named `threads` and
//!   `heap` profiles.
//!
//! No authentication is performed. Bind the server to a trusted interface.

pub mod profiling;
pub mod server;

pub use profiling::ProfilingState;
pub use server::{router, IntrospectionServer, BASE_PATH};
