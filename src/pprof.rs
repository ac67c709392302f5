//! # Standalone Profiling Server
//!
//! For processes that want the `/debug/pprof` routes and nothing else. The
//! returned [`Scheduler`] samples no categories and never ticks; keep it
//! alive for as long as the routes should be served and call
//! [`Scheduler::stop`] to take them down.
//!
//! ```no_run
//! # async fn run() {
//! let profiling = procwatch::pprof::serve();
//! // ... the application runs ...
//! profiling.stop().await;
//! # }
//! ```

use crate::scheduler::Scheduler;

pub use crate::config::DEFAULT_PPROF_PORT;

/// Serves the profiling routes on [`DEFAULT_PPROF_PORT`].
///
/// Must be called from within a Tokio runtime, otherwise the returned
/// scheduler stays idle.
pub fn serve() -> Scheduler {
    serve_on(DEFAULT_PPROF_PORT)
}

/// Serves the profiling routes on `port`.
pub fn serve_on(port: u16) -> Scheduler {
    let scheduler = Scheduler::profiling_only(port);
    scheduler.start();
    scheduler
}
