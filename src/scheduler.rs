//! # Scheduler
//!
//! Owns the sampling interval, the metric selector, the tick task and the
//! optional introspection server.
//!
//! ## Lifecycle
//!
//! A scheduler starts `Idle`, becomes `Running` on [`Scheduler::start`] and
//! ends `Stopped` after [`Scheduler::stop`]. A stopped scheduler cannot be
//! restarted; build a fresh one instead.
//!
//! ## Concurrency
//!
//! The tick task and the HTTP server are independent Tokio tasks. Both watch
//! one `watch::channel(bool)` stop signal, which can be raised any number of
//! times and from any context without blocking. Configuration lives behind a
//! mutex, so the setters are safe to call while the tick task runs; a new
//! interval applies from the next re-arm onward.

use crate::category::MetricCategory;
use crate::collector::MetricCollector;
use crate::config::SchedulerConfig;
use crate::core::{RuntimeProbe, Snapshot, TracingSink, VerboseSink};
use crate::error::ConfigError;
use crate::introspection::{IntrospectionServer, ProfilingState, BASE_PATH};
use crate::task_manager::TaskManager;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;

/// Consumer of the snapshots produced on each tick.
///
/// Runs on the tick task, off the caller's control flow.
pub type SnapshotCallback = Arc<dyn Fn(Snapshot) + Send + Sync>;

/// Where a scheduler is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Running,
    Stopped,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolves once the stop signal reads `true` or its sender is gone.
async fn stopped(stop_rx: &mut watch::Receiver<bool>) {
    let _ = stop_rx.wait_for(|stopped| *stopped).await;
}

/// Configuration and log sink shared between the scheduler and its tasks.
#[derive(Clone)]
struct Context {
    config: Arc<Mutex<SchedulerConfig>>,
    sink: Arc<dyn VerboseSink>,
}

impl Context {
    fn config(&self) -> MutexGuard<'_, SchedulerConfig> {
        lock(&self.config)
    }

    fn verbose(&self, message: &str) {
        // Read the flag first so the sink never runs under the config lock.
        let enabled = self.config().verbose;
        if enabled {
            self.sink.log(message);
        }
    }
}

/// Periodically samples runtime metrics and hands them to a callback.
pub struct Scheduler {
    context: Context,
    collector: MetricCollector,
    callback: Option<SnapshotCallback>,
    state: Mutex<LifecycleState>,
    stop_tx: watch::Sender<bool>,
    cutoff_tx: watch::Sender<bool>,
    tasks: TaskManager,
    server_addr: Arc<Mutex<Option<SocketAddr>>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &*self.context.config())
            .field("state", &self.state())
            .field("has_callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Creates a scheduler that delivers every snapshot to `callback`.
    pub fn new<F>(config: SchedulerConfig, callback: F) -> Self
    where
        F: Fn(Snapshot) + Send + Sync + 'static,
    {
        Self::from_config(config).on_snapshot(callback)
    }

    /// Creates a scheduler with the default selector and a 10 second interval.
    pub fn with_defaults<F>(callback: F) -> Self
    where
        F: Fn(Snapshot) + Send + Sync + 'static,
    {
        Self::new(SchedulerConfig::default(), callback)
    }

    /// Creates a scheduler without a callback.
    ///
    /// Such a scheduler never ticks; it can still serve introspection routes
    /// and answer [`current_snapshot`](Self::current_snapshot).
    pub fn from_config(config: SchedulerConfig) -> Self {
        let (stop_tx, _) = watch::channel(false);
        let (cutoff_tx, _) = watch::channel(false);
        Self {
            context: Context {
                config: Arc::new(Mutex::new(config)),
                sink: Arc::new(TracingSink),
            },
            collector: MetricCollector::default(),
            callback: None,
            state: Mutex::new(LifecycleState::Idle),
            stop_tx,
            cutoff_tx,
            tasks: TaskManager::new(),
            server_addr: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates a scheduler that only serves the profiling routes on `port`.
    ///
    /// It selects no categories, has no callback and logs verbosely; see
    /// [`SchedulerConfig::profiling_only`].
    pub fn profiling_only(port: u16) -> Self {
        Self::from_config(SchedulerConfig::profiling_only(port))
    }

    /// Sets the snapshot consumer.
    pub fn on_snapshot<F>(mut self, callback: F) -> Self
    where
        F: Fn(Snapshot) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Reads the runtime through `probe` instead of the current process.
    pub fn with_probe(mut self, probe: Arc<dyn RuntimeProbe>) -> Self {
        self.collector = MetricCollector::new(probe);
        self
    }

    /// Sends verbose messages to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: Arc<dyn VerboseSink>) -> Self {
        self.context.sink = sink;
        self
    }

    pub fn set_selector(&self, selector: MetricCategory) {
        self.context.config().selector = selector;
    }

    /// Changes the interval. A tick already armed keeps its old deadline.
    pub fn set_interval(&self, interval: Duration) -> Result<(), ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        self.context.config().interval = interval;
        Ok(())
    }

    /// Changes the introspection port. Only effective before `start`.
    pub fn set_port(&self, port: u16) {
        self.context.config().port = port;
    }

    pub fn set_verbose(&self, verbose: bool) {
        self.context.config().verbose = verbose;
    }

    pub fn selector(&self) -> MetricCategory {
        self.context.config().selector
    }

    pub fn interval(&self) -> Duration {
        self.context.config().interval
    }

    pub fn port(&self) -> u16 {
        self.context.config().port
    }

    pub fn is_verbose(&self) -> bool {
        self.context.config().verbose
    }

    pub fn state(&self) -> LifecycleState {
        *lock(&self.state)
    }

    /// The address the introspection server is serving on, if it is.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        *lock(&self.server_addr)
    }

    /// Collects a snapshot now, outside the tick cycle.
    pub fn current_snapshot(&self) -> Snapshot {
        self.collector.collect(self.selector())
    }

    /// Starts the tick task and, if a port is set, the introspection server.
    ///
    /// Call at most once per instance, from within a Tokio runtime. Later
    /// calls, calls after [`stop`](Self::stop), and calls outside a runtime
    /// do nothing beyond a verbose message. A port that cannot be bound
    /// disables the server but not sampling.
    pub fn start(&self) {
        let runtime = {
            let mut state = lock(&self.state);
            if *state != LifecycleState::Idle {
                let current = *state;
                drop(state);
                self.context
                    .verbose(&format!("start ignored: monitor is {:?}", current));
                return;
            }
            let runtime = match Handle::try_current() {
                Ok(runtime) => runtime,
                Err(_) => {
                    drop(state);
                    self.context
                        .verbose("start ignored: no Tokio runtime is available");
                    return;
                }
            };
            *state = LifecycleState::Running;
            runtime
        };

        self.context.verbose("start monitoring...");

        if let Some(callback) = &self.callback {
            self.tasks.spawn(
                &runtime,
                "tick-loop",
                tick_loop(
                    self.context.clone(),
                    self.collector.clone(),
                    callback.clone(),
                    self.stop_tx.subscribe(),
                ),
            );
        }

        let config = self.context.config().clone();
        if let Some(addr) = config.http_addr() {
            self.start_server(&runtime, addr, config.request_timeout);
        }
    }

    fn start_server(&self, runtime: &Handle, addr: SocketAddr, request_timeout: Duration) {
        let state = ProfilingState {
            collector: self.collector.clone(),
            request_timeout,
            cutoff: self.cutoff_tx.subscribe(),
        };
        let server = match IntrospectionServer::bind(addr, state, self.stop_tx.subscribe()) {
            Ok(server) => server,
            Err(e) => {
                self.context
                    .verbose(&format!("introspection server failed to bind {}: {}", addr, e));
                return;
            }
        };

        let local_addr = server.local_addr().unwrap_or(addr);
        *lock(&self.server_addr) = Some(local_addr);
        self.context.verbose(&format!(
            "start introspection server on http://{}{}/",
            local_addr, BASE_PATH
        ));

        let context = self.context.clone();
        let server_addr = self.server_addr.clone();
        self.tasks.spawn(runtime, "introspection-server", async move {
            match server.run().await {
                Ok(()) => context.verbose("introspection server stopped"),
                Err(e) => context.verbose(&format!("introspection server failed: {}", e)),
            }
            *lock(&server_addr) = None;
        });
    }

    /// Stops ticking and shuts the introspection server down.
    ///
    /// Each background task gets the configured shutdown grace to finish
    /// (in-flight HTTP requests included) before it is aborted, and profile
    /// or trace captures still open after that window are cut off. Safe to call
    /// on a scheduler that never started, and safe to call more than once.
    /// Once this returns, no further tick fires.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *lock(&self.state), LifecycleState::Stopped);
        if previous == LifecycleState::Running {
            self.context.verbose("stopping monitoring...");
        }

        self.stop_tx.send_replace(true);

        let grace = self.context.config().shutdown_grace;
        for name in self.tasks.shutdown(grace).await {
            self.context
                .verbose(&format!("{} did not stop within {:?}, aborted", name, grace));
        }
        // Connections outlive the server task; end any capture still running.
        self.cutoff_tx.send_replace(true);
        *lock(&self.server_addr) = None;

        if previous == LifecycleState::Running {
            self.context.verbose("monitoring stopped");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Background tasks must not outlive their owner.
        self.stop_tx.send_replace(true);
        self.cutoff_tx.send_replace(true);
    }
}

async fn tick_loop(
    context: Context,
    collector: MetricCollector,
    callback: SnapshotCallback,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        let interval = context.config().interval;
        tokio::select! {
            biased;
            _ = stopped(&mut stop_rx) => break,
            _ = tokio::time::sleep(interval) => {
                let selector = context.config().selector;
                callback(collector.collect(selector));
            }
        }
    }
    context.verbose("received stop signal, tick loop exited");
}
