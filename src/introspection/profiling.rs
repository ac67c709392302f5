//! # Profiling Handlers
//!
//! Request handlers behind the `/debug/pprof` routes. Every handler reads the
//! process through the shared [`MetricCollector`] or `sysinfo`; none of them
//! touches the sampling scheduler.

use crate::category::MetricCategory;
use crate::collector::{render_memory, MetricCollector};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::fmt::Write;
use std::future::Future;
use std::time::{Duration, Instant};
use sysinfo::System;
use tokio::sync::watch;

/// Default CPU profile length when `seconds` is omitted.
const DEFAULT_PROFILE_SECONDS: u64 = 30;

/// Default execution trace length when `seconds` is omitted.
const DEFAULT_TRACE_SECONDS: f64 = 1.0;

/// Spacing between execution trace samples.
const TRACE_SAMPLE_PERIOD: Duration = Duration::from_millis(100);

/// Shared state handed to every profiling handler.
#[derive(Clone, Debug)]
pub struct ProfilingState {
    pub collector: MetricCollector,
    /// Upper bound on a single request; long captures must fit inside it.
    pub request_timeout: Duration,
    /// Raised when the shutdown grace runs out; open captures end at once.
    pub cutoff: watch::Receiver<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileParams {
    pub seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TraceParams {
    pub seconds: Option<f64>,
}

fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, message.into()).into_response()
}

/// Rejects capture windows that are empty or would outlive the request timeout.
fn check_capture_window(window: Duration, state: &ProfilingState) -> Result<(), Response> {
    if window.is_zero() {
        return Err(bad_request("capture duration must be positive\n"));
    }
    if window >= state.request_timeout {
        return Err(bad_request(format!(
            "capture duration {:?} exceeds the server's request timeout {:?}\n",
            window, state.request_timeout
        )));
    }
    Ok(())
}

/// Runs a long capture unless the cutoff signal ends it first.
async fn until_cutoff(state: &ProfilingState, capture: impl Future<Output = Response>) -> Response {
    let mut cutoff = state.cutoff.clone();
    let cut_off = async move {
        if cutoff.wait_for(|cut| *cut).await.is_err() {
            // No one can raise the cutoff any more.
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        response = capture => response,
        _ = cut_off => (
            StatusCode::SERVICE_UNAVAILABLE,
            "capture cut off by server shutdown\n",
        )
            .into_response(),
    }
}

/// Lists the available profiles.
pub async fn index(State(state): State<ProfilingState>) -> String {
    let probe = state.collector.probe();
    let threads = probe.live_threads();
    let live_objects = probe.memory_stats().live_objects();

    let mut body = String::from("/debug/pprof/\n\nTypes of profiles available:\nCount\tProfile\n");
    let _ = writeln!(body, "{}\tthreads", threads);
    let _ = writeln!(body, "{}\theap", live_objects);
    body.push('\n');
    body.push_str("cmdline: The command line invocation of the current program.\n");
    let _ = writeln!(
        body,
        "profile: CPU usage of the process. Use ?seconds=N (default {}).",
        DEFAULT_PROFILE_SECONDS
    );
    body.push_str("symbol: Address symbolization. POST addresses joined by '+'.\n");
    body.push_str("trace: Runtime samples over time. Use ?seconds=S (default 1).\n");
    body
}

/// The process arguments, NUL-separated.
pub async fn cmdline() -> String {
    std::env::args().collect::<Vec<_>>().join("\0")
}

/// Samples the process CPU usage once per second for the requested window.
pub async fn cpu_profile(
    State(state): State<ProfilingState>,
    Query(params): Query<ProfileParams>,
) -> Response {
    let seconds = params.seconds.unwrap_or(DEFAULT_PROFILE_SECONDS);
    if let Err(rejection) = check_capture_window(Duration::from_secs(seconds), &state) {
        return rejection;
    }

    until_cutoff(&state, async move {
        let samples = sample_cpu(seconds).await;
        let mut body = format!("cpu profile: {} samples at 1s\n", samples.len());
        for (i, usage) in samples.iter().enumerate() {
            let _ = writeln!(body, "{:>4}s\t{:.2}%", i + 1, usage);
        }
        if !samples.is_empty() {
            let average = samples.iter().sum::<f32>() / samples.len() as f32;
            let _ = writeln!(body, "average\t{:.2}%", average);
        }
        body.into_response()
    })
    .await
}

async fn sample_cpu(seconds: u64) -> Vec<f32> {
    let pid = match sysinfo::get_current_pid() {
        Ok(pid) => pid,
        Err(_) => return Vec::new(),
    };

    let mut system = System::new();
    system.refresh_cpu();
    system.refresh_process(pid);

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await;

    let mut samples = Vec::new();
    for _ in 0..seconds {
        ticker.tick().await;
        system.refresh_cpu();
        if !system.refresh_process(pid) {
            break;
        }
        if let Some(process) = system.process(pid) {
            samples.push(process.cpu_usage());
        }
    }
    samples
}

/// Reports whether symbolization is available. It never is in-process.
pub async fn symbol_info() -> &'static str {
    "num_symbols: 0\n"
}

/// Echoes each requested address, unresolved.
pub async fn symbol_lookup(body: String) -> String {
    body.split(|c: char| c == '+' || c.is_whitespace())
        .filter(|addr| !addr.is_empty())
        .map(|addr| format!("{} ??\n", addr))
        .collect()
}

/// Captures probe readings every 100ms for the requested window.
pub async fn trace(
    State(state): State<ProfilingState>,
    Query(params): Query<TraceParams>,
) -> Response {
    let seconds = params.seconds.unwrap_or(DEFAULT_TRACE_SECONDS);
    let window = match Duration::try_from_secs_f64(seconds) {
        Ok(window) => window,
        Err(_) => return bad_request("capture duration must be a positive number of seconds\n"),
    };
    if let Err(rejection) = check_capture_window(window, &state) {
        return rejection;
    }

    let probe = state.collector.probe().clone();
    until_cutoff(&state, async move {
        let mut body = format!(
            "trace started at {}, window {:.3}s\n",
            chrono::Utc::now().to_rfc3339(),
            window.as_secs_f64()
        );

        let start = Instant::now();
        let mut ticker = tokio::time::interval(TRACE_SAMPLE_PERIOD);
        loop {
            ticker.tick().await;
            let offset = start.elapsed();
            if offset > window {
                break;
            }
            let stats = probe.memory_stats();
            let _ = writeln!(
                body,
                "+{}ms\tthreads={}\talloc={}\tmallocs={}\tfrees={}",
                offset.as_millis(),
                probe.live_threads(),
                stats.alloc_bytes,
                stats.mallocs,
                stats.frees
            );
        }
        body.into_response()
    })
    .await
}

/// Serves a named profile from the collector: `threads` or `heap`.
pub async fn named_profile(
    State(state): State<ProfilingState>,
    Path(name): Path<String>,
) -> Response {
    match name.as_str() {
        "threads" => {
            let snapshot = state.collector.collect(MetricCategory::THREADS);
            let count = snapshot.get(MetricCategory::THREADS).unwrap_or("0");
            format!("threads: {}\n", count).into_response()
        }
        "heap" => {
            let stats = state.collector.probe().memory_stats();
            format!("{}\n", render_memory(&stats)).into_response()
        }
        _ => (StatusCode::NOT_FOUND, format!("Unknown profile: {}\n", name)).into_response(),
    }
}
