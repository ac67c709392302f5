//! Integration tests for the introspection server.

mod helpers;

use helpers::{
    create_test_scheduler, free_port, mock_callback::CountingCallback, recording_sink::RecordingSink,
    test_config,
};
use procwatch::{LifecycleState, MetricCategory, Scheduler};
use std::sync::Arc;
use std::time::Duration;

async fn get(url: &str) -> reqwest::Response {
    reqwest::Client::new()
        .get(url)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_routes_are_served_while_running() {
    let port = free_port();
    let (scheduler, _probe, sink) = create_test_scheduler(test_config(Duration::from_secs(3600), port));

    scheduler.start();
    let addr = scheduler.http_addr().expect("server should be serving");
    assert_eq!(addr.port(), port);
    assert!(sink.contains("start introspection server on http://"));

    let base = format!("http://{}/debug/pprof", addr);

    let index = get(&format!("{}/", base)).await;
    assert!(index.status().is_success());
    let body = index.text().await.unwrap();
    assert!(body.contains("4\tthreads"), "{}", body);
    assert!(body.contains("60\theap"), "{}", body);

    let cmdline = get(&format!("{}/cmdline", base)).await.text().await.unwrap();
    assert!(!cmdline.is_empty());

    let symbol = get(&format!("{}/symbol", base)).await.text().await.unwrap();
    assert_eq!(symbol, "num_symbols: 0\n");

    let resolved = reqwest::Client::new()
        .post(format!("{}/symbol", base))
        .body("0x10+0x20")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(resolved, "0x10 ??\n0x20 ??\n");

    let threads = get(&format!("{}/threads", base)).await.text().await.unwrap();
    assert_eq!(threads, "threads: 4\n");

    let heap = get(&format!("{}/heap", base)).await.text().await.unwrap();
    assert!(heap.starts_with("Allocated: 2.00 KB\n"), "{}", heap);

    let missing = get(&format!("{}/goroutine", base)).await;
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    scheduler.stop().await;
}

#[tokio::test]
async fn test_trace_and_profile_captures() {
    let port = free_port();
    let (scheduler, _probe, _sink) = create_test_scheduler(test_config(Duration::from_secs(3600), port));
    scheduler.start();
    let base = format!("http://{}/debug/pprof", scheduler.http_addr().unwrap());

    let trace = get(&format!("{}/trace?seconds=0.3", base)).await;
    assert!(trace.status().is_success());
    let body = trace.text().await.unwrap();
    assert!(body.starts_with("trace started at "), "{}", body);
    let samples = body.lines().filter(|l| l.starts_with('+')).count();
    assert!((2..=5).contains(&samples), "{}", body);
    assert!(body.contains("threads=4"), "{}", body);

    let profile = get(&format!("{}/profile?seconds=1", base)).await;
    assert!(profile.status().is_success());
    assert!(profile.text().await.unwrap().starts_with("cpu profile: "));

    scheduler.stop().await;
}

#[tokio::test]
async fn test_capture_longer_than_request_timeout_is_rejected() {
    let port = free_port();
    let mut config = test_config(Duration::from_secs(3600), port);
    config.request_timeout = Duration::from_secs(5);
    let (scheduler, _probe, _sink) = create_test_scheduler(config);
    scheduler.start();
    let base = format!("http://{}/debug/pprof", scheduler.http_addr().unwrap());

    let profile = get(&format!("{}/profile", base)).await;
    assert_eq!(profile.status(), reqwest::StatusCode::BAD_REQUEST);

    let trace = get(&format!("{}/trace?seconds=10", base)).await;
    assert_eq!(trace.status(), reqwest::StatusCode::BAD_REQUEST);

    let negative = get(&format!("{}/trace?seconds=-1", base)).await;
    assert_eq!(negative.status(), reqwest::StatusCode::BAD_REQUEST);

    scheduler.stop().await;
}

#[tokio::test]
async fn test_server_stops_serving_after_stop() {
    let port = free_port();
    let (scheduler, _probe, sink) = create_test_scheduler(test_config(Duration::from_secs(3600), port));
    scheduler.start();
    let addr = scheduler.http_addr().unwrap();

    scheduler.stop().await;
    assert_eq!(scheduler.http_addr(), None);
    assert!(sink.contains("introspection server stopped"));

    let result = reqwest::Client::new()
        .get(format!("http://{}/debug/pprof/", addr))
        .timeout(Duration::from_secs(1))
        .send()
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_stop_bounds_long_running_requests() {
    let port = free_port();
    let mut config = test_config(Duration::from_secs(3600), port);
    config.shutdown_grace = Duration::from_millis(200);
    let (scheduler, _probe, sink) = create_test_scheduler(config);
    scheduler.start();
    let url = format!("http://{}/debug/pprof/trace?seconds=30", scheduler.http_addr().unwrap());

    let request = tokio::spawn(async move {
        reqwest::Client::new()
            .get(url)
            .timeout(Duration::from_secs(60))
            .send()
            .await
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = std::time::Instant::now();
    scheduler.stop().await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(sink.contains("introspection-server did not stop within"));

    // The cut-off capture ends early instead of running its full window.
    let outcome = tokio::time::timeout(Duration::from_secs(5), request)
        .await
        .expect("capture was not cut off")
        .unwrap();
    if let Ok(response) = outcome {
        assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    }
}

#[tokio::test]
async fn test_bound_port_disables_server_but_not_sampling() {
    let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = blocker.local_addr().unwrap().port();

    let counter = CountingCallback::new();
    let (scheduler, _probe, sink) = create_test_scheduler(test_config(Duration::from_millis(50), port));
    let scheduler = scheduler.on_snapshot(counter.callback());

    scheduler.start();
    assert_eq!(scheduler.http_addr(), None);
    assert!(sink.contains("failed to bind"));

    tokio::time::sleep(Duration::from_millis(220)).await;
    scheduler.stop().await;

    let ticks = counter.count();
    assert!((3..=5).contains(&ticks), "expected about 4 ticks, got {}", ticks);
    drop(blocker);
}

#[tokio::test]
async fn test_profiling_only_serves_routes_without_ticking() {
    let port = free_port();
    let sink = Arc::new(RecordingSink::new());
    let scheduler = Scheduler::profiling_only(port).with_sink(sink.clone());
    assert_eq!(scheduler.selector(), MetricCategory::NONE);
    assert!(scheduler.is_verbose());
    assert!(scheduler.current_snapshot().is_empty());

    scheduler.start();
    let addr = scheduler.http_addr().expect("server should be serving");
    let base = format!("http://{}/debug/pprof", addr);

    let index = get(&format!("{}/", base)).await.text().await.unwrap();
    assert!(index.contains("\tthreads"), "{}", index);
    let symbol = get(&format!("{}/symbol", base)).await.text().await.unwrap();
    assert_eq!(symbol, "num_symbols: 0\n");

    scheduler.stop().await;
    assert!(sink.contains("start introspection server on http://"));
    assert!(sink.contains("introspection server stopped"));
    assert!(!sink.contains("tick loop exited"));
}

#[tokio::test]
async fn test_pprof_serve_on_starts_immediately() {
    let port = free_port();
    let scheduler = procwatch::pprof::serve_on(port);
    assert_eq!(scheduler.state(), LifecycleState::Running);
    assert_eq!(scheduler.port(), port);

    let addr = scheduler.http_addr().expect("server should be serving");
    let cmdline = get(&format!("http://{}/debug/pprof/cmdline", addr)).await;
    assert!(cmdline.status().is_success());

    scheduler.stop().await;
    assert_eq!(scheduler.http_addr(), None);
}
