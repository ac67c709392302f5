#![allow(dead_code)]
pub mod fake_probe;
pub mod mock_callback;
pub mod recording_sink;

use fake_probe::FakeProbe;
use procwatch::{MetricCategory, Scheduler, SchedulerConfig};
use recording_sink::RecordingSink;
use std::sync::Arc;
use std::time::Duration;

/// Returns a port that was free a moment ago.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Builds a config with a short grace period so failing tests end quickly.
pub fn test_config(interval: Duration, port: u16) -> SchedulerConfig {
    let mut config = SchedulerConfig::new(MetricCategory::DEFAULT, interval, port).unwrap();
    config.shutdown_grace = Duration::from_secs(2);
    config.verbose = true;
    config
}

/// Creates a scheduler wired to a fake probe and a recording sink.
pub fn create_test_scheduler(
    config: SchedulerConfig,
) -> (Scheduler, Arc<FakeProbe>, Arc<RecordingSink>) {
    let probe = Arc::new(FakeProbe::new(4));
    let sink = Arc::new(RecordingSink::new());
    let scheduler = Scheduler::from_config(config)
        .with_probe(probe.clone())
        .with_sink(sink.clone());
    (scheduler, probe, sink)
}
