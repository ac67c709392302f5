use procwatch::Snapshot;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tokio::sync::Notify;

/// Counts snapshot deliveries and keeps the last one.
#[derive(Clone, Debug, Default)]
pub struct CountingCallback {
    pub count: Arc<AtomicUsize>,
    pub last: Arc<Mutex<Option<Snapshot>>>,
    pub notifier: Arc<Notify>,
}

impl CountingCallback {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Option<Snapshot> {
        self.last.lock().unwrap().clone()
    }

    /// Returns a closure suitable for `Scheduler::on_snapshot`.
    pub fn callback(&self) -> impl Fn(Snapshot) + Send + Sync + 'static {
        let this = self.clone();
        move |snapshot| {
            *this.last.lock().unwrap() = Some(snapshot);
            this.count.fetch_add(1, Ordering::SeqCst);
            this.notifier.notify_one();
        }
    }

    pub async fn wait_for_count(&self, target_count: usize, timeout_duration: Duration) {
        let wait_future = async {
            while self.count() < target_count {
                self.notifier.notified().await;
            }
        };

        tokio::time::timeout(timeout_duration, wait_future)
            .await
            .expect("Timed out waiting for snapshots");
    }
}
