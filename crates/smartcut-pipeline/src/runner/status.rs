/// Receives every job-status transition of a run.
#[async_trait::async_trait]
pub trait StatusSink: Send + Sync {
    async fn update(&self, session: &str, status: &str);
}

/// Prints to stdout.
pub struct StdoutStatus;

#[async_trait::async_trait]
impl StatusSink for StdoutStatus {
    async fn update(&self, session: &str, status: &str) {
        println!("[{session}] {status}");
    }
}

/// Collects statuses in memory (for testing).
#[derive(Default)]
pub struct CollectStatus {
    statuses: std::sync::Mutex<Vec<String>>,
}

impl CollectStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.statuses
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl StatusSink for CollectStatus {
    async fn update(&self, _session: &str, status: &str) {
        if let Ok(mut statuses) = self.statuses.lock() {
            statuses.push(status.to_string());
        }
    }
}
