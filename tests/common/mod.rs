//! Test doubles shared by the integration tests

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use xtradb_backup_operator::retry::Sleeper;

/// Records requested delays instead of sleeping
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Requested delays, in whole seconds
    pub fn delays(&self) -> Vec<u64> {
        self.delays.lock().unwrap().iter().map(|d| d.as_secs()).collect()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}
