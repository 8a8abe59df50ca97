use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use super::entry::{EntryError, EntryService};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically deletes expired entries until shutdown is signalled.
pub struct ExpirySweeper {
    service: EntryService,
    every: Duration,
}

impl ExpirySweeper {
    pub fn new(service: EntryService, every: Duration) -> Self {
        Self { service, every }
    }

    pub fn sweep_once(&self) -> Result<usize, EntryError> {
        self.service.purge_expired()
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.every.as_secs(), "Expiry sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sweep_once() {
                        Ok(0) => debug!("Expiry sweep found nothing to remove"),
                        Ok(removed) => info!(removed, "Expired entries removed"),
                        Err(e) => warn!(error = %e, "Expiry sweep failed"),
                    }
                }
                _ = shutdown.recv() => {
                    info!("Expiry sweeper stopping");
                    break;
                }
            }
        }
    }
}
