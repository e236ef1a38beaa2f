use crate::cache::ResultCache;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

/// Job scheduler for background tasks
pub struct JobScheduler {
    cache: Arc<ResultCache>,
    cleanup_interval: Duration,
}

impl JobScheduler {
    pub fn new(cache: Arc<ResultCache>, cleanup_interval: Duration) -> Self {
        Self {
            cache,
            cleanup_interval,
        }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        info!("Starting background job scheduler");
        let handle = tokio::spawn(Self::cache_cleanup_job(Arc::clone(&self)));
        info!(interval_secs = self.cleanup_interval.as_secs(), "Background jobs started");
        handle
    }

    /// Sweep expired dossiers out of the cache
    async fn cache_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(scheduler.cleanup_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            scheduler.run_cache_cleanup();
        }
    }

    /// One sweep; returns how many entries were dropped
    pub fn run_cache_cleanup(&self) -> usize {
        let purged = self.cache.purge_expired();
        if purged > 0 {
            info!("Purged {} expired cache entries", purged);
        } else {
            debug!("Cache cleanup: no expired entries found");
        }
        purged
    }
}
