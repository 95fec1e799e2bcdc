use std::{sync::Arc, time::Duration};

use tokio::time;
use tracing::{debug, info};

use crate::{rate_limit::RateLimiter, registry::SessionRegistry};

pub async fn start_cleanup_task(
    sessions: Arc<SessionRegistry>,
    limiter: Arc<RateLimiter>,
    every: Duration,
) {
    let every = every.max(Duration::from_secs(1));
    let mut interval = time::interval(every);

    info!(
        "Started session cleanup task: checking every {}s",
        every.as_secs()
    );

    loop {
        interval.tick().await;
        cleanup_sessions(&sessions);
        cleanup_rate_limits(&limiter);
    }
}

fn cleanup_sessions(sessions: &SessionRegistry) {
    let removed = sessions.sweep_closed();
    if removed > 0 {
        info!("Cleaned up {} abandoned sessions", removed);
    } else {
        debug!("No abandoned sessions, {} active", sessions.len());
    }
}

fn cleanup_rate_limits(limiter: &RateLimiter) {
    let removed = limiter.prune();
    if removed > 0 {
        debug!(
            "Dropped {} idle rate limit buckets, {} remain",
            removed,
            limiter.len()
        );
    }
}
