// reaper — background eviction of idle SSE sessions.
//
// Streams whose peer vanished without a clean disconnect (network partition,
// half-open TCP) are never dropped by the HTTP stack until a write fails. The
// reaper closes any session with no activity (open, submit, delivered message)
// for longer than the configured TTL.

use std::time::Duration;

use crate::mcp::transport::SseTransport;

const MAX_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// How often to scan for a given TTL: half the TTL, capped at one minute.
pub fn check_interval(ttl: Duration) -> Duration {
    (ttl / 2).clamp(Duration::from_millis(10), MAX_CHECK_INTERVAL)
}

pub fn spawn(transport: SseTransport, ttl: Duration) -> tokio::task::JoinHandle<()> {
    let interval = check_interval(ttl);
    tokio::spawn(async move {
        tracing::info!(
            "reaper: started (ttl={}s, interval={}s)",
            ttl.as_secs(),
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let evicted = transport.evict_idle(ttl);
            if evicted > 0 {
                tracing::warn!("reaper: evicted {} idle session(s)", evicted);
            } else {
                tracing::debug!(
                    "reaper: {} active session(s), none idle",
                    transport.active_session_count()
                );
            }
        }
    })
}
