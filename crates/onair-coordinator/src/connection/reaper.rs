//! Idle connection reaper
//!
//! Browsers that open the page and never claim an identity still hold a
//! socket and count towards the online total. This task periodically asks
//! the coordinator to close anonymous connections that have been silent for
//! longer than the configured idle timeout.
//!
//! The same sweep re-resolves every bound identity, so a block placed on an
//! identity after it connected takes effect within one interval.
//!
//! The sweep itself runs inside the coordinator task; this loop only paces
//! it, checking every half of the idle timeout so that no connection
//! outlives the timeout by more than fifty percent.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::coordinator::CoordinatorHandle;

/// Run the idle reaper until `cancel` fires or the coordinator stops.
///
/// # Arguments
///
/// * `handle` - Handle to the coordinator task
/// * `interval` - Time between sweeps
/// * `cancel` - Cancellation token for graceful shutdown
pub async fn run_idle_reaper(
    handle: CoordinatorHandle,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; nothing can be idle yet.
    ticker.tick().await;

    tracing::info!("Starting idle reaper (sweep interval: {:?})", interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if handle.reap_idle().await.is_err() {
                    tracing::info!("Coordinator stopped, idle reaper exiting");
                    break;
                }
            }
            _ = cancel.cancelled() => {
                tracing::info!("Idle reaper shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::Command;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_reaper_sends_sweeps_on_interval() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = CoordinatorHandle::from_sender(tx);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_idle_reaper(
            handle,
            Duration::from_secs(30),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(matches!(rx.recv().await, Some(Command::ReapIdle)));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(matches!(rx.recv().await, Some(Command::ReapIdle)));

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_reaper_exits_when_coordinator_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = CoordinatorHandle::from_sender(tx);

        tokio::time::timeout(
            Duration::from_secs(5),
            run_idle_reaper(handle, Duration::from_millis(10), CancellationToken::new()),
        )
        .await
        .expect("reaper should exit once the coordinator is gone");
    }
}
