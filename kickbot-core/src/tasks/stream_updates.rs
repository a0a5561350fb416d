use std::sync::Arc;

use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error};

use crate::services::notifier::StreamNotifier;

/// Spawns the background task that runs one reconcile pass per interval.
///
/// Passes are strictly serialized: the tick is awaited inline, so a slow
/// pass delays the next one rather than overlapping it. A failed pass is
/// logged and the next interval retries from scratch; stopping the task is
/// aborting the returned handle.
pub fn spawn_stream_update_task(
    notifier: Arc<StreamNotifier>,
    poll_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match notifier.run_tick().await {
                Ok(summary) => {
                    debug!(
                        "Stream update tick done: {} checked, {} sent, {} edited, {} skipped",
                        summary.checked, summary.sent, summary.edited, summary.skipped
                    );
                }
                Err(e) => {
                    error!("Stream update tick failed: {e:?}");
                }
            }
        }
    })
}
