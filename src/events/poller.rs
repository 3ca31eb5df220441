// Copyright (c) 2025 - Cowboy AI, Inc.
//! Background event polling

use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::tracker::EventTracker;
use crate::domain::StackEvent;
use crate::errors::DeployResult;

/// Background task forwarding fresh events of one stack
///
/// Events reach the channel oldest-first. Stopping the poller performs one
/// final drain so nothing recorded before the stop is lost.
pub struct EventPoller {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<DeployResult<()>>,
}

impl EventPoller {
    /// Spawn a poller; the tracker should already hold its baseline
    pub fn spawn(
        tracker: EventTracker,
        interval: Duration,
        sink: mpsc::Sender<StackEvent>,
    ) -> Self {
        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(poll(tracker, interval, sink, stop_rx));
        Self { stop, handle }
    }

    /// Signal the task, wait for its final drain
    pub async fn stop(self) -> DeployResult<()> {
        // The task may already have exited because the receiver went away.
        let _ = self.stop.send(());
        self.handle.await?
    }
}

async fn poll(
    mut tracker: EventTracker,
    interval: Duration,
    sink: mpsc::Sender<StackEvent>,
    mut stop: oneshot::Receiver<()>,
) -> DeployResult<()> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => match tracker.fresh_events().await {
                Ok(events) => {
                    if !forward(&sink, events).await {
                        debug!(stack = %tracker.stack_name(), "Event receiver closed");
                        return Ok(());
                    }
                }
                Err(e) => warn!(stack = %tracker.stack_name(), error = %e, "Event poll failed"),
            },
        }
    }

    let events = tracker.fresh_events().await?;
    forward(&sink, events).await;
    Ok(())
}

/// Send newest-first `events` in chronological order
async fn forward(sink: &mpsc::Sender<StackEvent>, mut events: Vec<StackEvent>) -> bool {
    events.reverse();
    for event in events {
        if sink.send(event).await.is_err() {
            return false;
        }
    }
    true
}

/// Run `operation` while polling events of the tracker's stack into `sink`
///
/// The operation's error wins over a failed final drain. `sink` must be
/// consumed concurrently; a full bounded channel stalls the drain.
pub async fn track_while<T, F>(
    tracker: EventTracker,
    interval: Duration,
    sink: mpsc::Sender<StackEvent>,
    operation: F,
) -> DeployResult<T>
where
    F: Future<Output = DeployResult<T>>,
{
    let poller = EventPoller::spawn(tracker, interval, sink);
    let result = operation.await;
    let drained = poller.stop().await;
    let value = result?;
    drained?;
    Ok(value)
}
